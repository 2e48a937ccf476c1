use crate::model::rational::{Rational, ratio};
use core::fmt;
use serde::{Deserialize, Serialize};

/// A pile of cards reduced to the two counts the engine cares about: how many
/// cards it holds and how many of them are climaxes. Invariant:
/// `climax <= total` (and therefore an empty pool holds no climaxes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "PoolCounts", into = "PoolCounts")]
pub struct CardPool {
    total: u32,
    climax: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PoolCounts {
    total: u32,
    #[serde(default)]
    climax: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneError {
    ClimaxExceedsTotal { total: u32, climax: u32 },
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneError::ClimaxExceedsTotal { total, climax } => {
                write!(f, "zone claims {climax} climaxes among {total} cards")
            }
        }
    }
}

impl std::error::Error for ZoneError {}

impl CardPool {
    pub const EMPTY: CardPool = CardPool { total: 0, climax: 0 };

    pub fn new(total: u32, climax: u32) -> Result<Self, ZoneError> {
        if climax > total {
            return Err(ZoneError::ClimaxExceedsTotal { total, climax });
        }
        Ok(Self { total, climax })
    }

    pub(crate) fn of(total: u32, climax: u32) -> Self {
        debug_assert!(climax <= total);
        Self { total, climax }
    }

    pub const fn total(self) -> u32 {
        self.total
    }

    pub const fn climax(self) -> u32 {
        self.climax
    }

    pub const fn non_climax(self) -> u32 {
        self.total - self.climax
    }

    pub const fn is_empty(self) -> bool {
        self.total == 0
    }

    /// Probability that a uniformly drawn card is a climax. The pool must not
    /// be empty.
    pub(crate) fn climax_ratio(self) -> Rational {
        debug_assert!(!self.is_empty());
        ratio(self.climax, self.total)
    }

    pub(crate) fn remove_climax(self) -> Self {
        debug_assert!(self.climax > 0);
        Self::of(self.total - 1, self.climax - 1)
    }

    pub(crate) fn remove_non_climax(self) -> Self {
        debug_assert!(self.non_climax() > 0);
        Self::of(self.total - 1, self.climax)
    }

    pub(crate) fn add_card(self, climax: bool) -> Self {
        Self::of(self.total + 1, self.climax + u32::from(climax))
    }

    pub(crate) fn add_cards(self, total: u32, climax: u32) -> Self {
        Self::of(self.total + total, self.climax + climax)
    }

    pub(crate) fn remove_cards(self, total: u32, climax: u32) -> Self {
        debug_assert!(total <= self.total && climax <= self.climax);
        debug_assert!(total - climax <= self.non_climax());
        Self::of(self.total - total, self.climax - climax)
    }
}

impl Default for CardPool {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl TryFrom<PoolCounts> for CardPool {
    type Error = ZoneError;

    fn try_from(counts: PoolCounts) -> Result<Self, ZoneError> {
        CardPool::new(counts.total, counts.climax)
    }
}

impl From<CardPool> for PoolCounts {
    fn from(pool: CardPool) -> Self {
        PoolCounts {
            total: pool.total,
            climax: pool.climax,
        }
    }
}

impl fmt::Display for CardPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.climax, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::{CardPool, ZoneError};
    use crate::model::rational::ratio;

    #[test]
    fn rejects_more_climaxes_than_cards() {
        assert_eq!(
            CardPool::new(3, 4),
            Err(ZoneError::ClimaxExceedsTotal {
                total: 3,
                climax: 4
            })
        );
    }

    #[test]
    fn card_movement_keeps_counts_consistent() {
        let pool = CardPool::new(5, 2).unwrap();
        assert_eq!(pool.non_climax(), 3);
        assert_eq!(pool.remove_climax(), CardPool::new(4, 1).unwrap());
        assert_eq!(pool.remove_non_climax(), CardPool::new(4, 2).unwrap());
        assert_eq!(pool.add_card(true), CardPool::new(6, 3).unwrap());
        assert_eq!(pool.add_cards(7, 1), CardPool::new(12, 3).unwrap());
        assert_eq!(pool.remove_cards(3, 1), CardPool::new(2, 1).unwrap());
    }

    #[test]
    fn climax_ratio_is_exact() {
        let pool = CardPool::new(20, 5).unwrap();
        assert_eq!(pool.climax_ratio(), ratio(1, 4));
    }

    #[test]
    fn serde_round_trip_enforces_invariant() {
        let pool = CardPool::new(15, 4).unwrap();
        let json = serde_json::to_string(&pool).unwrap();
        let restored: CardPool = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, pool);

        let invalid = r#"{"total": 2, "climax": 9}"#;
        assert!(serde_json::from_str::<CardPool>(invalid).is_err());
    }

    #[test]
    fn climax_count_defaults_to_zero() {
        let pool: CardPool = serde_json::from_str(r#"{"total": 6}"#).unwrap();
        assert_eq!(pool, CardPool::new(6, 0).unwrap());
    }
}
