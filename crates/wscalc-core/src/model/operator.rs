use core::fmt;
use serde::{Deserialize, Serialize};

/// One game action with its integer parameter.
///
/// `Trigger(n)` deals `n` damage, plus one more when the attacker's revealed
/// card carries a soul marker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "kind", content = "amount", rename_all = "lowercase")]
pub enum Operator {
    Moka(u32),
    Michiru(u32),
    Woody(u32),
    Damage(u32),
    Trigger(u32),
}

impl Operator {
    pub const fn amount(self) -> u32 {
        match self {
            Operator::Moka(n)
            | Operator::Michiru(n)
            | Operator::Woody(n)
            | Operator::Damage(n)
            | Operator::Trigger(n) => n,
        }
    }

    pub const fn kind_name(self) -> &'static str {
        match self {
            Operator::Moka(_) => "moka",
            Operator::Michiru(_) => "michiru",
            Operator::Woody(_) => "woody",
            Operator::Damage(_) => "damage",
            Operator::Trigger(_) => "trigger",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Moka(n) => write!(f, "Moka({n})"),
            Operator::Michiru(n) => write!(f, "Michiru({n})"),
            Operator::Woody(n) => write!(f, "Woody({n})"),
            Operator::Damage(n) => write!(f, "{n}"),
            Operator::Trigger(n) => write!(f, "{n}T"),
        }
    }
}

/// Ordered run of operators the solver treats as one indivisible move.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorGroup(Vec<Operator>);

impl OperatorGroup {
    pub fn new(operators: Vec<Operator>) -> Self {
        Self(operators)
    }

    pub fn operators(&self) -> &[Operator] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Operator> for OperatorGroup {
    fn from(operator: Operator) -> Self {
        Self(vec![operator])
    }
}

impl fmt::Display for OperatorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, operator) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "+")?;
            }
            write!(f, "{operator}")?;
        }
        Ok(())
    }
}
