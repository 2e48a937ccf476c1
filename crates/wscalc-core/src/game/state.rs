use crate::game::cache::TransitionCache;
use crate::model::attacker::AttackerState;
use crate::model::operator::Operator;
use crate::model::player::{PlayerKey, PlayerState, TransitionError};
use crate::model::pool::CardPool;
use crate::model::rational::Rational;
use num_traits::Zero;
use std::collections::BTreeMap;

/// The defending player and the attacker taken together, tagged with the
/// exact probability of the path that produced them. The probability always
/// equals the player's own probability field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedState {
    pub player: PlayerState,
    pub attacker: AttackerState,
    pub probability: Rational,
}

/// Structural identity of a combined state: the player's key plus the
/// attacker's remaining deck. The attacker's stock is derivable from its deck
/// and carries no extra information.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CombinedKey {
    pub player: PlayerKey,
    pub attacker_deck: CardPool,
}

/// Merges a state into an accumulator keyed by structural identity, summing
/// probabilities when two derivation paths meet.
pub(crate) fn merge_combined(
    acc: &mut BTreeMap<CombinedKey, CombinedState>,
    state: CombinedState,
) {
    acc.entry(state.key())
        .and_modify(|existing| {
            existing.probability += &state.probability;
            existing.player.probability = existing.probability.clone();
        })
        .or_insert(state);
}

impl CombinedState {
    pub fn new(player: PlayerState, attacker: AttackerState) -> Self {
        let probability = player.probability.clone();
        Self {
            player,
            attacker,
            probability,
        }
    }

    pub fn key(&self) -> CombinedKey {
        CombinedKey {
            player: self.player.key(),
            attacker_deck: self.attacker.deck,
        }
    }

    pub fn hp(&self) -> u32 {
        self.player.hp()
    }

    pub fn is_terminal(&self) -> bool {
        self.player.is_terminal()
    }

    fn adopt(&self, player: PlayerState) -> CombinedState {
        CombinedState {
            probability: player.probability.clone(),
            player,
            attacker: self.attacker.clone(),
        }
    }

    /// Applies one operator and returns every resulting state. A terminal
    /// state passes through unchanged; otherwise child probabilities sum
    /// exactly to this state's probability.
    pub fn execute(
        &self,
        operator: Operator,
        cache: &mut TransitionCache,
    ) -> Result<Vec<CombinedState>, TransitionError> {
        if self.is_terminal() {
            return Ok(vec![self.clone()]);
        }

        match operator {
            Operator::Moka(amount) => {
                let results = cache.take_moka(&self.player, amount)?;
                Ok(results.into_iter().map(|p| self.adopt(p)).collect())
            }
            Operator::Damage(amount) => {
                let results = cache.take_damage(&self.player, amount)?;
                Ok(results.into_iter().map(|p| self.adopt(p)).collect())
            }
            Operator::Michiru(amount) => {
                let buckets = cache.michiru(&self.player, amount)?;
                let mut children = Vec::new();
                for (climaxes, states) in buckets {
                    if climaxes == 0 {
                        children.extend(states.into_iter().map(|p| self.adopt(p)));
                    } else {
                        // Drawing climaxes hurts: each one becomes a damage
                        // check of that size.
                        for state in states {
                            for hit in cache.take_damage(&state, climaxes)? {
                                children.push(self.adopt(hit));
                            }
                        }
                    }
                }
                Ok(children)
            }
            Operator::Woody(amount) => {
                let peeks = cache.woody(&self.player, amount)?;
                let mut children = Vec::new();
                for (climaxes, prob) in peeks {
                    if prob.is_zero() {
                        continue;
                    }
                    let mut scaled = self.player.clone();
                    scaled.probability = &scaled.probability * &prob;
                    if climaxes == 0 {
                        children.push(self.adopt(scaled));
                    } else {
                        for moved in cache.put_to_clock(&scaled, climaxes)? {
                            children.push(self.adopt(moved));
                        }
                    }
                }
                Ok(children)
            }
            Operator::Trigger(amount) => {
                let outcome = self.attacker.trigger()?;
                let mut children = Vec::new();
                if let Some((attacker, prob)) = outcome.soul {
                    let mut scaled = self.player.clone();
                    scaled.probability = &scaled.probability * &prob;
                    for hit in cache.take_damage(&scaled, amount + 1)? {
                        children.push(CombinedState {
                            probability: hit.probability.clone(),
                            player: hit,
                            attacker: attacker.clone(),
                        });
                    }
                }
                if let Some((attacker, prob)) = outcome.no_soul {
                    let mut scaled = self.player.clone();
                    scaled.probability = &scaled.probability * &prob;
                    for hit in cache.take_damage(&scaled, amount)? {
                        children.push(CombinedState {
                            probability: hit.probability.clone(),
                            player: hit,
                            attacker: attacker.clone(),
                        });
                    }
                }
                Ok(children)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CombinedState, merge_combined};
    use crate::game::cache::TransitionCache;
    use crate::model::attacker::AttackerState;
    use crate::model::operator::Operator;
    use crate::model::player::{PlayerState, TransitionError};
    use crate::model::pool::CardPool;
    use crate::model::rational::{Rational, one, ratio, zero};
    use std::collections::BTreeMap;

    fn pool(total: u32, climax: u32) -> CardPool {
        CardPool::new(total, climax).unwrap()
    }

    fn midgame() -> CombinedState {
        CombinedState::new(
            PlayerState::new(pool(8, 3), pool(5, 2), pool(1, 0), pool(2, 1)),
            AttackerState::new(pool(10, 6)),
        )
    }

    fn children_mass(children: &[CombinedState]) -> Rational {
        children
            .iter()
            .fold(zero(), |acc, child| acc + &child.probability)
    }

    #[test]
    fn every_operator_conserves_probability() {
        let operators = [
            Operator::Moka(3),
            Operator::Michiru(2),
            Operator::Woody(4),
            Operator::Damage(2),
            Operator::Trigger(2),
        ];
        for operator in operators {
            let state = midgame();
            let mut cache = TransitionCache::default();
            let children = state.execute(operator, &mut cache).unwrap();
            assert_eq!(
                children_mass(&children),
                state.probability,
                "{operator} lost probability mass"
            );
            for child in &children {
                assert_eq!(child.probability, child.player.probability);
                assert!(child.probability > zero());
                assert!(child.probability <= one());
            }
        }
    }

    #[test]
    fn terminal_states_pass_through_unchanged() {
        let dead = CombinedState::new(
            PlayerState::new(pool(8, 3), pool(0, 0), pool(4, 0), pool(0, 0)),
            AttackerState::new(pool(10, 6)),
        );
        let mut cache = TransitionCache::default();
        let children = dead.execute(Operator::Damage(3), &mut cache).unwrap();
        assert_eq!(children, vec![dead]);
    }

    #[test]
    fn trigger_deals_an_extra_point_on_the_soul_branch() {
        let state = CombinedState::new(
            PlayerState::new(pool(10, 0), pool(0, 0), pool(0, 0), pool(0, 0)),
            AttackerState::new(pool(4, 4)),
        );
        let mut cache = TransitionCache::default();
        let children = state.execute(Operator::Trigger(2), &mut cache).unwrap();
        // Guaranteed soul, climax-free deck: exactly one outcome for three.
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].probability, one());
        assert_eq!(children[0].player.clock, pool(3, 0));
        assert_eq!(children[0].attacker.deck, pool(3, 3));
        assert_eq!(children[0].attacker.stock, pool(1, 1));
    }

    #[test]
    fn trigger_on_an_exhausted_attacker_fails() {
        let state = CombinedState::new(
            PlayerState::new(pool(10, 0), pool(0, 0), pool(0, 0), pool(0, 0)),
            AttackerState::new(CardPool::EMPTY),
        );
        let mut cache = TransitionCache::default();
        assert_eq!(
            state.execute(Operator::Trigger(1), &mut cache),
            Err(TransitionError::EmptyAttackerDeck)
        );
    }

    #[test]
    fn woody_returns_the_clean_peek_unchanged() {
        let state = CombinedState::new(
            PlayerState::new(pool(6, 0), pool(0, 0), pool(0, 0), pool(0, 0)),
            AttackerState::new(pool(10, 6)),
        );
        let mut cache = TransitionCache::default();
        let children = state.execute(Operator::Woody(3), &mut cache).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0], state);
    }

    #[test]
    fn merge_sums_structurally_equal_states() {
        let state = midgame();
        let mut halved = state.clone();
        halved.probability = ratio(1, 2);
        halved.player.probability = ratio(1, 2);

        let mut acc = BTreeMap::new();
        merge_combined(&mut acc, halved.clone());
        merge_combined(&mut acc, halved);
        assert_eq!(acc.len(), 1);
        let merged = acc.values().next().unwrap();
        assert_eq!(merged.probability, one());
        assert_eq!(merged.player.probability, one());
    }
}
