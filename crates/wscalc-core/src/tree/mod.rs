//! Layered exploration of an operator sequence with structural state merging.
//!
//! The tree keeps one frontier map per layer instead of materializing every
//! derivation path: children that reach the same zone configuration merge by
//! summing probability, which bounds the state count by the number of
//! distinct configurations rather than the number of paths.

use crate::game::cache::TransitionCache;
use crate::game::state::{CombinedKey, CombinedState, merge_combined};
use crate::model::operator::Operator;
use crate::model::player::TransitionError;
use crate::model::rational::{Rational, one, zero};
use num_bigint::BigInt;
use std::collections::BTreeMap;

/// One failed probability-conservation check: applying `operator` to a layer
/// state produced children whose probabilities did not sum back to the
/// parent's. This indicates a defect in the transition rules themselves, not
/// a caller error, and is reported structurally rather than logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConservationCheck {
    pub layer: usize,
    pub operator: Operator,
    pub expected: Rational,
    pub actual: Rational,
}

pub struct ProbabilityTree {
    root: CombinedState,
    operators: Vec<Operator>,
    cache: TransitionCache,
    leaves: BTreeMap<CombinedKey, CombinedState>,
    built: bool,
}

impl ProbabilityTree {
    pub fn new(root: CombinedState, operators: Vec<Operator>) -> Self {
        Self {
            root,
            operators,
            cache: TransitionCache::default(),
            leaves: BTreeMap::new(),
            built: false,
        }
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Explores the full operator sequence, populating the terminal leaves.
    pub fn build(&mut self) -> Result<(), TransitionError> {
        self.run(false).map(|_| ())
    }

    /// Like [`build`](Self::build), but additionally verifies probability
    /// conservation for every dispatch and returns the failures.
    pub fn build_validated(&mut self) -> Result<Vec<ConservationCheck>, TransitionError> {
        self.run(true)
    }

    fn run(&mut self, validate: bool) -> Result<Vec<ConservationCheck>, TransitionError> {
        self.leaves.clear();
        let mut failures = Vec::new();

        if self.operators.is_empty() {
            // A sequence with no actions resolves to the root itself.
            self.leaves.insert(self.root.key(), self.root.clone());
            self.built = true;
            return Ok(failures);
        }

        let operators = self.operators.clone();
        let last = operators.len() - 1;
        let mut frontier: BTreeMap<CombinedKey, CombinedState> = BTreeMap::new();
        frontier.insert(self.root.key(), self.root.clone());

        for (layer, operator) in operators.into_iter().enumerate() {
            let current = std::mem::take(&mut frontier);
            for state in current.into_values() {
                let children = state.execute(operator, &mut self.cache)?;
                if validate {
                    let actual = children
                        .iter()
                        .fold(zero(), |acc, child| acc + &child.probability);
                    if actual != state.probability {
                        failures.push(ConservationCheck {
                            layer,
                            operator,
                            expected: state.probability.clone(),
                            actual,
                        });
                    }
                }
                for child in children {
                    if child.is_terminal() || layer == last {
                        merge_combined(&mut self.leaves, child);
                    } else {
                        merge_combined(&mut frontier, child);
                    }
                }
            }
        }
        self.built = true;
        Ok(failures)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &CombinedState> {
        self.leaves.values()
    }

    /// Aggregates the leaves into a damage distribution. Only meaningful
    /// after a build; before one the distribution is empty.
    pub fn distribution(&self, threshold: u32) -> DamageDistribution {
        DamageDistribution::from_leaves(self.root.hp(), self.leaves.values(), threshold)
    }
}

/// Exact distribution over damage dealt, with the aggregate quantities the
/// caller cares about. Entries are sorted ascending by damage and their
/// probabilities sum to one for any complete build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageDistribution {
    entries: Vec<(u32, Rational)>,
    kill_probability: Rational,
    expectation: Rational,
    variance: Rational,
    total_mass: Rational,
}

impl DamageDistribution {
    pub(crate) fn from_leaves<'a>(
        root_hp: u32,
        leaves: impl Iterator<Item = &'a CombinedState>,
        threshold: u32,
    ) -> Self {
        let mut buckets: BTreeMap<u32, Rational> = BTreeMap::new();
        for leaf in leaves {
            debug_assert!(leaf.hp() >= root_hp);
            let dealt = leaf.hp() - root_hp;
            *buckets.entry(dealt).or_insert_with(zero) += &leaf.probability;
        }

        let total_mass = buckets.values().fold(zero(), |acc, prob| acc + prob);
        debug_assert!(
            buckets.is_empty() || total_mass == one(),
            "damage distribution mass is {total_mass}, expected exactly 1"
        );

        let kill_probability = buckets
            .range(threshold..)
            .fold(zero(), |acc, (_, prob)| acc + prob);
        let expectation = buckets.iter().fold(zero(), |acc, (damage, prob)| {
            acc + Rational::from_integer(BigInt::from(*damage)) * prob
        });
        let variance = buckets.iter().fold(zero(), |acc, (damage, prob)| {
            let delta = Rational::from_integer(BigInt::from(*damage)) - &expectation;
            acc + &delta * &delta * prob
        });

        Self {
            entries: buckets.into_iter().collect(),
            kill_probability,
            expectation,
            variance,
            total_mass,
        }
    }

    /// Damage values and their exact probabilities, ascending by damage.
    pub fn damage_probabilities(&self) -> &[(u32, Rational)] {
        &self.entries
    }

    pub fn probability_of(&self, damage: u32) -> Rational {
        self.entries
            .iter()
            .find(|(dealt, _)| *dealt == damage)
            .map(|(_, prob)| prob.clone())
            .unwrap_or_else(zero)
    }

    pub fn kill_probability(&self) -> &Rational {
        &self.kill_probability
    }

    pub fn expectation(&self) -> &Rational {
        &self.expectation
    }

    pub fn variance(&self) -> &Rational {
        &self.variance
    }

    pub fn total_mass(&self) -> &Rational {
        &self.total_mass
    }
}
