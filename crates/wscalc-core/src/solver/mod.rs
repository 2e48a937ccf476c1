//! Exhaustive search over orderings of atomic operator groups.
//!
//! Each node applies every distinct remaining group to its state (merging
//! structurally equal results between operators) and keeps the group whose
//! children score highest. Scores memoize per node, not globally, so the
//! cost follows the group-choice tree — acceptable only for small multisets,
//! which is the sole regime the search is meant for.

use crate::game::cache::TransitionCache;
use crate::game::state::{CombinedKey, CombinedState, merge_combined};
use crate::model::operator::OperatorGroup;
use crate::model::player::TransitionError;
use crate::model::rational::{Rational, zero};
use crate::tree::DamageDistribution;
use num_bigint::BigInt;
use std::collections::BTreeMap;

pub struct Solver {
    root: SolverNode,
    root_hp: u32,
    cache: TransitionCache,
    solved: bool,
}

#[derive(Debug, Clone)]
struct SolverNode {
    state: CombinedState,
    remaining: BTreeMap<OperatorGroup, u32>,
    score: Option<Rational>,
    best: Option<(OperatorGroup, Vec<SolverNode>)>,
}

impl Solver {
    /// Builds a solver over the multiset formed by `groups`; repeated groups
    /// become repeat counts.
    pub fn new(root: CombinedState, groups: &[OperatorGroup]) -> Self {
        let mut remaining: BTreeMap<OperatorGroup, u32> = BTreeMap::new();
        for group in groups {
            *remaining.entry(group.clone()).or_insert(0) += 1;
        }
        let root_hp = root.hp();
        Self {
            root: SolverNode::new(root, remaining),
            root_hp,
            cache: TransitionCache::default(),
            solved: false,
        }
    }

    /// Scores the whole ordering tree and returns the best achievable score:
    /// the expected damage dealt under the maximizing policy.
    pub fn solve(&mut self) -> Result<Rational, TransitionError> {
        let score = self.root.score(self.root_hp, &mut self.cache)?;
        self.solved = true;
        Ok(score)
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// The chosen groups along the most probable line of play. The full
    /// policy is state-dependent (different branches may continue with
    /// different groups); this reports the modal path through it.
    pub fn best_ordering(&self) -> Vec<OperatorGroup> {
        let mut ordering = Vec::new();
        let mut node = &self.root;
        while let Some((group, children)) = &node.best {
            ordering.push(group.clone());
            match children
                .iter()
                .max_by(|a, b| a.state.probability.cmp(&b.state.probability))
            {
                Some(next) => node = next,
                None => break,
            }
        }
        ordering
    }

    /// Damage distribution over the leaves of the chosen policy tree. Only
    /// meaningful after [`solve`](Self::solve).
    pub fn distribution(&self, threshold: u32) -> DamageDistribution {
        let mut leaves: BTreeMap<CombinedKey, CombinedState> = BTreeMap::new();
        let mut queue = vec![&self.root];
        while let Some(node) = queue.pop() {
            match &node.best {
                Some((_, children)) => queue.extend(children.iter()),
                None => merge_combined(&mut leaves, node.state.clone()),
            }
        }
        DamageDistribution::from_leaves(self.root_hp, leaves.values(), threshold)
    }
}

impl SolverNode {
    fn new(state: CombinedState, remaining: BTreeMap<OperatorGroup, u32>) -> Self {
        Self {
            state,
            remaining,
            score: None,
            best: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.remaining.is_empty() || self.state.is_terminal()
    }

    fn leaf_score(&self, root_hp: u32) -> Rational {
        let dealt = self.state.hp() - root_hp;
        Rational::from_integer(BigInt::from(dealt)) * &self.state.probability
    }

    fn score(
        &mut self,
        root_hp: u32,
        cache: &mut TransitionCache,
    ) -> Result<Rational, TransitionError> {
        if let Some(score) = &self.score {
            return Ok(score.clone());
        }
        if self.is_leaf() {
            let score = self.leaf_score(root_hp);
            self.score = Some(score.clone());
            return Ok(score);
        }

        let candidates: Vec<(OperatorGroup, u32)> = self
            .remaining
            .iter()
            .map(|(group, count)| (group.clone(), *count))
            .collect();
        let mut best: Option<(Rational, OperatorGroup, Vec<SolverNode>)> = None;

        for (group, count) in candidates {
            let mut states: BTreeMap<CombinedKey, CombinedState> = BTreeMap::new();
            states.insert(self.state.key(), self.state.clone());
            for operator in group.operators() {
                let mut next = BTreeMap::new();
                for state in states.values() {
                    for child in state.execute(*operator, cache)? {
                        merge_combined(&mut next, child);
                    }
                }
                states = next;
            }

            let mut rest = self.remaining.clone();
            if count > 1 {
                rest.insert(group.clone(), count - 1);
            } else {
                rest.remove(&group);
            }

            let mut children: Vec<SolverNode> = states
                .into_values()
                .map(|state| SolverNode::new(state, rest.clone()))
                .collect();
            let mut total = zero();
            for child in &mut children {
                total += child.score(root_hp, cache)?;
            }

            let improves = match &best {
                None => true,
                Some((incumbent, _, _)) => total > *incumbent,
            };
            if improves {
                best = Some((total, group, children));
            }
        }

        if let Some((score, group, children)) = best {
            self.best = Some((group, children));
            self.score = Some(score.clone());
            Ok(score)
        } else {
            // No group applied; treat as a leaf.
            let score = self.leaf_score(root_hp);
            self.score = Some(score.clone());
            Ok(score)
        }
    }
}
