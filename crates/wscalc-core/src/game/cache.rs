//! Transition results memoized by structural state, operation, and amount.
//!
//! Transitions are linear in the inbound probability, so results are computed
//! once at probability one and rescaled on every hit. The cache is owned by a
//! single tree build or solver run and bounded by capacity, evicting the
//! oldest entries first.

use crate::model::player::{PlayerKey, PlayerState, TransitionError};
use crate::model::rational::Rational;
use num_traits::One;
use std::collections::{BTreeMap, HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TransitionKind {
    Damage,
    Moka,
    Michiru,
    Clock,
    Woody,
}

type CacheKey = (PlayerKey, TransitionKind, u32);

#[derive(Debug, Clone)]
enum CachedTransition {
    States(Vec<PlayerState>),
    Buckets(BTreeMap<u32, Vec<PlayerState>>),
    Peek(BTreeMap<u32, Rational>),
}

#[derive(Debug)]
pub struct TransitionCache {
    entries: HashMap<CacheKey, CachedTransition>,
    order: VecDeque<CacheKey>,
    capacity: usize,
}

impl TransitionCache {
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn take_damage(
        &mut self,
        player: &PlayerState,
        amount: u32,
    ) -> Result<Vec<PlayerState>, TransitionError> {
        let key = (player.key(), TransitionKind::Damage, amount);
        if let Some(CachedTransition::States(states)) = self.entries.get(&key) {
            return Ok(scale_states(states, &player.probability));
        }
        let results = player.normalized().take_damage(amount)?;
        self.insert(key, CachedTransition::States(results.clone()));
        Ok(scale_states(&results, &player.probability))
    }

    pub fn take_moka(
        &mut self,
        player: &PlayerState,
        amount: u32,
    ) -> Result<Vec<PlayerState>, TransitionError> {
        let key = (player.key(), TransitionKind::Moka, amount);
        if let Some(CachedTransition::States(states)) = self.entries.get(&key) {
            return Ok(scale_states(states, &player.probability));
        }
        let results = player.normalized().take_moka(amount)?;
        self.insert(key, CachedTransition::States(results.clone()));
        Ok(scale_states(&results, &player.probability))
    }

    pub fn put_to_clock(
        &mut self,
        player: &PlayerState,
        amount: u32,
    ) -> Result<Vec<PlayerState>, TransitionError> {
        let key = (player.key(), TransitionKind::Clock, amount);
        if let Some(CachedTransition::States(states)) = self.entries.get(&key) {
            return Ok(scale_states(states, &player.probability));
        }
        let results = player.normalized().put_to_clock(amount)?;
        self.insert(key, CachedTransition::States(results.clone()));
        Ok(scale_states(&results, &player.probability))
    }

    pub fn michiru(
        &mut self,
        player: &PlayerState,
        amount: u32,
    ) -> Result<BTreeMap<u32, Vec<PlayerState>>, TransitionError> {
        let key = (player.key(), TransitionKind::Michiru, amount);
        if let Some(CachedTransition::Buckets(buckets)) = self.entries.get(&key) {
            return Ok(scale_buckets(buckets, &player.probability));
        }
        let results = player.normalized().michiru(amount)?;
        self.insert(key, CachedTransition::Buckets(results.clone()));
        Ok(scale_buckets(&results, &player.probability))
    }

    /// Peek distributions do not depend on the inbound probability, so they
    /// are returned as cached.
    pub fn woody(
        &mut self,
        player: &PlayerState,
        amount: u32,
    ) -> Result<BTreeMap<u32, Rational>, TransitionError> {
        let key = (player.key(), TransitionKind::Woody, amount);
        if let Some(CachedTransition::Peek(probs)) = self.entries.get(&key) {
            return Ok(probs.clone());
        }
        let probs = player.woody(amount)?;
        self.insert(key, CachedTransition::Peek(probs.clone()));
        Ok(probs)
    }

    fn insert(&mut self, key: CacheKey, value: CachedTransition) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

impl Default for TransitionCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

fn scale_states(states: &[PlayerState], by: &Rational) -> Vec<PlayerState> {
    if by.is_one() {
        return states.to_vec();
    }
    states
        .iter()
        .map(|state| {
            let mut scaled = state.clone();
            scaled.probability = &scaled.probability * by;
            scaled
        })
        .collect()
}

fn scale_buckets(
    buckets: &BTreeMap<u32, Vec<PlayerState>>,
    by: &Rational,
) -> BTreeMap<u32, Vec<PlayerState>> {
    buckets
        .iter()
        .map(|(drawn, states)| (*drawn, scale_states(states, by)))
        .collect()
}
