use crate::model::lookahead::LookAhead;
use crate::model::pool::CardPool;
use crate::model::rational::{Rational, hypergeometric, one, ratio};
use core::fmt;
use num_traits::Zero;
use std::collections::BTreeMap;

/// The defending player's zones, pending top-card knowledge, and the exact
/// probability of having reached this state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub deck: CardPool,
    pub waiting_room: CardPool,
    pub level: CardPool,
    pub clock: CardPool,
    pub look_ahead: LookAhead,
    pub probability: Rational,
}

/// Structural identity of a player state: every zone plus the look-ahead
/// queue, but not the probability of reaching it. Branches that agree on this
/// key are interchangeable and merge by summing probability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerKey {
    pub deck: CardPool,
    pub waiting_room: CardPool,
    pub level: CardPool,
    pub clock: CardPool,
    pub look_ahead: LookAhead,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    EmptyDeck,
    DeckNotEmpty,
    NothingToRecycle,
    EmptyAttackerDeck,
    ZeroAmount(&'static str),
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::EmptyDeck => {
                write!(f, "deck is empty, the top card probability is undefined")
            }
            TransitionError::DeckNotEmpty => {
                write!(f, "deck still holds cards, refreshing is not allowed")
            }
            TransitionError::NothingToRecycle => {
                write!(f, "no cards in the waiting room or deck to refresh from")
            }
            TransitionError::EmptyAttackerDeck => {
                write!(f, "attacker deck is empty, no trigger available")
            }
            TransitionError::ZeroAmount(action) => {
                write!(f, "{action} requires a positive amount")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

pub(crate) fn merge_player(acc: &mut BTreeMap<PlayerKey, PlayerState>, state: PlayerState) {
    acc.entry(state.key())
        .and_modify(|existing| existing.probability += &state.probability)
        .or_insert(state);
}

impl PlayerState {
    pub fn new(deck: CardPool, waiting_room: CardPool, level: CardPool, clock: CardPool) -> Self {
        Self {
            deck,
            waiting_room,
            level,
            clock,
            look_ahead: LookAhead::new(),
            probability: one(),
        }
    }

    pub fn key(&self) -> PlayerKey {
        PlayerKey {
            deck: self.deck,
            waiting_room: self.waiting_room,
            level: self.level,
            clock: self.clock,
            look_ahead: self.look_ahead.clone(),
        }
    }

    pub fn same_zones(&self, other: &PlayerState) -> bool {
        self.key() == other.key()
    }

    pub fn hp(&self) -> u32 {
        self.level.total() * 7 + self.clock.total()
    }

    pub fn is_terminal(&self) -> bool {
        self.level.total() >= 4
    }

    /// Copy of this state with its probability reset to one, the shape stored
    /// by the transition cache.
    pub(crate) fn normalized(&self) -> PlayerState {
        let mut state = self.clone();
        state.probability = one();
        state
    }

    /// Converts every full set of seven clock cards into a level.
    ///
    /// The promoted cards carry the clock's entire climax count into the
    /// waiting room; the remaining clock cards keep their card count but lose
    /// their climax identity. That asymmetry is the source game rule as
    /// written, not an accounting slip.
    #[must_use]
    pub fn level_up_check(mut self) -> PlayerState {
        if self.clock.total() < 7 {
            return self;
        }
        let up = self.clock.total() / 7;
        let rest = self.clock.total() % 7;
        let promoted = self.clock.total() - rest;
        self.waiting_room = self.waiting_room.add_cards(promoted, self.clock.climax());
        self.level = self.level.add_cards(up, 0);
        self.clock = CardPool::of(rest, 0);
        self
    }

    /// Recycles the waiting room into a fresh deck, then pays the mandatory
    /// one-card refresh penalty into the clock. Branches on whether that card
    /// is a climax; zero-probability branches are omitted. All top-card
    /// knowledge is void after the shuffle.
    pub fn refresh_deck(&self) -> Result<Vec<PlayerState>, TransitionError> {
        if !self.deck.is_empty() {
            return Err(TransitionError::DeckNotEmpty);
        }
        let recycled = self.waiting_room;
        if recycled.is_empty() {
            return Err(TransitionError::NothingToRecycle);
        }

        let climax_prob = recycled.climax_ratio();
        let non_climax_prob = one() - &climax_prob;
        let mut branches = Vec::with_capacity(2);

        if !climax_prob.is_zero() {
            branches.push(
                PlayerState {
                    deck: recycled.remove_climax(),
                    waiting_room: CardPool::EMPTY,
                    level: self.level,
                    clock: self.clock.add_card(true),
                    look_ahead: LookAhead::new(),
                    probability: &self.probability * &climax_prob,
                }
                .level_up_check(),
            );
        }
        if !non_climax_prob.is_zero() {
            branches.push(
                PlayerState {
                    deck: recycled.remove_non_climax(),
                    waiting_room: CardPool::EMPTY,
                    level: self.level,
                    clock: self.clock.add_card(false),
                    look_ahead: LookAhead::new(),
                    probability: &self.probability * &non_climax_prob,
                }
                .level_up_check(),
            );
        }
        Ok(branches)
    }

    /// Probability that the top deck card is a climax, along with the state
    /// after consuming any pending look-ahead entry for it.
    pub fn top_climax_prob(&self) -> Result<(Rational, PlayerState), TransitionError> {
        if self.deck.is_empty() {
            return Err(TransitionError::EmptyDeck);
        }
        let mut state = self.clone();
        match state.look_ahead.pop() {
            Some(known) => Ok((known, state)),
            None => Ok((state.deck.climax_ratio(), state)),
        }
    }

    /// Resolves a damage check of `amount`. Revealed climaxes cancel the
    /// whole check (the climax and every card revealed before it go to the
    /// waiting room); `amount` consecutive non-climax reveals put that many
    /// cards into the clock. The deck refreshes whenever it runs out, both
    /// mid-check and on any finished branch that ends empty.
    pub fn take_damage(&self, amount: u32) -> Result<Vec<PlayerState>, TransitionError> {
        if amount == 0 {
            return Err(TransitionError::ZeroAmount("damage"));
        }

        let mut settled = Vec::new();
        let mut work = vec![(self.clone(), 0u32)];
        while let Some((state, revealed)) = work.pop() {
            if state.is_terminal() {
                settled.push(state);
                continue;
            }
            if state.deck.is_empty() {
                for branch in state.refresh_deck()? {
                    work.push((branch, revealed));
                }
                continue;
            }

            let (climax_prob, state) = state.top_climax_prob()?;
            let non_climax_prob = one() - &climax_prob;

            if !climax_prob.is_zero() {
                settled.push(PlayerState {
                    deck: state.deck.remove_climax(),
                    waiting_room: state.waiting_room.add_cards(revealed + 1, 1),
                    level: state.level,
                    clock: state.clock,
                    look_ahead: state.look_ahead.clone(),
                    probability: &state.probability * &climax_prob,
                });
            }
            if !non_climax_prob.is_zero() {
                let done = revealed + 1 == amount;
                let next = PlayerState {
                    deck: state.deck.remove_non_climax(),
                    waiting_room: state.waiting_room,
                    level: state.level,
                    clock: if done {
                        state.clock.add_cards(amount, 0)
                    } else {
                        state.clock
                    },
                    look_ahead: state.look_ahead,
                    probability: &state.probability * &non_climax_prob,
                }
                .level_up_check();
                if done {
                    settled.push(next);
                } else {
                    work.push((next, revealed + 1));
                }
            }
        }

        let mut merged = BTreeMap::new();
        for state in settled {
            if state.deck.is_empty() {
                for branch in state.refresh_deck()? {
                    merge_player(&mut merged, branch);
                }
            } else {
                merge_player(&mut merged, state);
            }
        }
        Ok(merged.into_values().collect())
    }

    /// Reveals up to `count` cards one at a time (capped at the deck size):
    /// climaxes go to the waiting room, anything else is set aside and
    /// returned under the deck once the effect resolves. The reveal odds use
    /// the full climax count over the cards not yet seen, because the cards
    /// set aside are known and excluded rather than shuffled back. Afterwards
    /// the set-aside cards sit on top as certain non-climaxes.
    pub fn take_moka(&self, count: u32) -> Result<Vec<PlayerState>, TransitionError> {
        let count = count.min(self.deck.total());
        let mut merged = BTreeMap::new();
        let mut work = vec![(self.clone(), count, 0u32)];
        while let Some((state, left, seen)) = work.pop() {
            if left == 0 {
                if state.deck.is_empty() {
                    for branch in state.refresh_deck()? {
                        merge_player(&mut merged, branch);
                    }
                } else {
                    let mut state = state;
                    state.look_ahead = LookAhead::known_non_climax(seen as usize);
                    merge_player(&mut merged, state);
                }
                continue;
            }

            // The reveal consumes a pending look-ahead entry, but the branch
            // odds always come from the counts below.
            let (_, state) = state.top_climax_prob()?;
            let climax_prob = ratio(state.deck.climax(), state.deck.total() - seen);
            let non_climax_prob = one() - &climax_prob;

            if !climax_prob.is_zero() {
                work.push((
                    PlayerState {
                        deck: state.deck.remove_climax(),
                        waiting_room: state.waiting_room.add_cards(1, 1),
                        level: state.level,
                        clock: state.clock,
                        look_ahead: state.look_ahead.clone(),
                        probability: &state.probability * &climax_prob,
                    },
                    left - 1,
                    seen,
                ));
            }
            if !non_climax_prob.is_zero() {
                work.push((
                    PlayerState {
                        deck: state.deck,
                        waiting_room: state.waiting_room,
                        level: state.level,
                        clock: state.clock,
                        look_ahead: state.look_ahead,
                        probability: &state.probability * &non_climax_prob,
                    },
                    left - 1,
                    seen + 1,
                ));
            }
        }
        Ok(merged.into_values().collect())
    }

    /// Draws `count` cards straight into the waiting room and reports the
    /// results bucketed by how many of them were climaxes. Uses a closed-form
    /// hypergeometric split when no look-ahead knowledge interferes and the
    /// deck is large enough, and a card-by-card walk (refreshing on
    /// exhaustion) otherwise. Both agree exactly where both apply.
    pub fn michiru(&self, count: u32) -> Result<BTreeMap<u32, Vec<PlayerState>>, TransitionError> {
        if self.look_ahead.is_empty() && count <= self.deck.total() {
            self.michiru_fast(count)
        } else {
            self.michiru_slow(count)
        }
    }

    fn michiru_fast(&self, count: u32) -> Result<BTreeMap<u32, Vec<PlayerState>>, TransitionError> {
        let deck = self.deck;
        let lo = (count + deck.climax()).saturating_sub(deck.total());
        let hi = deck.climax().min(count);
        let mut buckets: BTreeMap<u32, Vec<PlayerState>> = BTreeMap::new();
        for drawn in lo..=hi {
            let prob = hypergeometric(deck.total(), deck.climax(), count, drawn);
            let state = PlayerState {
                deck: deck.remove_cards(count, drawn),
                waiting_room: self.waiting_room.add_cards(count, drawn),
                level: self.level,
                clock: self.clock,
                look_ahead: LookAhead::new(),
                probability: &self.probability * prob,
            };
            let bucket = buckets.entry(drawn).or_default();
            if state.deck.is_empty() {
                bucket.extend(state.refresh_deck()?);
            } else {
                bucket.push(state);
            }
        }
        Ok(buckets)
    }

    fn michiru_slow(&self, count: u32) -> Result<BTreeMap<u32, Vec<PlayerState>>, TransitionError> {
        let mut buckets: BTreeMap<u32, BTreeMap<PlayerKey, PlayerState>> = BTreeMap::new();
        let mut work = vec![(self.clone(), count, 0u32)];
        while let Some((state, left, drawn)) = work.pop() {
            if left == 0 {
                let bucket = buckets.entry(drawn).or_default();
                if state.deck.is_empty() {
                    for branch in state.refresh_deck()? {
                        merge_player(bucket, branch);
                    }
                } else {
                    merge_player(bucket, state);
                }
                continue;
            }
            if state.deck.is_empty() {
                for branch in state.refresh_deck()? {
                    work.push((branch, left, drawn));
                }
                continue;
            }

            let (climax_prob, state) = state.top_climax_prob()?;
            let non_climax_prob = one() - &climax_prob;

            if !climax_prob.is_zero() {
                work.push((
                    PlayerState {
                        deck: state.deck.remove_climax(),
                        waiting_room: state.waiting_room.add_cards(1, 1),
                        level: state.level,
                        clock: state.clock,
                        look_ahead: state.look_ahead.clone(),
                        probability: &state.probability * &climax_prob,
                    },
                    left - 1,
                    drawn + 1,
                ));
            }
            if !non_climax_prob.is_zero() {
                work.push((
                    PlayerState {
                        deck: state.deck.remove_non_climax(),
                        waiting_room: state.waiting_room.add_cards(1, 0),
                        level: state.level,
                        clock: state.clock,
                        look_ahead: state.look_ahead,
                        probability: &state.probability * &non_climax_prob,
                    },
                    left - 1,
                    drawn,
                ));
            }
        }
        Ok(buckets
            .into_iter()
            .map(|(drawn, bucket)| (drawn, bucket.into_values().collect()))
            .collect())
    }

    /// Peeks at the top `count` cards (capped at the deck size, never
    /// refreshing) and returns the exact distribution over how many of them
    /// are climaxes. Cards already known through the look-ahead queue are
    /// settled first: certain climaxes shift the result, everything known
    /// shrinks both the peek and the effective deck. A peek fully covered by
    /// the queue is certain.
    pub fn woody(&self, count: u32) -> Result<BTreeMap<u32, Rational>, TransitionError> {
        if count == 0 {
            return Err(TransitionError::ZeroAmount("woody"));
        }
        let mut count = count.min(self.deck.total());
        let known = self.look_ahead.len() as u32;

        let (total, climax, offset) = if known == 0 {
            (self.deck.total(), self.deck.climax(), 0)
        } else if count > known {
            let offset = self.look_ahead.known_climaxes(known as usize) as u32;
            count -= known;
            (self.deck.total() - known, self.deck.climax() - offset, offset)
        } else {
            let hits = self.look_ahead.known_climaxes(count as usize) as u32;
            let mut certain = BTreeMap::new();
            certain.insert(hits, one());
            return Ok(certain);
        };

        let lo = (count + climax).saturating_sub(total);
        let hi = climax.min(count);
        let mut probs = BTreeMap::new();
        for hits in lo..=hi {
            probs.insert(offset + hits, hypergeometric(total, climax, count, hits));
        }
        Ok(probs)
    }

    /// Moves `count` cards from the top of the deck into the clock one at a
    /// time, checking for a level up after every placement and refreshing the
    /// deck whenever it runs out.
    pub fn put_to_clock(&self, count: u32) -> Result<Vec<PlayerState>, TransitionError> {
        let mut merged = BTreeMap::new();
        let mut work = vec![(self.clone(), count)];
        while let Some((state, left)) = work.pop() {
            if left == 0 {
                if state.deck.is_empty() {
                    for branch in state.refresh_deck()? {
                        merge_player(&mut merged, branch);
                    }
                } else {
                    merge_player(&mut merged, state);
                }
                continue;
            }
            if state.deck.is_empty() {
                for branch in state.refresh_deck()? {
                    work.push((branch, left));
                }
                continue;
            }

            let (climax_prob, state) = state.top_climax_prob()?;
            let non_climax_prob = one() - &climax_prob;

            if !climax_prob.is_zero() {
                let next = PlayerState {
                    deck: state.deck.remove_climax(),
                    waiting_room: state.waiting_room,
                    level: state.level,
                    clock: state.clock.add_card(true),
                    look_ahead: state.look_ahead.clone(),
                    probability: &state.probability * &climax_prob,
                }
                .level_up_check();
                work.push((next, left - 1));
            }
            if !non_climax_prob.is_zero() {
                let next = PlayerState {
                    deck: state.deck.remove_non_climax(),
                    waiting_room: state.waiting_room,
                    level: state.level,
                    clock: state.clock.add_card(false),
                    look_ahead: state.look_ahead,
                    probability: &state.probability * &non_climax_prob,
                }
                .level_up_check();
                work.push((next, left - 1));
            }
        }
        Ok(merged.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{PlayerState, TransitionError};
    use crate::model::lookahead::LookAhead;
    use crate::model::pool::CardPool;
    use crate::model::rational::{Rational, one, ratio, zero};
    use std::collections::BTreeMap;

    fn pool(total: u32, climax: u32) -> CardPool {
        CardPool::new(total, climax).unwrap()
    }

    fn player(deck: CardPool, waiting_room: CardPool) -> PlayerState {
        PlayerState::new(deck, waiting_room, CardPool::EMPTY, CardPool::EMPTY)
    }

    fn total_probability(states: &[PlayerState]) -> Rational {
        states
            .iter()
            .fold(zero(), |acc, state| acc + &state.probability)
    }

    #[test]
    fn hp_weights_levels_as_seven_clock_cards() {
        let state = PlayerState::new(pool(10, 2), pool(0, 0), pool(2, 0), pool(3, 1));
        assert_eq!(state.hp(), 17);
        assert!(!state.is_terminal());
        let dead = PlayerState::new(pool(10, 2), pool(0, 0), pool(4, 0), pool(0, 0));
        assert!(dead.is_terminal());
    }

    #[test]
    fn level_up_converts_full_sevens() {
        let state = PlayerState::new(pool(10, 0), pool(0, 0), pool(0, 0), pool(7, 0));
        let leveled = state.level_up_check();
        assert_eq!(leveled.level, pool(1, 0));
        assert_eq!(leveled.clock, pool(0, 0));
        assert_eq!(leveled.waiting_room, pool(7, 0));
    }

    #[test]
    fn level_up_remainder_loses_climax_identity() {
        let state = PlayerState::new(pool(10, 0), pool(1, 1), pool(1, 0), pool(9, 2));
        let leveled = state.level_up_check();
        assert_eq!(leveled.level, pool(2, 0));
        // Both clock climaxes follow the promoted cards, the two leftover
        // clock cards are counted as plain cards.
        assert_eq!(leveled.clock, pool(2, 0));
        assert_eq!(leveled.waiting_room, pool(8, 3));
    }

    #[test]
    fn level_up_below_seven_is_identity() {
        let state = PlayerState::new(pool(10, 0), pool(0, 0), pool(0, 0), pool(6, 3));
        assert_eq!(state.clone().level_up_check(), state);
    }

    #[test]
    fn refresh_requires_an_empty_deck_and_cards_to_recycle() {
        let full = player(pool(3, 1), pool(2, 0));
        assert_eq!(full.refresh_deck(), Err(TransitionError::DeckNotEmpty));
        let exhausted = player(pool(0, 0), pool(0, 0));
        assert_eq!(
            exhausted.refresh_deck(),
            Err(TransitionError::NothingToRecycle)
        );
    }

    #[test]
    fn refresh_of_all_climax_waiting_room_is_deterministic() {
        let state = player(pool(0, 0), pool(3, 3));
        let branches = state.refresh_deck().unwrap();
        assert_eq!(branches.len(), 1);
        let branch = &branches[0];
        assert_eq!(branch.probability, one());
        assert_eq!(branch.deck, pool(2, 2));
        assert_eq!(branch.waiting_room, pool(0, 0));
        assert_eq!(branch.clock, pool(1, 1));
    }

    #[test]
    fn refresh_branches_split_on_the_penalty_card() {
        let state = player(pool(0, 0), pool(4, 1));
        let branches = state.refresh_deck().unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(total_probability(&branches), one());
        let climax = branches
            .iter()
            .find(|branch| branch.clock.climax() == 1)
            .unwrap();
        assert_eq!(climax.probability, ratio(1, 4));
        assert_eq!(climax.deck, pool(3, 0));
    }

    #[test]
    fn refresh_clears_look_ahead_knowledge() {
        let mut state = player(pool(0, 0), pool(4, 1));
        state.look_ahead = LookAhead::known_non_climax(2);
        for branch in state.refresh_deck().unwrap() {
            assert!(branch.look_ahead.is_empty());
        }
    }

    #[test]
    fn top_card_prefers_look_ahead_knowledge() {
        let mut state = player(pool(5, 2), pool(0, 0));
        state.look_ahead = LookAhead::known_non_climax(1);
        let (prob, after) = state.top_climax_prob().unwrap();
        assert_eq!(prob, zero());
        assert!(after.look_ahead.is_empty());

        let (prob, after) = after.top_climax_prob().unwrap();
        assert_eq!(prob, ratio(2, 5));
        assert_eq!(after.deck, pool(5, 2));
    }

    #[test]
    fn top_card_fails_on_an_empty_deck() {
        let state = player(pool(0, 0), pool(4, 1));
        assert!(matches!(
            state.top_climax_prob(),
            Err(TransitionError::EmptyDeck)
        ));
    }

    #[test]
    fn damage_through_a_climax_free_deck_is_certain() {
        let state = player(pool(10, 0), pool(0, 0));
        let results = state.take_damage(3).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].probability, one());
        assert_eq!(results[0].clock, pool(3, 0));
        assert_eq!(results[0].deck, pool(7, 0));
    }

    #[test]
    fn damage_zero_is_rejected() {
        let state = player(pool(10, 0), pool(0, 0));
        assert_eq!(
            state.take_damage(0),
            Err(TransitionError::ZeroAmount("damage"))
        );
    }

    #[test]
    fn single_damage_splits_between_cancel_and_hit() {
        let state = player(pool(2, 1), pool(0, 0));
        let results = state.take_damage(1).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(total_probability(&results), one());

        let cancelled = results.iter().find(|s| s.clock.is_empty()).unwrap();
        assert_eq!(cancelled.probability, ratio(1, 2));
        assert_eq!(cancelled.deck, pool(1, 0));
        assert_eq!(cancelled.waiting_room, pool(1, 1));

        let hit = results.iter().find(|s| !s.clock.is_empty()).unwrap();
        assert_eq!(hit.probability, ratio(1, 2));
        assert_eq!(hit.clock, pool(1, 0));
        assert_eq!(hit.deck, pool(1, 1));
    }

    #[test]
    fn cancel_moves_prior_reveals_to_the_waiting_room() {
        let state = player(pool(3, 1), pool(0, 0));
        let results = state.take_damage(2).unwrap();
        assert_eq!(total_probability(&results), one());
        // A non-climax reveal followed by the climax: both cards end up in
        // the waiting room and the clock never moves.
        let late_cancel = results
            .iter()
            .find(|s| s.waiting_room == pool(2, 1))
            .unwrap();
        assert_eq!(late_cancel.deck, pool(1, 0));
        assert_eq!(late_cancel.clock, pool(0, 0));
        assert_eq!(late_cancel.probability, ratio(1, 3));
    }

    #[test]
    fn damage_refreshes_mid_check_and_keeps_counting() {
        let state = player(pool(1, 0), pool(5, 0));
        let results = state.take_damage(2).unwrap();
        assert_eq!(results.len(), 1);
        let only = &results[0];
        assert_eq!(only.probability, one());
        // One reveal empties the deck, the refresh penalty ticks the clock,
        // then the check finishes for two more.
        assert_eq!(only.clock, pool(3, 0));
        assert_eq!(only.deck, pool(3, 0));
        assert_eq!(only.waiting_room, pool(0, 0));
    }

    #[test]
    fn moka_sets_aside_non_climaxes_and_remembers_them() {
        let state = player(pool(3, 1), pool(0, 0));
        let results = state.take_moka(2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(total_probability(&results), one());

        // Climax found on either reveal: 1/3 + (2/3)(1/2) = 2/3.
        let found = results.iter().find(|s| s.deck == pool(2, 0)).unwrap();
        assert_eq!(found.probability, ratio(2, 3));
        assert_eq!(found.waiting_room, pool(1, 1));
        assert_eq!(found.look_ahead.len(), 1);

        // No climax in two reveals: (2/3)(1/2) = 1/3, deck untouched.
        let missed = results.iter().find(|s| s.deck == pool(3, 1)).unwrap();
        assert_eq!(missed.probability, ratio(1, 3));
        assert_eq!(missed.waiting_room, pool(0, 0));
        assert_eq!(missed.look_ahead.len(), 2);
    }

    #[test]
    fn moka_count_is_capped_at_the_deck_size() {
        let state = player(pool(2, 2), pool(0, 0));
        let results = state.take_moka(5).unwrap();
        // Both cards are climaxes, so the deck empties and refreshes from the
        // two cards just put into the waiting room.
        assert_eq!(total_probability(&results), one());
        for state in &results {
            assert_eq!(state.deck, pool(1, 1));
            assert_eq!(state.clock, pool(1, 1));
        }
    }

    #[test]
    fn michiru_fast_path_matches_hand_computed_hypergeometric() {
        let state = player(pool(4, 2), pool(0, 0));
        let buckets = state.michiru(2).unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[&0][0].probability, ratio(1, 6));
        assert_eq!(buckets[&1][0].probability, ratio(2, 3));
        assert_eq!(buckets[&2][0].probability, ratio(1, 6));
        assert_eq!(buckets[&2][0].deck, pool(2, 0));
        assert_eq!(buckets[&2][0].waiting_room, pool(2, 2));
    }

    #[test]
    fn michiru_fast_and_slow_paths_agree() {
        let state = player(pool(6, 2), pool(3, 1));
        let fast = state.michiru_fast(3).unwrap();
        let slow = state.michiru_slow(3).unwrap();
        assert_eq!(
            fast.keys().collect::<Vec<_>>(),
            slow.keys().collect::<Vec<_>>()
        );
        for (drawn, fast_bucket) in &fast {
            let slow_bucket = &slow[drawn];
            let mut fast_merged: BTreeMap<_, Rational> = BTreeMap::new();
            for state in fast_bucket {
                *fast_merged.entry(state.key()).or_insert_with(zero) += &state.probability;
            }
            let mut slow_merged: BTreeMap<_, Rational> = BTreeMap::new();
            for state in slow_bucket {
                *slow_merged.entry(state.key()).or_insert_with(zero) += &state.probability;
            }
            assert_eq!(fast_merged, slow_merged, "bucket {drawn} diverged");
        }
    }

    #[test]
    fn michiru_slow_path_handles_deck_exhaustion() {
        let state = player(pool(1, 0), pool(2, 1));
        let buckets = state.michiru(2).unwrap();
        let mass = buckets
            .values()
            .flatten()
            .fold(zero(), |acc, s| acc + &s.probability);
        assert_eq!(mass, one());
    }

    #[test]
    fn woody_peek_is_hypergeometric() {
        let state = player(pool(4, 2), pool(0, 0));
        let probs = state.woody(2).unwrap();
        assert_eq!(probs[&0], ratio(1, 6));
        assert_eq!(probs[&1], ratio(2, 3));
        assert_eq!(probs[&2], ratio(1, 6));
    }

    #[test]
    fn woody_zero_is_rejected() {
        let state = player(pool(4, 2), pool(0, 0));
        assert_eq!(state.woody(0), Err(TransitionError::ZeroAmount("woody")));
    }

    #[test]
    fn woody_covered_by_the_queue_is_certain() {
        let mut state = player(pool(5, 2), pool(0, 0));
        state.look_ahead = LookAhead::known_non_climax(2);
        let probs = state.woody(2).unwrap();
        assert_eq!(probs.len(), 1);
        assert_eq!(probs[&0], one());
    }

    #[test]
    fn woody_discounts_known_cards_before_the_tail() {
        let mut state = player(pool(5, 2), pool(0, 0));
        state.look_ahead = LookAhead::known_non_climax(2);
        // Two known non-climaxes leave a three-card tail with both climaxes.
        let probs = state.woody(3).unwrap();
        assert_eq!(probs.len(), 2);
        assert_eq!(probs[&0], ratio(1, 3));
        assert_eq!(probs[&1], ratio(2, 3));
    }

    #[test]
    fn put_to_clock_levels_up_on_every_placement() {
        let state = PlayerState::new(pool(2, 0), pool(0, 0), pool(0, 0), pool(6, 0));
        let results = state.put_to_clock(1).unwrap();
        assert_eq!(results.len(), 1);
        let leveled = &results[0];
        assert_eq!(leveled.level, pool(1, 0));
        assert_eq!(leveled.clock, pool(0, 0));
        assert_eq!(leveled.waiting_room, pool(7, 0));
    }

    #[test]
    fn put_to_clock_splits_on_climax_placements() {
        let state = player(pool(3, 1), pool(0, 0));
        let results = state.put_to_clock(2).unwrap();
        assert_eq!(total_probability(&results), one());
        let with_climax = results.iter().find(|s| s.clock.climax() == 1).unwrap();
        assert_eq!(with_climax.clock.total(), 2);
        assert_eq!(with_climax.probability, ratio(2, 3));
    }
}
