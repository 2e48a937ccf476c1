use crate::model::player::TransitionError;
use crate::model::pool::CardPool;
use crate::model::rational::{Rational, one};
use num_traits::Zero;

/// The attacking player: a deck whose climax count doubles as the soul
/// marker tally, plus a stock pile recording every card revealed by a
/// trigger. The stock is a tally only, no transition consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackerState {
    pub deck: CardPool,
    pub stock: CardPool,
    pub probability: Rational,
}

/// The two possible results of a trigger check, each carrying the attacker
/// state after the reveal and the branch's own probability. A branch that
/// cannot occur is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub soul: Option<(AttackerState, Rational)>,
    pub no_soul: Option<(AttackerState, Rational)>,
}

impl AttackerState {
    pub fn new(deck: CardPool) -> Self {
        Self {
            deck,
            stock: CardPool::EMPTY,
            probability: one(),
        }
    }

    /// Reveals the top card of the attacker's deck and checks it for a soul
    /// marker; the card moves to stock either way.
    pub fn trigger(&self) -> Result<TriggerOutcome, TransitionError> {
        if self.deck.is_empty() {
            return Err(TransitionError::EmptyAttackerDeck);
        }

        let soul_prob = self.deck.climax_ratio();
        let no_soul_prob = one() - &soul_prob;

        let soul = (!soul_prob.is_zero()).then(|| {
            (
                AttackerState {
                    deck: self.deck.remove_climax(),
                    stock: self.stock.add_card(true),
                    probability: &self.probability * &soul_prob,
                },
                soul_prob.clone(),
            )
        });
        let no_soul = (!no_soul_prob.is_zero()).then(|| {
            (
                AttackerState {
                    deck: self.deck.remove_non_climax(),
                    stock: self.stock.add_card(false),
                    probability: &self.probability * &no_soul_prob,
                },
                no_soul_prob.clone(),
            )
        });

        Ok(TriggerOutcome { soul, no_soul })
    }
}
