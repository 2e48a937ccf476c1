//! Zone and state model for the damage-check engine.
//!
//! This module is composed of:
//! - `rational`: exact probability arithmetic and combinatorics helpers.
//! - `pool`: the `(total, climax)` card-pool primitive shared by every zone.
//! - `lookahead`: the queue of already-known top-card climax probabilities.
//! - `operator`: the typed game actions and atomic action groups.
//! - `player`: the defending player's zones and all draw/damage transitions.
//! - `attacker`: the attacking player's deck and the trigger check.

pub mod attacker;
pub mod lookahead;
pub mod operator;
pub mod player;
pub mod pool;
pub mod rational;

pub use attacker::{AttackerState, TriggerOutcome};
pub use lookahead::LookAhead;
pub use operator::{Operator, OperatorGroup};
pub use player::{PlayerKey, PlayerState, TransitionError};
pub use pool::{CardPool, ZoneError};
pub use rational::{Rational, binomial, hypergeometric, one, ratio, zero};
