//! Combined game state, operator dispatch, and scenario plumbing.
//!
//! This module is composed of:
//! - `state`: the player/attacker pair and the operator dispatcher.
//! - `cache`: transition results memoized by structural state and operation.
//! - `scenario`: the validated, serializable description of an encounter.

pub mod cache;
pub mod scenario;
pub mod state;

pub use cache::TransitionCache;
pub use scenario::Scenario;
pub use state::{CombinedKey, CombinedState};
