use crate::game::state::CombinedState;
use crate::model::attacker::AttackerState;
use crate::model::operator::{Operator, OperatorGroup};
use crate::model::player::PlayerState;
use crate::model::pool::CardPool;
use serde::{Deserialize, Serialize};

/// Validated, serializable description of one damage-check encounter: the
/// defender's zones, the attacker's deck, the actions to resolve, and the
/// damage delta that counts as a kill. Pool invariants are enforced during
/// deserialization, so a decoded scenario is always consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub deck: CardPool,
    pub waiting_room: CardPool,
    #[serde(default)]
    pub level: CardPool,
    #[serde(default)]
    pub clock: CardPool,
    /// Set-aside resource pile; carried for completeness, no transition
    /// consumes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<CardPool>,
    pub attacker_deck: CardPool,
    #[serde(default)]
    pub operators: Vec<Operator>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<OperatorGroup>,
    pub kill_threshold: u32,
}

impl Scenario {
    /// The root state every exploration starts from, with probability one.
    pub fn root(&self) -> CombinedState {
        CombinedState::new(
            PlayerState::new(self.deck, self.waiting_room, self.level, self.clock),
            AttackerState::new(self.attacker_deck),
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
