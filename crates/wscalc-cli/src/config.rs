use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wscalc_core::game::Scenario;
use wscalc_core::model::CardPool;

use crate::ops::{self, OpParseError};

/// Scenario description loaded from a YAML file. Zone counts reuse the
/// engine's pools, so impossible counts are rejected during deserialization;
/// operators stay in shorthand text until [`to_scenario`](ScenarioConfig::to_scenario).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub name: String,
    pub player: PlayerConfig,
    pub attacker: AttackerConfig,
    #[serde(default)]
    pub operators: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    pub kill_threshold: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlayerConfig {
    pub deck: CardPool,
    pub waiting_room: CardPool,
    #[serde(default)]
    pub level: CardPool,
    #[serde(default)]
    pub clock: CardPool,
    #[serde(default)]
    pub stock: Option<CardPool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AttackerConfig {
    pub deck: CardPool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("scenario '{name}': {source}")]
    Operators {
        name: String,
        #[source]
        source: OpParseError,
    },
    #[error("scenario '{name}' lists no operators and no groups")]
    NoActions { name: String },
}

impl ScenarioConfig {
    /// Load and validate a scenario from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path_buf.clone(),
            source,
        })?;
        let reader = BufReader::new(file);
        let config: ScenarioConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                path: path_buf,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operators.is_empty() && self.groups.is_empty() {
            return Err(ConfigError::NoActions {
                name: self.name.clone(),
            });
        }
        self.parse_actions().map(|_| ())
    }

    /// Resolve the shorthand text into the engine's typed scenario.
    pub fn to_scenario(&self) -> Result<Scenario, ConfigError> {
        let (operators, groups) = self.parse_actions()?;
        Ok(Scenario {
            deck: self.player.deck,
            waiting_room: self.player.waiting_room,
            level: self.player.level,
            clock: self.player.clock,
            stock: self.player.stock,
            attacker_deck: self.attacker.deck,
            operators,
            groups,
            kill_threshold: self.kill_threshold,
        })
    }

    fn parse_actions(
        &self,
    ) -> Result<
        (
            Vec<wscalc_core::model::Operator>,
            Vec<wscalc_core::model::OperatorGroup>,
        ),
        ConfigError,
    > {
        let operators =
            ops::parse_sequence(&self.operators).map_err(|source| ConfigError::Operators {
                name: self.name.clone(),
                source,
            })?;
        let groups = ops::parse_groups(&self.groups).map_err(|source| ConfigError::Operators {
            name: self.name.clone(),
            source,
        })?;
        Ok((operators, groups))
    }
}
