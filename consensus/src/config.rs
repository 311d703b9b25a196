//! Consensus tuning knobs.
//!
//! Every field has a serde default so a partial TOML section (or none at all)
//! yields a working configuration.

use serde::{Deserialize, Serialize};
use weft_types::EventData;

use crate::error::ConsensusError;

/// Which integer on an event is compared against the ancient threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncientMode {
    /// Events are ancient once their generation falls below the threshold.
    #[default]
    GenerationThreshold,
    /// Events are ancient once their birth round falls below the threshold.
    BirthRoundThreshold,
}

impl AncientMode {
    /// The ancient indicator of an event under this mode.
    pub fn indicator(&self, event: &EventData) -> u64 {
        match self {
            AncientMode::GenerationThreshold => event.generation(),
            AncientMode::BirthRoundThreshold => event.birth_round(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Number of decided rounds whose events are still non-ancient.
    #[serde(default = "default_rounds_non_ancient")]
    pub rounds_non_ancient: u64,

    /// Number of decided rounds retained before their events expire.
    #[serde(default = "default_rounds_expired")]
    pub rounds_expired: u64,

    /// Every `coin_freq`-th voting round of an election is a coin round.
    #[serde(default = "default_coin_freq")]
    pub coin_freq: u64,

    #[serde(default)]
    pub ancient_mode: AncientMode,
}

fn default_rounds_non_ancient() -> u64 {
    26
}

fn default_rounds_expired() -> u64 {
    1000
}

fn default_coin_freq() -> u64 {
    12
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            rounds_non_ancient: default_rounds_non_ancient(),
            rounds_expired: default_rounds_expired(),
            coin_freq: default_coin_freq(),
            ancient_mode: AncientMode::default(),
        }
    }
}

impl ConsensusConfig {
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.rounds_non_ancient == 0 {
            return Err(ConsensusError::InvalidConfig(
                "rounds_non_ancient must be at least 1".into(),
            ));
        }
        if self.coin_freq < 2 {
            return Err(ConsensusError::InvalidConfig(
                "coin_freq must be at least 2".into(),
            ));
        }
        if self.rounds_expired < self.rounds_non_ancient {
            return Err(ConsensusError::InvalidConfig(format!(
                "rounds_expired ({}) must not be below rounds_non_ancient ({})",
                self.rounds_expired, self.rounds_non_ancient
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ConsensusConfig::default();
        assert_eq!(config.rounds_non_ancient, 26);
        assert_eq!(config.rounds_expired, 1000);
        assert_eq!(config.coin_freq, 12);
        assert_eq!(config.ancient_mode, AncientMode::GenerationThreshold);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: ConsensusConfig = toml::from_str("").unwrap();
        assert_eq!(config, ConsensusConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let config: ConsensusConfig =
            toml::from_str("coin_freq = 4\nancient_mode = \"birth_round_threshold\"").unwrap();
        assert_eq!(config.coin_freq, 4);
        assert_eq!(config.ancient_mode, AncientMode::BirthRoundThreshold);
        assert_eq!(config.rounds_non_ancient, 26);
    }

    #[test]
    fn expired_below_non_ancient_rejected() {
        let config = ConsensusConfig {
            rounds_non_ancient: 30,
            rounds_expired: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConsensusError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_window_rejected() {
        let config = ConsensusConfig {
            rounds_non_ancient: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
