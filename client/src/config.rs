use crate::driver::{Schedule, Stage};
use highstakes_types::{
    Rules, BET_OFFER_ID_RANGE, CUSTOMER_ID_RANGE, DEFAULT_NUM_STAKES, LEADERBOARD_CAPACITY,
    MAX_STAKE, MIN_STAKE,
};
use serde::{Deserialize, Serialize};
use std::{ops::Range, time::Duration};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("num_stakes must be at least 1")]
    NoStakes,
    #[error("invalid stake range (min={min}, max={max})")]
    StakeRange { min: u64, max: u64 },
    #[error("min_valid_stake {min_valid} exceeds max_stake {max}")]
    ValidStakeRange { min_valid: u64, max: u64 },
    #[error("{field} range is empty ({start}..{end})")]
    EmptyIdRange {
        field: &'static str,
        start: u32,
        end: u32,
    },
    #[error("at least one stage is required")]
    NoStages,
}

/// Run configuration, usually loaded from YAML. Missing fields take the
/// defaults below.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub base_url: String,
    pub log_level: String,
    /// Seed for the stake pool. Random when unset.
    pub seed: Option<u64>,
    pub num_stakes: usize,
    /// Lower bound for generated stakes.
    pub min_stake: u64,
    pub max_stake: u64,
    /// Lower bound a leaderboard stake must respect.
    pub min_valid_stake: u64,
    pub exact_leaderboard_len: bool,
    pub customer_ids: Range<u32>,
    pub bet_offer_ids: Range<u32>,
    pub stages: Vec<Stage>,
    /// Pause between iterations of one virtual user.
    pub pacing_ms: u64,
    pub request_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            log_level: "info".to_string(),
            seed: None,
            num_stakes: DEFAULT_NUM_STAKES,
            min_stake: MIN_STAKE,
            max_stake: MAX_STAKE,
            min_valid_stake: MIN_STAKE,
            exact_leaderboard_len: false,
            customer_ids: CUSTOMER_ID_RANGE,
            bet_offer_ids: BET_OFFER_ID_RANGE,
            stages: vec![
                Stage::new(Duration::from_secs(60), 100),
                Stage::new(Duration::from_secs(15 * 60), 100),
                Stage::new(Duration::from_secs(60), 0),
            ],
            pacing_ms: 1_000,
            request_timeout_ms: None,
        }
    }
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_stakes == 0 {
            return Err(ConfigError::NoStakes);
        }
        if self.min_stake == 0 || self.min_stake >= self.max_stake {
            return Err(ConfigError::StakeRange {
                min: self.min_stake,
                max: self.max_stake,
            });
        }
        if self.min_valid_stake > self.max_stake {
            return Err(ConfigError::ValidStakeRange {
                min_valid: self.min_valid_stake,
                max: self.max_stake,
            });
        }
        for (field, range) in [
            ("customer_ids", &self.customer_ids),
            ("bet_offer_ids", &self.bet_offer_ids),
        ] {
            if range.is_empty() {
                return Err(ConfigError::EmptyIdRange {
                    field,
                    start: range.start,
                    end: range.end,
                });
            }
        }
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        Ok(())
    }

    pub fn rules(&self) -> Rules {
        Rules {
            min_stake: self.min_valid_stake,
            max_stake: self.max_stake,
            capacity: LEADERBOARD_CAPACITY,
            exact_len: self.exact_leaderboard_len,
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.stages.clone())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
