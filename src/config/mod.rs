//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::tournament::{ScoringRules, MAXIMUM_TOTAL_ROUNDS};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Points handed out for each game result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_win")]
    pub win: u32,

    #[serde(default = "default_draw")]
    pub draw: u32,

    #[serde(default)]
    pub loss: u32,
}

fn default_win() -> u32 {
    2
}

fn default_draw() -> u32 {
    1
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            win: default_win(),
            draw: default_draw(),
            loss: 0,
        }
    }
}

impl ScoringConfig {
    pub fn rules(&self) -> ScoringRules {
        ScoringRules {
            win: self.win,
            draw: self.draw,
            loss: self.loss,
        }
    }
}

/// Round count settings for new matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundsConfig {
    /// Rounds of a newly created match
    #[serde(default = "default_total_rounds")]
    pub default_total: u32,

    #[serde(default = "default_maximum_rounds")]
    pub maximum: u32,
}

fn default_total_rounds() -> u32 {
    7
}

fn default_maximum_rounds() -> u32 {
    MAXIMUM_TOTAL_ROUNDS
}

impl Default for RoundsConfig {
    fn default() -> Self {
        Self {
            default_total: default_total_rounds(),
            maximum: default_maximum_rounds(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Journal used when no `--file` is given
    #[serde(default = "default_match_file")]
    pub match_file: PathBuf,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub rounds: RoundsConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_match_file() -> PathBuf {
    PathBuf::from("./match.jsonl")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            match_file: default_match_file(),
            scoring: ScoringConfig::default(),
            rounds: RoundsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Like `from_file`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scoring.win <= self.scoring.draw {
            return Err(ConfigError::ValidationError(
                "A win must be worth more than a draw".to_string(),
            ));
        }

        if self.scoring.draw < self.scoring.loss {
            return Err(ConfigError::ValidationError(
                "A draw must be worth at least a loss".to_string(),
            ));
        }

        if self.rounds.maximum > MAXIMUM_TOTAL_ROUNDS {
            return Err(ConfigError::ValidationError(format!(
                "Maximum rounds cannot exceed {}",
                MAXIMUM_TOTAL_ROUNDS
            )));
        }

        if self.rounds.default_total == 0 || self.rounds.default_total > self.rounds.maximum {
            return Err(ConfigError::ValidationError(format!(
                "Default rounds must be between 1 and {}",
                self.rounds.maximum
            )));
        }

        Ok(())
    }
}
