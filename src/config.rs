//! Engine Configuration
//!
//! Features:
//! - Rule presets (default game rules, free-form sandbox)
//! - Environment variable overrides (`DEADLOCK_*`)
//! - JSON configuration files
//! - Validation and a programmatic builder

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// When a session counts as won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinCondition {
    /// Every process has left the active set.
    #[default]
    AllProcessesCompleted,
    /// Every process has left the active set, or a deadlock was resolved.
    AllProcessesCompletedOrDeadlockResolved,
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Game rules
    pub rules: RulesConfig,

    /// Reward policy
    pub scoring: ScoringConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Run deadlock detection after every successful allocation
    pub check_deadlock_on_allocate: bool,

    /// Condition that ends the session as completed
    pub win_condition: WinCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Points per needed resource granted when a process completes
    pub reward_per_need: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules: RulesConfig {
                check_deadlock_on_allocate: true,
                win_condition: WinCondition::AllProcessesCompleted,
            },
            scoring: ScoringConfig {
                reward_per_need: 50,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl EngineConfig {
    /// Sandbox configuration: free-form simulation with verbose logging.
    pub fn sandbox() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("Invalid config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(check) = std::env::var("DEADLOCK_CHECK_ON_ALLOCATE") {
            self.rules.check_deadlock_on_allocate = check
                .parse()
                .map_err(|_| Error::ConfigError("Invalid DEADLOCK_CHECK_ON_ALLOCATE".to_string()))?;
        }

        if let Ok(reward) = std::env::var("DEADLOCK_REWARD_PER_NEED") {
            self.scoring.reward_per_need = reward
                .parse()
                .map_err(|_| Error::ConfigError("Invalid DEADLOCK_REWARD_PER_NEED".to_string()))?;
        }

        if let Ok(level) = std::env::var("DEADLOCK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("DEADLOCK_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.scoring.reward_per_need == 0 {
            return Err(Error::ConfigError(
                "reward_per_need must be positive".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(Error::ConfigError(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(Error::ConfigError(format!(
                "Invalid log format: {}. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            )));
        }

        Ok(())
    }
}

/// Configuration builder for programmatic setup
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn check_deadlock_on_allocate(mut self, enabled: bool) -> Self {
        self.config.rules.check_deadlock_on_allocate = enabled;
        self
    }

    pub fn with_win_condition(mut self, condition: WinCondition) -> Self {
        self.config.rules.win_condition = condition;
        self
    }

    pub fn with_reward_per_need(mut self, points: u32) -> Self {
        self.config.scoring.reward_per_need = points;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
