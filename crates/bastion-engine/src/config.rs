//! Configuration for the secure operation engine.

use std::collections::BTreeMap;
use std::path::Path;

use bastion_types::Identity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timelock::CancelWindow;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    InvalidIdentity { field: &'static str, reason: String },

    #[error("time-lock period for {0} must be greater than zero")]
    InvalidPeriod(String),
}

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Chain id every meta-transaction must be signed for
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Hex identity of the engine; meta-transactions name it as handler contract
    #[serde(default = "default_engine_identity")]
    pub engine_identity: String,

    /// Hex identity seeded into OWNER_ROLE at bootstrap
    #[serde(default)]
    pub owner: Option<String>,

    /// Time-lock configuration
    #[serde(default)]
    pub timelock: TimeLockConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            engine_identity: default_engine_identity(),
            owner: None,
            timelock: TimeLockConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Development preset: one-minute time-locks, verbose logging.
    pub fn development() -> Self {
        Self {
            timelock: TimeLockConfig {
                default_period_secs: 60,
                overrides: BTreeMap::new(),
            },
            logging: LoggingConfig {
                level: "debug".into(),
                json: false,
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine_identity()?;
        self.owner_identity()?;
        if self.timelock.default_period_secs == 0 {
            return Err(ConfigError::InvalidPeriod("default".into()));
        }
        if let Some((name, _)) = self
            .timelock
            .overrides
            .iter()
            .find(|(_, o)| o.period_secs == Some(0))
        {
            return Err(ConfigError::InvalidPeriod(name.clone()));
        }
        Ok(())
    }

    /// The engine identity. Must not be zero.
    pub fn engine_identity(&self) -> Result<Identity, ConfigError> {
        let identity =
            Identity::from_hex(&self.engine_identity).map_err(|e| ConfigError::InvalidIdentity {
                field: "engine_identity",
                reason: e.to_string(),
            })?;
        if identity.is_zero() {
            return Err(ConfigError::InvalidIdentity {
                field: "engine_identity",
                reason: "must not be zero".into(),
            });
        }
        Ok(identity)
    }

    pub fn owner_identity(&self) -> Result<Option<Identity>, ConfigError> {
        self.owner
            .as_deref()
            .map(|hex| {
                Identity::from_hex(hex).map_err(|e| ConfigError::InvalidIdentity {
                    field: "owner",
                    reason: e.to_string(),
                })
            })
            .transpose()
    }
}

/// Time-lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLockConfig {
    /// Period applied to operation types without an override
    #[serde(default = "default_period")]
    pub default_period_secs: u64,

    /// Per operation type name
    #[serde(default)]
    pub overrides: BTreeMap<String, OperationOverride>,
}

impl Default for TimeLockConfig {
    fn default() -> Self {
        Self {
            default_period_secs: default_period(),
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOverride {
    #[serde(default)]
    pub period_secs: Option<u64>,

    #[serde(default)]
    pub cancel_window: Option<CancelWindow>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_chain_id() -> u64 {
    1
}

/// Engine identity used when none is configured.
pub const DEFAULT_ENGINE_IDENTITY: Identity = Identity::from_bytes([0xb5; 32]);

fn default_engine_identity() -> String {
    DEFAULT_ENGINE_IDENTITY.to_hex()
}

fn default_period() -> u64 {
    24 * 60 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}
