//! Process configuration for hosts embedding the engine.
//!
//! Values come from `Default`, from `DAYLOG_*` environment variables, or
//! from any serde source the host prefers. All paths are validated before
//! use; relative log directories are rejected.

use crate::enrichment::DEFAULT_ENRICHMENT_TIMEOUT;
use crate::logging::default_log_level;
use crate::model::date_key::parse_time_zone;
use serde::{Deserialize, Deserializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "DAYLOG_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "DAYLOG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DAYLOG_LOG_DIR";
pub const ENV_ENRICHMENT_TIMEOUT_SECS: &str = "DAYLOG_ENRICHMENT_TIMEOUT_SECS";
pub const ENV_DEFAULT_TIMEZONE: &str = "DAYLOG_DEFAULT_TIMEZONE";

const DEFAULT_DB_FILE: &str = "daylog.sqlite3";
const DEFAULT_TIMEZONE: &str = "UTC";

/// Configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key} `{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Must be absolute.
    pub log_dir: PathBuf,
    #[serde(
        rename = "enrichment_timeout_secs",
        deserialize_with = "deserialize_secs"
    )]
    pub enrichment_timeout: Duration,
    /// Zone assigned to users created without an explicit one.
    pub default_timezone: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join("daylog-logs"),
            enrichment_timeout: DEFAULT_ENRICHMENT_TIMEOUT,
            default_timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl CoreConfig {
    /// Builds configuration from `DAYLOG_*` variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup over the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = present(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value.trim());
        }
        if let Some(value) = present(ENV_LOG_LEVEL) {
            config.log_level = value.trim().to_ascii_lowercase();
        }
        if let Some(value) = present(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(value.trim());
        }
        if let Some(value) = present(ENV_ENRICHMENT_TIMEOUT_SECS) {
            let secs = value
                .trim()
                .parse::<u64>()
                .map_err(|err| ConfigError::InvalidValue {
                    key: ENV_ENRICHMENT_TIMEOUT_SECS,
                    value: value.clone(),
                    reason: err.to_string(),
                })?;
            config.enrichment_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = present(ENV_DEFAULT_TIMEZONE) {
            config.default_timezone = value.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(
            self.log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "warning" | "error"
        ) {
            return Err(ConfigError::InvalidValue {
                key: ENV_LOG_LEVEL,
                value: self.log_level.clone(),
                reason: "expected trace|debug|info|warn|error".to_string(),
            });
        }
        if !self.log_dir.is_absolute() {
            return Err(ConfigError::InvalidValue {
                key: ENV_LOG_DIR,
                value: self.log_dir.display().to_string(),
                reason: "must be an absolute path".to_string(),
            });
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: ENV_DB_PATH,
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.enrichment_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: ENV_ENRICHMENT_TIMEOUT_SECS,
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        parse_time_zone(&self.default_timezone).map_err(|err| ConfigError::InvalidValue {
            key: ENV_DEFAULT_TIMEZONE,
            value: self.default_timezone.clone(),
            reason: err.to_string(),
        })?;
        Ok(())
    }
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
