//! Environment-based configuration.
//!
//! Every setting has a default, so an empty environment yields a working
//! shop. Unparseable values fall back to the default as well; only
//! inconsistent combinations are rejected by [`ShopConfig::validate`].
//!
//! | Variable | Default |
//! |---|---|
//! | `SABALITOS_DATA_DIR` | `./data` |
//! | `SABALITOS_SAVE_DEBOUNCE_MS` | `500` |
//! | `SABALITOS_CRITICAL_THRESHOLD` | `5` |
//! | `SABALITOS_WARNING_THRESHOLD` | `10` |
//! | `SABALITOS_NOTIFY_COOLDOWN_HOURS` | `24` |
//! | `SABALITOS_FEEDBACK_MS` | `3000` |
//! | `SABALITOS_REPORT_PAGE_SIZE` | `15` |
//! | `SABALITOS_SHUTDOWN_TIMEOUT` | `5` (seconds) |

use crate::alerts::AlertPolicy;
use crate::reports::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Shop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Directory holding `catalog.json` and `sales.json`
    pub data_dir: PathBuf,
    /// Quiet period before a changed blob is written
    pub save_debounce_ms: u64,
    /// Stock at or below this is critical
    pub critical_threshold: u32,
    /// Stock at or below this is low
    pub warning_threshold: u32,
    /// Minimum hours between repeat notifications for a product
    pub notify_cooldown_hours: i64,
    /// How long operator feedback stays visible
    pub feedback_ms: u64,
    /// Transactions per report page
    pub report_page_size: usize,
    /// Seconds to wait for pending writes on shutdown
    pub shutdown_timeout_secs: u64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            save_debounce_ms: 500,
            critical_threshold: 5,
            warning_threshold: 10,
            notify_cooldown_hours: 24,
            feedback_ms: 3000,
            report_page_size: DEFAULT_PAGE_SIZE,
            shutdown_timeout_secs: 5,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl ShopConfig {
    /// Reads the configuration from `SABALITOS_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            data_dir: env::var("SABALITOS_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            save_debounce_ms: env_or("SABALITOS_SAVE_DEBOUNCE_MS", defaults.save_debounce_ms),
            critical_threshold: env_or(
                "SABALITOS_CRITICAL_THRESHOLD",
                defaults.critical_threshold,
            ),
            warning_threshold: env_or("SABALITOS_WARNING_THRESHOLD", defaults.warning_threshold),
            notify_cooldown_hours: env_or(
                "SABALITOS_NOTIFY_COOLDOWN_HOURS",
                defaults.notify_cooldown_hours,
            ),
            feedback_ms: env_or("SABALITOS_FEEDBACK_MS", defaults.feedback_ms),
            report_page_size: env_or("SABALITOS_REPORT_PAGE_SIZE", defaults.report_page_size),
            shutdown_timeout_secs: env_or(
                "SABALITOS_SHUTDOWN_TIMEOUT",
                defaults.shutdown_timeout_secs,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns error if thresholds are inverted, the cooldown is out of range or
    /// a size is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warning_threshold < self.critical_threshold {
            return Err(ConfigError::ValidationError(format!(
                "warning_threshold ({}) must be >= critical_threshold ({})",
                self.warning_threshold, self.critical_threshold
            )));
        }
        if self.notify_cooldown_hours < 0 {
            return Err(ConfigError::ValidationError(
                "notify_cooldown_hours cannot be negative".to_string(),
            ));
        }
        if chrono::Duration::try_hours(self.notify_cooldown_hours).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "notify_cooldown_hours ({}) is out of range",
                self.notify_cooldown_hours
            )));
        }
        if self.report_page_size == 0 {
            return Err(ConfigError::ValidationError(
                "report_page_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Alert thresholds and cooldown
    #[must_use]
    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy {
            critical_threshold: self.critical_threshold,
            warning_threshold: self.warning_threshold,
            cooldown: chrono::Duration::try_hours(self.notify_cooldown_hours)
                .unwrap_or(chrono::TimeDelta::MAX),
        }
    }

    /// Get save debounce as Duration
    #[must_use]
    pub const fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Get feedback display time as Duration
    #[must_use]
    pub const fn feedback_duration(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }

    /// Get shutdown timeout as Duration
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
