//! Configuration for the context engine
//!
//! Values come from (lowest to highest precedence) built-in defaults, an
//! optional TOML file, and `CONTEXT_ENGINE__SECTION__KEY` environment
//! variables. A `.env` file is honoured when present.

use crate::error::{ContextError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment prefix for layered configuration
pub const ENV_PREFIX: &str = "CONTEXT_ENGINE";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Local offset used for time-of-day, weekday and calendar-day checks
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Holiday dates (YYYY-MM-DD)
    #[serde(default)]
    pub holidays: Vec<String>,

    /// Use the deadline-aware priority analyzer instead of the no-op one
    #[serde(default)]
    pub deadline_priority: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            holidays: vec![],
            deadline_priority: false,
        }
    }
}

impl EngineConfig {
    /// Parse the configured holiday list
    pub fn holiday_dates(&self) -> Result<Vec<NaiveDate>> {
        self.holidays
            .iter()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                    ContextError::Configuration(format!("Invalid holiday '{}': {}", raw, e))
                })
            })
            .collect()
    }
}

/// Change bus settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Spawn repository emissions instead of awaiting them
    #[serde(default)]
    pub detached_emit: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            detached_emit: false,
        }
    }
}

/// Context store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Contexts not updated for this many days are purged by the sweep
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Seconds between retention sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Minimum score for the high-priority query
    #[serde(default = "default_high_priority_min_score")]
    pub high_priority_min_score: u8,
}

/// Upper bound accepted for `retention_days` (100 years)
pub const MAX_RETENTION_DAYS: u32 = 36_500;

fn default_retention_days() -> u32 {
    90
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_high_priority_min_score() -> u8 {
    70
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval(),
            high_priority_min_score: default_high_priority_min_score(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load layered configuration: defaults, optional TOML file, environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env file is normal
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("Loading configuration file {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by flat environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CONTEXT_ENGINE_LOG_LEVEL") {
            config.logging.level = val;
        }

        if let Ok(val) = std::env::var("CONTEXT_ENGINE_LOG_JSON") {
            config.logging.json = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("CONTEXT_ENGINE_RETENTION_DAYS") {
            if let Ok(days) = val.parse() {
                config.store.retention_days = days;
            }
        }

        if let Ok(val) = std::env::var("CONTEXT_ENGINE_DETACHED_EMIT") {
            config.bus.detached_emit = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("CONTEXT_ENGINE_UTC_OFFSET_MINUTES") {
            if let Ok(offset) = val.parse() {
                config.engine.utc_offset_minutes = offset;
            }
        }

        config
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.engine.utc_offset_minutes.abs() > 14 * 60 {
            return Err(ContextError::Configuration(format!(
                "utc_offset_minutes out of range: {}",
                self.engine.utc_offset_minutes
            )));
        }

        self.engine.holiday_dates()?;

        if self.store.retention_days == 0 {
            return Err(ContextError::Configuration(
                "retention_days must be positive".to_string(),
            ));
        }

        if self.store.retention_days > MAX_RETENTION_DAYS {
            return Err(ContextError::Configuration(format!(
                "retention_days must be at most {}, got {}",
                MAX_RETENTION_DAYS, self.store.retention_days
            )));
        }

        if self.store.sweep_interval_secs == 0 {
            return Err(ContextError::Configuration(
                "sweep_interval_secs must be positive".to_string(),
            ));
        }

        if self.store.high_priority_min_score > 100 {
            return Err(ContextError::Configuration(format!(
                "high_priority_min_score must be at most 100, got {}",
                self.store.high_priority_min_score
            )));
        }

        Ok(())
    }
}
