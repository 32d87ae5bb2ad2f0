//! # Engine Configuration
//!
//! Configuration management for the mutation engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ORDERLINE_LOCK_TTL_MS=30000                                        │
//! │     ORDERLINE_SWEEP_INTERVAL_SECS=60                                   │
//! │     ORDERLINE_TOTAL_TOLERANCE=0.01                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/orderline/engine.toml (Linux)                            │
//! │     ~/Library/Application Support/com.orderline.pos/engine.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # engine.toml
//! [locks]
//! ttl_ms = 30000
//! sweep_interval_secs = 60
//!
//! [validation]
//! total_tolerance = 0.01
//! menu_name_max_len = 100
//! menu_description_max_len = 500
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use orderline_core::ValidationRules;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Lock Settings
// =============================================================================

/// Lock table settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSettings {
    /// How long a lock may be held before another acquirer may evict it.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Period of the background expired-lock sweep.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_ms() -> u64 {
    30_000
}

fn default_sweep_interval() -> u64 {
    60
}

impl LockSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        LockSettings {
            ttl_ms: default_ttl_ms(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lock table settings.
    #[serde(default)]
    pub locks: LockSettings,

    /// Validation thresholds.
    #[serde(default)]
    pub validation: ValidationRules,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> EngineResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EngineError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| EngineError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.locks.ttl_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "locks.ttl_ms must be greater than 0".into(),
            ));
        }

        if self.locks.sweep_interval_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "locks.sweep_interval_secs must be greater than 0".into(),
            ));
        }

        let tolerance = self.validation.total_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "validation.total_tolerance must be a non-negative number, got {}",
                tolerance
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(ttl) = std::env::var("ORDERLINE_LOCK_TTL_MS") {
            match ttl.parse::<u64>() {
                Ok(ms) => {
                    debug!(ttl_ms = ms, "Overriding lock TTL from environment");
                    self.locks.ttl_ms = ms;
                }
                Err(_) => warn!(value = %ttl, "Ignoring unparsable ORDERLINE_LOCK_TTL_MS"),
            }
        }

        if let Ok(interval) = std::env::var("ORDERLINE_SWEEP_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse::<u64>() {
                self.locks.sweep_interval_secs = secs;
            }
        }

        if let Ok(tolerance) = std::env::var("ORDERLINE_TOTAL_TOLERANCE") {
            match tolerance.parse::<f64>() {
                Ok(t) => {
                    debug!(tolerance = t, "Overriding total tolerance from environment");
                    self.validation.total_tolerance = t;
                }
                Err(_) => warn!(value = %tolerance, "Ignoring unparsable ORDERLINE_TOTAL_TOLERANCE"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "orderline", "pos")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }
}
