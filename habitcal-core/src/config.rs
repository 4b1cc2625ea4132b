//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/habitcal/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/habitcal/` (~/.config/habitcal/)
//! - Data: `$XDG_DATA_HOME/habitcal/` (~/.local/share/habitcal/)
//! - State/Logs: `$XDG_STATE_HOME/habitcal/` (~/.local/state/habitcal/)
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [time]
//! zone = "local"          # or "utc", "+02:00"
//!
//! [import]
//! default_time_of_day = "morning"
//! unsure_hour = 12
//! use_current_year = true
//!
//! [storage]
//! key = "habit-cal-entries"
//! ```

use crate::error::{Error, Result};
use crate::store::{StoreOptions, DEFAULT_STORAGE_KEY};
use crate::types::TimeOfDay;
use crate::zone::Zone;
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Wall-clock zone for calendar views
    #[serde(default)]
    pub time: TimeConfig,

    /// Bulk import defaults
    #[serde(default)]
    pub import: ImportConfig,

    /// Storage slot naming
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Time zone configuration
#[derive(Debug, Deserialize)]
pub struct TimeConfig {
    /// `local`, `utc` or a fixed offset like `+02:00`
    #[serde(default = "default_zone")]
    pub zone: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            zone: default_zone(),
        }
    }
}

fn default_zone() -> String {
    "local".to_string()
}

/// Import defaults
#[derive(Debug, Deserialize)]
pub struct ImportConfig {
    /// Bucket for import chunks with neither a label nor a clock time
    #[serde(default = "default_time_of_day")]
    pub default_time_of_day: TimeOfDay,

    /// Hour (0-23) standing in for `not-sure`
    #[serde(default = "default_unsure_hour")]
    pub unsure_hour: u32,

    /// Fall back to the current year when import text has no year line
    #[serde(default = "default_use_current_year")]
    pub use_current_year: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_time_of_day: default_time_of_day(),
            unsure_hour: default_unsure_hour(),
            use_current_year: default_use_current_year(),
        }
    }
}

fn default_time_of_day() -> TimeOfDay {
    TimeOfDay::Morning
}

fn default_unsure_hour() -> u32 {
    12
}

fn default_use_current_year() -> bool {
    true
}

/// Storage configuration
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Named slot holding the record array
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
        }
    }
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        self.zone()?;
        if self.import.unsure_hour > 23 {
            return Err(Error::Config(
                "import.unsure_hour must be between 0 and 23".to_string(),
            ));
        }
        if self.storage.key.trim().is_empty() {
            return Err(Error::Config("storage.key must not be empty".to_string()));
        }
        Ok(())
    }

    /// The configured wall-clock zone
    pub fn zone(&self) -> Result<Zone> {
        self.time
            .zone
            .parse()
            .map_err(|e| Error::Config(format!("time.zone: {}", e)))
    }

    /// Store settings derived from this configuration
    pub fn store_options(&self) -> Result<StoreOptions> {
        Ok(StoreOptions {
            key: self.storage.key.clone(),
            zone: self.zone()?,
            default_time_of_day: self.import.default_time_of_day,
            unsure_hour: self.import.unsure_hour,
        })
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/habitcal/config.toml` (~/.config/habitcal/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("habitcal").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/habitcal/` (~/.local/share/habitcal/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("habitcal")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/habitcal/` (~/.local/state/habitcal/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("habitcal")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/habitcal/data.db` (~/.local/share/habitcal/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/habitcal/habitcal.log` (~/.local/state/habitcal/habitcal.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("habitcal.log")
    }
}
