//! Configuration file support for hydrate.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/hydrate/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub statistics: StatisticsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// How an unfinished "today" is treated by the streak count
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreakMode {
    /// Today counts with its partial total and breaks the streak if short
    #[default]
    Strict,
    /// A short today is skipped; counting starts from yesterday
    GraceToday,
}

/// Statistics parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatisticsConfig {
    #[serde(default)]
    pub streak_mode: StreakMode,

    /// How far back the streak walk may go
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Window used for the dashboard's average
    #[serde(default = "default_average_window_days")]
    pub average_window_days: i64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            streak_mode: StreakMode::default(),
            lookback_days: default_lookback_days(),
            average_window_days: default_average_window_days(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("hydrate")
}

fn default_lookback_days() -> u32 {
    365
}

fn default_average_window_days() -> i64 {
    7
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the statistics engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.statistics.lookback_days == 0 || self.statistics.lookback_days > 365 {
            return Err(Error::Config(format!(
                "statistics.lookback_days must be between 1 and 365 (got {})",
                self.statistics.lookback_days
            )));
        }
        if self.statistics.average_window_days <= 0 {
            return Err(Error::Config(format!(
                "statistics.average_window_days must be positive (got {})",
                self.statistics.average_window_days
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("hydrate").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
