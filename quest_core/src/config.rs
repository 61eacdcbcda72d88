//! Configuration file support for Questlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/questlog/config.toml`.

use crate::activity::DEFAULT_MAX_LOOKBACK;
use crate::{Error, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub streak: StreakConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DataConfig {
    /// Unset means the platform data directory (see [`Config::data_dir`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Day boundary configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA timezone name used for "today" and start-of-day
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Streak evaluation parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreakConfig {
    #[serde(default = "default_max_lookback")]
    pub max_lookback: u32,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            max_lookback: default_max_lookback(),
        }
    }
}

/// Calendar display parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            default_window_days: default_window_days(),
        }
    }
}

// Default value functions
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .or_else(|| home_dir().map(|home| home.join(".local/share")))
        .map(|base| base.join("questlog"))
        .ok_or_else(|| {
            Error::Config("no data directory found; set data.data_dir or HOME".into())
        })
}

fn default_timezone() -> String {
    "UTC".into()
}

fn default_max_lookback() -> u32 {
    DEFAULT_MAX_LOOKBACK
}

fn default_window_days() -> u32 {
    7
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
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

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .or_else(|| home_dir().map(|home| home.join(".config")))
            .map(|base| base.join("questlog").join("config.toml"))
            .ok_or_else(|| Error::Config("no config directory found; set HOME".into()))
    }

    /// Reject values that would make evaluation meaningless
    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if self.calendar.default_window_days == 0 {
            return Err(Error::Config(
                "calendar.default_window_days must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The configured timezone
    pub fn timezone(&self) -> Result<Tz> {
        crate::dates::parse_timezone(&self.schedule.timezone)
    }

    /// The configured data directory, or the platform default
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    /// Path of the template book inside the data directory
    pub fn templates_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("templates.json"))
    }

    /// Path of the instance log inside the data directory
    pub fn instances_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("instances.jsonl"))
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
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
