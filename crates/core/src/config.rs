//! Configuration schema and loader
//!
//! Settings are read from a TOML file (`bookline.toml`) with sensible
//! defaults for every field, then overridden from the environment where
//! a variable is set. The schedule section is an immutable value handed
//! to the engines at startup; nothing reads it as ambient state.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::slots::Slot;

const DEFAULT_FIRST_SLOT: Slot = match Slot::from_minutes(9 * 60) {
    Some(slot) => slot,
    None => unreachable!(),
};

const DEFAULT_LAST_SLOT: Slot = match Slot::from_minutes(17 * 60 + 30) {
    Some(slot) => slot,
    None => unreachable!(),
};

/// Business-day schedule parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// First bookable mark of the day
    pub first_slot: Slot,
    /// Last bookable mark of the day (inclusive)
    pub last_slot: Slot,
    /// Slot length in minutes
    pub slot_minutes: u32,
    /// Minimum lead time before a same-day slot can still be offered
    pub lead_time_minutes: u32,
    /// How far ahead bookings are accepted, in months
    pub horizon_months: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            first_slot: DEFAULT_FIRST_SLOT,
            last_slot: DEFAULT_LAST_SLOT,
            slot_minutes: 30,
            lead_time_minutes: 30,
            horizon_months: 6,
        }
    }
}

/// Telegram delivery credentials; notifications are disabled when unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// TCP port the booking server listens on
    pub listen_port: u16,
    /// Override for the data directory; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
    pub schedule: ScheduleConfig,
    pub telegram: TelegramConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_port: 7431,
            data_dir: None,
            schedule: ScheduleConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the given path, or from `bookline.toml` in
    /// the working directory. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("bookline.toml"));

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let config: AppConfig =
                toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))?;
            info!(path = %path.display(), "Loaded configuration");
            config
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            AppConfig::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Environment overrides: credentials and the listen port
    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            if !token.is_empty() {
                self.telegram.bot_token = Some(token);
            }
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            if !chat_id.is_empty() {
                self.telegram.chat_id = Some(chat_id);
            }
        }
        if let Ok(port) = std::env::var("BOOKLINE_PORT") {
            if let Ok(port) = port.parse() {
                self.listen_port = port;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let schedule = &self.schedule;
        if schedule.first_slot > schedule.last_slot {
            return Err(Error::Config(
                "first_slot must not be after last_slot".into(),
            ));
        }
        if schedule.slot_minutes == 0 {
            return Err(Error::Config("slot_minutes must be positive".into()));
        }
        if schedule.horizon_months == 0 {
            return Err(Error::Config("horizon_months must be positive".into()));
        }
        Ok(())
    }

    /// Resolve the SQLite database path
    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.join("bookline.db"));
        }

        let dirs = ProjectDirs::from("app", "bookline", "bookline").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;

        Ok(dirs.data_dir().join("bookline.db"))
    }
}
