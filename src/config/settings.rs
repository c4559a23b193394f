//! Application settings loading from crewdesk.toml
//!
//! Every field has a default, so a missing file yields a working local-only
//! setup with the expense tracker pointed at its hosted collection.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default settings file name, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "crewdesk.toml";

/// Hosted expense collection used when nothing else is configured.
pub const DEFAULT_EXPENSES_URL: &str = "https://67c49168c4649b9551b3fdd6.mockapi.io/ExpenseTracker";

/// Slice keys mirrored to durable storage unless configured otherwise.
pub const DEFAULT_WHITELIST: [&str; 4] = [
    "employees-root",
    "filter-root",
    "appointments",
    "appointment-filter",
];

/// The whole settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SeaORM connection string for durable storage
    pub database_url: String,
    /// Remote collection endpoints
    pub remote: RemoteSettings,
    /// Which slices survive restarts
    pub persistence: PersistenceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/crewdesk.sqlite?mode=rwc".to_string(),
            remote: RemoteSettings::default(),
            persistence: PersistenceSettings::default(),
        }
    }
}

/// `[remote]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Expense collection; empty disables remote sync for expenses
    pub expenses_url: String,
    /// Employee collection; absent keeps employees local-only
    pub employees_url: Option<String>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            expenses_url: DEFAULT_EXPENSES_URL.to_string(),
            employees_url: None,
        }
    }
}

/// `[persistence]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    /// Keys written to storage
    pub whitelist: Vec<String>,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            whitelist: DEFAULT_WHITELIST.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings: {e}"),
        })
    }

    /// Applies `DATABASE_URL` and `CREWDESK_EXPENSES_URL` when set.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var("DATABASE_URL").ok(),
            std::env::var("CREWDESK_EXPENSES_URL").ok(),
        )
    }

    fn with_overrides(mut self, database_url: Option<String>, expenses_url: Option<String>) -> Self {
        if let Some(url) = database_url {
            debug!("DATABASE_URL overrides settings file");
            self.database_url = url;
        }
        if let Some(url) = expenses_url {
            debug!("CREWDESK_EXPENSES_URL overrides settings file");
            self.remote.expenses_url = url;
        }
        self
    }
}

/// Loads settings from `path`, then applies environment overrides.
///
/// A missing file is not an error; defaults are used instead.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let settings = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read settings file {}: {e}", path.display()),
        })?;
        Settings::from_toml(&contents)?
    } else {
        info!("No settings file at {}, using defaults", path.display());
        Settings::default()
    };
    Ok(settings.with_env_overrides())
}
