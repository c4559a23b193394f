/// Database connection and table creation
pub mod database;

/// Application settings from crewdesk.toml and the environment
pub mod settings;

pub use settings::{Settings, load_settings};
