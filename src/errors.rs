//! Unified error types for `crewdesk`.
//!
//! Store operations capture remote failures on the slice itself, so most of
//! these variants surface from configuration, startup, and form validation.

use crate::remote::RemoteError;
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings file could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of what went wrong
        message: String,
    },

    /// A form submission failed one or more field rules
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A call against a remote collection endpoint failed
    #[error("Remote collection error: {0}")]
    Remote(#[from] RemoteError),

    /// Durable storage (SQLite) error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A slice or filter could not be encoded for durable storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
