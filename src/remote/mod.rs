//! Remote collection client.
//!
//! Each entity type that is backed by a REST collection talks to it through
//! [`RemoteCollection`]. One call maps to one HTTP request: no retries, no
//! batching, and no timeout beyond the transport default.

mod http;

pub use http::HttpCollection;

use crate::store::Record;
use async_trait::async_trait;
use thiserror::Error;

/// Body carried by a failed response.
///
/// Callers may only assume "string or object".
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// Body that parsed as JSON
    Json(serde_json::Value),
    /// Raw body text
    Text(String),
}

impl ErrorBody {
    pub(crate) fn from_text(text: String) -> Self {
        serde_json::from_str(&text).map_or(Self::Text(text), Self::Json)
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Failure of a single remote call.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a response (DNS, connect, TLS, reset...)
    #[error("transport error: {message}")]
    Transport {
        /// Transport error message
        message: String,
    },

    /// The server answered with a non-2xx status
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: ErrorBody,
    },

    /// A 2xx response whose body was not the expected entity
    #[error("could not decode response: {message}")]
    Decode {
        /// Decoder error message
        message: String,
    },

    /// The store has no remote collection configured
    #[error("no remote collection configured for {collection}")]
    Unconfigured {
        /// Collection name
        collection: &'static str,
    },
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode {
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }
}

/// Result type for remote collection calls
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// A REST collection of `T` records.
#[async_trait]
pub trait RemoteCollection<T: Record>: Send + Sync {
    /// `GET /<collection>`
    async fn list(&self) -> RemoteResult<Vec<T>>;

    /// `POST /<collection>`; the returned record carries the server-assigned id.
    async fn create(&self, record: &T) -> RemoteResult<T>;

    /// `PUT /<collection>/{id}` with a partial or full body.
    async fn replace(&self, id: &str, patch: &T::Patch) -> RemoteResult<T>;

    /// `DELETE /<collection>/{id}`; the response body is ignored.
    async fn delete(&self, id: &str) -> RemoteResult<()>;
}
