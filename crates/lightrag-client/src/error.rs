//! Error types for the LightRAG client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the LightRAG server
///
/// Request-time failures share the `LightRAG API request failed` prefix;
/// callers are not expected to tell them apart.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection refused, timeout, or a failure while reading the body
    #[error("LightRAG API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("LightRAG API request failed: {method} {url} returned {status}: {body}")]
    Status {
        method: reqwest::Method,
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body was not valid JSON
    #[error("LightRAG API request failed: invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A path identifier was empty
    #[error("LightRAG API request failed: empty identifier in path {path}")]
    EmptySegment { path: String },

    /// The configured base URL cannot be used
    #[error("invalid LightRAG server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A configured credential or workspace cannot be sent as a header
    #[error("invalid value for header {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },
}

impl Error {
    /// HTTP status of the failed call, when the server produced one
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }
}
