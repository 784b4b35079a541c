//! Error types for Portico.
//!
//! Every fallible library operation returns [`Result`]. The `get` path of the
//! cache service degrades errors to an empty result; explicit refresh and
//! evict operations surface them per endpoint.

use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum PorticoError {
    /// Upstream call failed, timed out, or returned a non-success status.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Durable storage read/write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or received content is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Access key missing or wrong on a mutating request.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No data after the full fallback chain.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<serde_json::Error> for PorticoError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for PorticoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Fetch(format!("request timed out: {e}"))
        } else {
            Self::Fetch(e.to_string())
        }
    }
}

impl PorticoError {
    /// HTTP status used when this error terminates a request.
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::Io(_) | Self::Parse(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PorticoError>;
