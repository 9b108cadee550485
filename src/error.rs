//! Error types for the `ant-feed` crate.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, FeedError>`.
//!
//! [`FeedError`] covers:
//! - **Format errors**: Binary frames too short or with an unknown kind tag
//! - **Cache misses**: No tick has arrived yet for an instrument
//! - **Connection errors**: WebSocket transport failures (retried internally)
//! - **Startup errors**: Token or instrument directory fetch failures
//! - **REST errors**: API error bodies, HTTP status and transport failures
//! - **Invalid arguments**: Client-side validation errors

use std::fmt;
use std::time::Duration;

/// Error response returned by the ANT REST API.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiErrorBody {
    /// Status string (usually `"error"`).
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable description of the error.
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.status.as_deref().unwrap_or("error"),
            self.message.as_deref().unwrap_or("No message"),
        )
    }
}

/// All possible errors produced by `ant-feed`.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// A binary frame was too short for its kind or carried an unknown tag.
    #[error("Malformed frame: {0}")]
    Format(String),

    /// No tick has been cached for the instrument yet.
    #[error("No market data for instrument {code}")]
    NotFound {
        /// The instrument code that was looked up.
        code: u32,
    },

    /// A WebSocket-level error.
    #[error("WebSocket error: {0}")]
    Connection(Box<tokio_tungstenite::tungstenite::Error>),

    /// The access token could not be obtained.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The instrument directory could not be fetched.
    #[error("Instrument directory unavailable: {0}")]
    Directory(String),

    /// The connection did not reach the open state in time.
    #[error("Connection not open after {0:?}")]
    OpenTimeout(Duration),

    /// The connection was stopped.
    #[error("Connection closed")]
    Closed,

    /// An error response returned by the REST API.
    #[error("API error: {0}")]
    Api(ApiErrorBody),

    /// The server returned an unexpected HTTP status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code.
        status: reqwest::StatusCode,
        /// The response body text.
        body: String,
    },

    /// A network or transport-level error from `reqwest`.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to serialize or deserialize JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error building or parsing a URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The caller provided an invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(Box::new(e))
    }
}

impl FeedError {
    /// Whether this error is a cache miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;
