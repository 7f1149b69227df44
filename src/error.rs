//! Error types for feed synchronization.

use thiserror::Error;

/// Main error type for feed operations.
///
/// Errors are cloneable so the last failure of a feed can be kept in its
/// state for later inspection while the same value is returned to the caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// Transport failure or non-2xx response. `status` is `None` when no
    /// response was received at all.
    #[error("Network error (status {status:?}): {body}")]
    Network { status: Option<u16>, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Unknown feed: {0}")]
    UnknownFeed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FeedError {
    /// Transport-level failure with no HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        FeedError::Network {
            status: None,
            body: message.into(),
        }
    }

    /// Whether this error came from a fetch (and so lands in `last_error`).
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            FeedError::Network { .. } | FeedError::Decode(_) | FeedError::InvalidCursor(_)
        )
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Decode(e.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(e: url::ParseError) -> Self {
        FeedError::InvalidCursor(e.to_string())
    }
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
