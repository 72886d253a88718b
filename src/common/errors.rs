//! Error types for the trader

use thiserror::Error;

/// Result type alias using our TraderError
pub type Result<T> = std::result::Result<T, TraderError>;

/// Main error type for trader operations
#[derive(Error, Debug)]
pub enum TraderError {
    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Filesystem errors (checkpoints)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Venue read/write failures
    #[error("Venue error: {0}")]
    Venue(String),

    /// Checkpoint could not be used
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::time::error::Elapsed> for TraderError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        TraderError::Timeout(err.to_string())
    }
}
