//! Error types for stampede-core.

use thiserror::Error;

/// Result type alias using stampede-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for stampede operations
#[derive(Error, Debug)]
pub enum Error {
    // Job store errors
    #[error("Failed to connect to job store at {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("No job store endpoints configured")]
    NoEndpoints,

    #[error("Failed to submit job {guid}: {reason}")]
    SubmitFailed { guid: String, reason: String },

    #[error("Job store returned {status} for {operation}")]
    UnexpectedStatus {
        operation: &'static str,
        status: reqwest::StatusCode,
    },

    // Watch errors
    #[error("Completion watch closed unexpectedly")]
    WatchClosed,

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error for a failed job submission
    pub fn submit_failed(guid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SubmitFailed {
            guid: guid.into(),
            reason: reason.into(),
        }
    }
}
