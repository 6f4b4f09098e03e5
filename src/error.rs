//! Error types for the batch ingestion driver

use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Batch driver errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Starting a job for a work item failed (network, auth, malformed response).
    /// Surfaced immediately; no tracker entry is created for the item.
    #[error("Submission failed for '{work_item}': {message}")]
    Submission { work_item: String, message: String },

    /// A status query failed at the transport level. Transient: callers retain
    /// the prior status and retry on the next round.
    #[error("Status probe failed: {0}")]
    Probe(String),

    /// The remote service returned a non-success or malformed response
    #[error("Remote service error: {0}")]
    Remote(String),

    /// Work item is not tracked
    #[error("Unknown work item: {0}")]
    UnknownWorkItem(String),

    /// A tracker entry already exists for the work item
    #[error("Work item already tracked: {0}")]
    AlreadyTracked(String),

    /// Resubmission requested for an entry that is not a terminal failure
    #[error("Cannot resubmit '{work_item}': entry is {state}")]
    InvalidResubmit { work_item: String, state: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a submission error
    pub fn submission(work_item: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Submission {
            work_item: work_item.into(),
            message: message.into(),
        }
    }

    /// Create a transient probe error
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe(message.into())
    }

    /// Create a remote service error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
