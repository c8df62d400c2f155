//! Error types for the ensemble engine.

use thiserror::Error;

/// Errors that can occur while collecting, aligning or aggregating fragments.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Levels of {member} do not overlap the reference levels: {detail}")]
    LevelMismatch { member: String, detail: String },

    #[error("Batch worker for issue {issue} stopped: {reason}")]
    WorkerPanicked { issue: String, reason: String },

    #[error("No site-selection candidates for {site}")]
    NoSiteCandidates { site: String },

    #[error("Source unavailable: {0}")]
    Source(String),

    #[error("Report sink failed: {0}")]
    Sink(String),

    #[error(transparent)]
    Derive(#[from] met_derive::DeriveError),

    #[error(transparent)]
    Common(#[from] met_common::MetError),
}

impl EngineError {
    /// Create an InvalidThresholds error.
    pub fn invalid_thresholds(msg: impl Into<String>) -> Self {
        Self::InvalidThresholds(msg.into())
    }

    /// Create a Source error.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a Sink error.
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
