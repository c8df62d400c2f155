//! Error types for the shared meteorological types.

use thiserror::Error;

/// Result type alias using MetError.
pub type MetResult<T> = Result<T, MetError>;

/// Errors raised while building or parsing shared types.
#[derive(Debug, Error)]
pub enum MetError {
    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Invalid time window: start {start} is not before end {end}")]
    InvalidWindow { start: String, end: String },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Invalid coordinate for '{field}': {value}")]
    InvalidCoordinate { field: String, value: f64 },

    #[error("Unit conversion from {from} to {to} is not supported")]
    UnsupportedConversion { from: String, to: String },
}

impl From<chrono::ParseError> for MetError {
    fn from(err: chrono::ParseError) -> Self {
        MetError::InvalidTime(err.to_string())
    }
}
