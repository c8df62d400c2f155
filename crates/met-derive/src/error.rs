//! Error types for quantity derivation.

use thiserror::Error;

/// Errors that can occur while deriving one quantity from one source file.
#[derive(Error, Debug)]
pub enum DeriveError {
    /// The source file has no field with the requested quantity code.
    #[error("field {code} missing from {source_name}")]
    MissingField { code: String, source_name: String },

    /// A required level or valid time has no matching slice.
    #[error("no matching level for {code}: {detail}")]
    MissingLevel { code: String, detail: String },

    /// Slice data does not match the declared grid, or two inputs disagree in shape.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Nothing inside the requested valid-time window.
    #[error("no {code} values inside the valid-time window")]
    EmptyWindow { code: String },

    /// The site point lies outside the field's grid.
    #[error("site point ({x:.4}, {y:.4}) is outside the {code} grid")]
    OutsideGrid { code: String, x: f64, y: f64 },

    /// Inputs present but unusable (NaN at the site, non-physical values).
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Unit conversion failed.
    #[error("unit error: {0}")]
    Units(#[from] met_common::MetError),
}

impl DeriveError {
    /// Create a MissingField error.
    pub fn missing_field(code: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self::MissingField {
            code: code.into(),
            source_name: source_name.into(),
        }
    }

    /// Create a MissingLevel error.
    pub fn missing_level(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MissingLevel {
            code: code.into(),
            detail: detail.into(),
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create a Malformed error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Result type for derivation operations.
pub type Result<T> = std::result::Result<T, DeriveError>;
