//! Error types shared by every model in the crate.

use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors surfaced by fitting, predicting, configuring or loading data.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Cannot fit a model on an empty dataset.")]
    EmptyDataset,

    #[error("Model wasn't fitted yet.")]
    UnfittedModel,

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Non-finite value at row {row}, {location}")]
    NonFiniteValue { row: usize, location: String },

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Undefined metric: {0}")]
    UndefinedMetric(String),

    #[error("Search direction couldn't be solved, the Hessian approximation is singular.")]
    SingularMatrix,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ModelError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
