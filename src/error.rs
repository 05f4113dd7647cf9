//! Error types for the lime-tabular crate

use thiserror::Error;

/// Result type alias for explainer operations
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum ExplainError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Predictor output mismatch: expected {expected}, got {actual}")]
    PredictorShape { expected: String, actual: String },

    #[error("Insufficient variance: feature '{feature}' has zero standard deviation in the reference sample")]
    InsufficientVariance { feature: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ExplainError {
    fn from(err: serde_json::Error) -> Self {
        ExplainError::Serialization(err.to_string())
    }
}
