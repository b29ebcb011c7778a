//! Error types for forest training and explanation summaries

use thiserror::Error;

/// Result type alias for forest-insight operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Optimization error: {0}")]
    OptimizationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<polars::error::PolarsError> for InsightError {
    fn from(err: polars::error::PolarsError) -> Self {
        InsightError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for InsightError {
    fn from(err: serde_json::Error) -> Self {
        InsightError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for InsightError {
    fn from(err: ndarray::ShapeError) -> Self {
        InsightError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for InsightError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        InsightError::ThreadPoolError(err.to_string())
    }
}
