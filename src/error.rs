//! Error types for the k-NN explorer

use thiserror::Error;

/// Result type alias for explorer operations
pub type Result<T> = std::result::Result<T, ExplorerError>;

/// Main error type for the explorer
#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

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

    #[error("You must be logged in to access this page")]
    NotLoggedIn,
}

impl From<polars::error::PolarsError> for ExplorerError {
    fn from(err: polars::error::PolarsError) -> Self {
        ExplorerError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ExplorerError {
    fn from(err: serde_json::Error) -> Self {
        ExplorerError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ExplorerError {
    fn from(err: ndarray::ShapeError) -> Self {
        ExplorerError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
