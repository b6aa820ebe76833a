//! Error types for talent-retention

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, RetentionError>;

/// Main error type for training, encoding and inference
#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("Data error: {0}")]
    DataError(String),

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

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A categorical value that was never observed during training.
    #[error("Unknown category {value:?} for column '{column}'")]
    UnknownCategory { column: String, value: String },

    /// Input columns diverge from the trained feature schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Persisted artifacts do not belong together or use an unsupported format.
    #[error("Artifact version mismatch: expected {expected}, found {found}")]
    ArtifactVersionMismatch { expected: String, found: String },
}

impl RetentionError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RetentionError::UnknownCategory { .. }
                | RetentionError::SchemaMismatch(_)
                | RetentionError::InvalidInput(_)
                | RetentionError::FeatureNotFound(_)
        )
    }
}

impl From<polars::error::PolarsError> for RetentionError {
    fn from(err: polars::error::PolarsError) -> Self {
        RetentionError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for RetentionError {
    fn from(err: serde_json::Error) -> Self {
        RetentionError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RetentionError {
    fn from(err: ndarray::ShapeError) -> Self {
        RetentionError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RetentionError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_unknown_category_display() {
        let err = RetentionError::UnknownCategory {
            column: "city".to_string(),
            value: "city_999".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown category \"city_999\" for column 'city'");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RetentionError = io_err.into();
        assert!(matches!(err, RetentionError::IoError(_)));
        assert!(!err.is_client_error());
    }
}
