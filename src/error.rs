//! Error types for the tabular-insight pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Target column not found: no column matches any of {keywords:?}")]
    TargetNotFound { keywords: Vec<String> },

    #[error("Empty dataset: no rows left after {stage}")]
    EmptyDataset { stage: String },

    #[error("Training backend '{backend}' failed: {reason}")]
    TrainingBackend { backend: String, reason: String },

    #[error("Diagnostic '{artifact}' failed: {reason}")]
    Diagnostic { artifact: String, reason: String },

    #[error("Pipeline failed during {stage}: {source}")]
    Pipeline {
        stage: String,
        #[source]
        source: Box<InsightError>,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl InsightError {
    /// Wrap a stage failure, leaving `TargetNotFound` untouched so callers can
    /// still match on it directly.
    pub fn in_stage(self, stage: &str) -> Self {
        match self {
            err @ (InsightError::TargetNotFound { .. } | InsightError::Pipeline { .. }) => err,
            other => InsightError::Pipeline {
                stage: stage.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Innermost error behind any pipeline wrappers
    pub fn root_cause(&self) -> &InsightError {
        match self {
            InsightError::Pipeline { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the failure is attributable to the caller's input (4xx-like)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.root_cause(),
            InsightError::TargetNotFound { .. }
                | InsightError::EmptyDataset { .. }
                | InsightError::DataError(_)
                | InsightError::ValidationError(_)
        )
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InsightError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: InsightError = io_err.into();
        assert!(matches!(err, InsightError::IoError(_)));
    }

    #[test]
    fn test_stage_wrapping_keeps_target_not_found() {
        let err = InsightError::TargetNotFound { keywords: vec!["revenue".into()] }.in_stage("preprocessing");
        assert!(matches!(err, InsightError::TargetNotFound { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_stage_wrapping_carries_cause() {
        let err = InsightError::TrainingBackend {
            backend: "linear_regression".into(),
            reason: "singular".into(),
        }
        .in_stage("training");

        assert!(matches!(err, InsightError::Pipeline { .. }));
        assert!(err.to_string().contains("singular"));
        assert!(matches!(err.root_cause(), InsightError::TrainingBackend { .. }));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_empty_dataset_is_client_error() {
        let err = InsightError::EmptyDataset { stage: "missing-value filtering".into() }.in_stage("preprocessing");
        assert!(err.is_client_error());
        assert!(matches!(err.root_cause(), InsightError::EmptyDataset { .. }));
    }
}
