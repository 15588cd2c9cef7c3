//! Error types for Cadence
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in Cadence
#[derive(Debug, Error)]
pub enum CadenceError {
    /// A review or update was requested for a concept with no schedule
    #[error("Concept not scheduled: {0}")]
    NotScheduled(String),

    /// Scheduling parameters failed construction-time validation
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Caller supplied an unusable argument (empty id, non-positive threshold, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A plain schedule record could not be turned back into a schedule
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Cadence operations
pub type Result<T> = std::result::Result<T, CadenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_scheduled_error() {
        let err = CadenceError::NotScheduled("concept-42".to_string());
        assert_eq!(err.to_string(), "Concept not scheduled: concept-42");
    }

    #[test]
    fn test_invalid_parameters_error() {
        let err = CadenceError::InvalidParameters("interval must be >= 1".to_string());
        assert_eq!(err.to_string(), "Invalid parameters: interval must be >= 1");
    }

    #[test]
    fn test_invalid_input_error() {
        let err = CadenceError::InvalidInput("concept id is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: concept id is empty");
    }

    #[test]
    fn test_storage_error() {
        let err = CadenceError::Storage("index poisoned".to_string());
        assert_eq!(err.to_string(), "Storage error: index poisoned");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CadenceError = io_err.into();
        assert!(matches!(err, CadenceError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: CadenceError = json_err.into();
        assert!(matches!(err, CadenceError::Json(_)));
    }
}
