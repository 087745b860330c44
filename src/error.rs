//! Error types for specloop
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in specloop
#[derive(Debug, Error)]
pub enum SpecloopError {
    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration could not be used as given
    #[error("Config error: {0}")]
    Config(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// LLM API returned an error that retrying will not fix
    #[error("LLM error: {0}")]
    Llm(String),

    /// A collaborator could not be reached, crashed, or is throttling us
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// External code generator error
    #[error("Codegen error: {0}")]
    Codegen(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SpecloopError {
    /// Whether this error means the other side was unreachable rather than wrong
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SpecloopError::Unavailable(_))
    }
}

impl From<reqwest::Error> for SpecloopError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SpecloopError::Llm(format!("Failed to decode response: {}", err))
        } else {
            SpecloopError::Unavailable(format!("Request failed: {}", err))
        }
    }
}

/// Result type alias for specloop operations
pub type Result<T> = std::result::Result<T, SpecloopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_error() {
        let err = SpecloopError::InvalidState("interview ended without requirements".to_string());
        assert_eq!(err.to_string(), "Invalid state: interview ended without requirements");
    }

    #[test]
    fn test_storage_error() {
        let err = SpecloopError::Storage("requirements dir missing".to_string());
        assert_eq!(err.to_string(), "Storage error: requirements dir missing");
    }

    #[test]
    fn test_llm_error() {
        let err = SpecloopError::Llm("bad request".to_string());
        assert_eq!(err.to_string(), "LLM error: bad request");
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_unavailable_error() {
        let err = SpecloopError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Unavailable: connection refused");
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SpecloopError = io_err.into();
        assert!(matches!(err, SpecloopError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: SpecloopError = json_err.into();
        assert!(matches!(err, SpecloopError::Json(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("key: [unclosed").unwrap_err();
        let err: SpecloopError = yaml_err.into();
        assert!(matches!(err, SpecloopError::Yaml(_)));
    }
}
