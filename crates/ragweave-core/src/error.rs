//! Unified error taxonomy for the pipeline.
//!
//! Component operations return `RagResult` rather than aborting; the
//! orchestrators treat a failed sub-step as fatal for that single request
//! only. No variant triggers automatic retries — retry is the caller's
//! decision, except the task poll loop which retries until `Timeout`.

use thiserror::Error;

/// Result type used across all pipeline components.
pub type RagResult<T> = Result<T, RagError>;

/// Pipeline error kinds.
#[derive(Debug, Error)]
pub enum RagError {
    /// Bad parameters (e.g., chunk overlap >= chunk size)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Nothing to process
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A batch was empty after filtering invalid items
    #[error("Empty batch: {0}")]
    EmptyBatch(String),

    /// Malformed item shape
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Vectors of different dimensions were compared
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Dependency bring-up failed
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Embedding stage failed
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Retrieval stage failed
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Generation stage failed
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Malformed search query (e.g., missing query embedding)
    #[error("Query error: {0}")]
    Query(String),

    /// Workflow trigger failed (unconfigured endpoint or non-2xx status)
    #[error("Trigger failed: {0}")]
    Trigger(String),

    /// Completion notification failed
    #[error("Notification failed: {0}")]
    Notify(String),

    /// Wall-clock deadline exceeded
    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Transport-level failure talking to an external service
    #[error("Network error: {0}")]
    Network(String),

    /// External service returned an error response
    #[error("API error: {message} (code: {code:?})")]
    Api {
        code: Option<String>,
        message: String,
    },

    /// Payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unexpected internal failure (e.g., a background task aborted)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RagError {
    /// Timeout error from an elapsed duration.
    pub fn timeout(elapsed_ms: u64) -> Self {
        Self::Timeout { elapsed_ms }
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// API error with an optional status code.
    pub fn api(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RagError::Network(format!("request timed out: {err}"))
        } else {
            RagError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagError::Config("overlap must be smaller than chunk size".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: overlap must be smaller than chunk size"
        );
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = RagError::dimension_mismatch(384, 512);
        assert!(err.to_string().contains("384"));
        assert!(err.to_string().contains("512"));
    }

    #[test]
    fn test_timeout_display() {
        let err = RagError::timeout(300_000);
        assert_eq!(err.to_string(), "Operation timed out after 300000ms");
    }
}
