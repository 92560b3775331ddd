//! Error types for the AstroMenu retrieval system
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - Error codes for machine-readable identification
//! - A split between degradable failures (extraction/verification) and
//!   fatal ones (vector index), mirroring the pipeline's recovery policy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,

    // Resource errors (4xxx)
    NotFound,
    DishNotFound,

    // External service errors (8xxx)
    UpstreamError,
    CompletionError,
    CompletionTimeout,
    EmbeddingError,
    EmbeddingTimeout,
    IndexError,
    IndexUnavailable,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::DishNotFound => 4002,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::CompletionError => 8002,
            ErrorCode::CompletionTimeout => 8003,
            ErrorCode::EmbeddingError => 8004,
            ErrorCode::EmbeddingTimeout => 8005,
            ErrorCode::IndexError => 8006,
            ErrorCode::IndexUnavailable => 8007,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Dish not found: {id}")]
    DishNotFound { id: u32 },

    // External service errors
    #[error("Completion service error: {message}")]
    CompletionError { message: String },

    #[error("Completion timeout after {timeout_ms}ms")]
    CompletionTimeout { timeout_ms: u64 },

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Embedding timeout after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    #[error("Vector index error: {message}")]
    IndexError { message: String },

    #[error("Vector index unavailable: {message}")]
    IndexUnavailable { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::DishNotFound { .. } => ErrorCode::DishNotFound,
            AppError::CompletionError { .. } => ErrorCode::CompletionError,
            AppError::CompletionTimeout { .. } => ErrorCode::CompletionTimeout,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::EmbeddingTimeout { .. } => ErrorCode::EmbeddingTimeout,
            AppError::IndexError { .. } => ErrorCode::IndexError,
            AppError::IndexUnavailable { .. } => ErrorCode::IndexUnavailable,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the pipeline may recover from this error in place.
    ///
    /// Completion-service failures degrade locally (unconstrained search,
    /// conservative rejection); index failures cannot be salvaged and fail
    /// the question.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            AppError::CompletionError { .. }
                | AppError::CompletionTimeout { .. }
                | AppError::Serialization(_)
        )
    }

    /// Whether this error is fatal for the question being processed
    pub fn is_fatal_for_question(&self) -> bool {
        matches!(
            self,
            AppError::IndexError { .. }
                | AppError::IndexUnavailable { .. }
                | AppError::EmbeddingError { .. }
                | AppError::EmbeddingTimeout { .. }
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DishNotFound { id: 42 };
        assert_eq!(err.code(), ErrorCode::DishNotFound);
        assert_eq!(err.code().as_code(), 4002);
    }

    #[test]
    fn test_index_error_is_fatal() {
        let err = AppError::IndexUnavailable {
            message: "connection refused".into(),
        };
        assert!(err.is_fatal_for_question());
        assert!(!err.is_degradable());
    }

    #[test]
    fn test_completion_error_degrades() {
        let err = AppError::CompletionTimeout { timeout_ms: 30000 };
        assert!(err.is_degradable());
        assert!(!err.is_fatal_for_question());
    }
}
