//! Error types for citedin
//!
//! Provides a single error enum for the library crates with:
//! - Distinct variants for the failure modes of a session
//! - Error codes for machine-readable reporting
//! - Conversions from the underlying client, config and serde errors
//!
//! Malformed bibliographic API responses are not errors: they degrade to
//! "no citations found" inside the fetcher.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors (1xxx)
    InvalidDepth,
    InvalidState,
    InvalidPaperUrl,

    // External service errors (8xxx)
    UpstreamError,
    HttpClientError,

    // Internal errors (9xxx)
    WorkerStopped,
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidDepth => 1001,
            ErrorCode::InvalidState => 1002,
            ErrorCode::InvalidPaperUrl => 1003,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::HttpClientError => 8002,

            ErrorCode::WorkerStopped => 9001,
            ErrorCode::InternalError => 9002,
            ErrorCode::ConfigurationError => 9003,
            ErrorCode::SerializationError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Input errors
    #[error("Invalid depth {depth}: depth must be at least 1")]
    InvalidDepth { depth: usize },

    #[error("Depth change rejected while controller is {state}")]
    InvalidState { state: String },

    #[error("Not a paper URL: {url}")]
    InvalidPaperUrl { url: String },

    // External service errors
    #[error("Upstream returned HTTP {status} for {ids} ids")]
    Upstream { status: u16, ids: usize },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Background worker stopped: {worker}")]
    WorkerStopped { worker: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidDepth { .. } => ErrorCode::InvalidDepth,
            AppError::InvalidState { .. } => ErrorCode::InvalidState,
            AppError::InvalidPaperUrl { .. } => ErrorCode::InvalidPaperUrl,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::HttpClient(_) => ErrorCode::HttpClientError,
            AppError::WorkerStopped { .. } => ErrorCode::WorkerStopped,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Whether the caller passed something the session cannot act on
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidDepth { .. }
                | AppError::InvalidState { .. }
                | AppError::InvalidPaperUrl { .. }
        )
    }

    /// Whether the failure came from the bibliographic API
    pub fn is_upstream_error(&self) -> bool {
        matches!(self, AppError::Upstream { .. } | AppError::HttpClient(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::WorkerStopped {
            worker: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::InvalidDepth { depth: 0 };
        assert_eq!(err.code(), ErrorCode::InvalidDepth);
        assert_eq!(err.code().as_code(), 1001);
        assert!(err.is_input_error());
    }

    #[test]
    fn test_upstream_error() {
        let err = AppError::Upstream { status: 503, ids: 12 };
        assert_eq!(err.code(), ErrorCode::UpstreamError);
        assert!(err.is_upstream_error());
        assert!(!err.is_input_error());
        assert_eq!(err.to_string(), "Upstream returned HTTP 503 for 12 ids");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: AppError = config::ConfigError::Message("bad value".into()).into();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
    }
}
