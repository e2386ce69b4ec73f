//! # Error Types
//!
//! Structured error taxonomy for the dispatch and execution engine using
//! thiserror instead of `Box<dyn Error>` patterns.
//!
//! Propagation rules:
//! - `Validation` and `NotFound` surface immediately to the synchronous
//!   caller and are never retried.
//! - `Dispatch`, `Execution` and `Timeout` surface to the synchronous caller
//!   as failures; retry policy belongs to the submitter.
//! - On the asynchronous path, `Execution` and `Delivery` errors are
//!   swallowed into backoff-and-redeliver because no caller is waiting.
//! - `Configuration` errors are fatal at process startup.

use thiserror::Error;

/// Crate-wide error type covering every dispatch-path failure class.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("{resource} not found: {name}")]
    NotFound { resource: String, name: String },

    #[error("Dispatch failed: {message}")]
    Dispatch { message: String },

    #[error("Execution failed: {message}")]
    Execution { message: String },

    #[error("Timeout: {operation} exceeded {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("Delivery failed: {operation}: {message}")]
    Delivery { operation: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ApiError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an app-not-found error
    pub fn app_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "App".to_string(),
            name: name.into(),
        }
    }

    /// Create a route-not-found error
    pub fn route_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "Route".to_string(),
            name: name.into(),
        }
    }

    /// Create a dispatch error
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    /// Create a delivery error
    pub fn delivery(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for the error classes a synchronous caller should treat as its
    /// own fault (bad input or unknown target) rather than a platform fault.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            ApiError::Validation { .. } | ApiError::NotFound { .. }
        )
    }
}

/// Result type alias for dispatch-path operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ApiError::validation("missing route path");
        assert!(matches!(err, ApiError::Validation { .. }));

        let err = ApiError::route_not_found("/myapp/missing");
        assert!(matches!(err, ApiError::NotFound { .. }));

        let err = ApiError::timeout("run", 30);
        assert!(matches!(err, ApiError::Timeout { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::route_not_found("/a/b");
        let display = format!("{err}");
        assert!(display.contains("Route not found"));
        assert!(display.contains("/a/b"));

        let err = ApiError::delivery("delete", "queue closed");
        let display = format!("{err}");
        assert!(display.contains("Delivery failed"));
        assert!(display.contains("delete"));
        assert!(display.contains("queue closed"));
    }

    #[test]
    fn test_caller_fault_classification() {
        assert!(ApiError::validation("bad").is_caller_fault());
        assert!(ApiError::app_not_found("x").is_caller_fault());
        assert!(!ApiError::dispatch("channel closed").is_caller_fault());
        assert!(!ApiError::timeout("run", 1).is_caller_fault());
    }
}
