// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for polyseed
//!
//! Driver-specific errors (sqlx, mongodb, reqwest) are mapped to these
//! variants at the driver boundary so callers only ever match on one enum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all store and federation operations
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum EngineError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Query syntax error: {message}")]
    SyntaxError { message: String },

    #[error("Query execution error: {message}")]
    ExecutionError { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Refusing to overwrite existing data: {message}")]
    ResetRequired { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    /// Connection failure for a named backing store.
    pub fn unreachable(store: &str, endpoint: &str, cause: impl std::fmt::Display) -> Self {
        Self::ConnectionFailed {
            message: format!("cannot reach {store} at {endpoint}: {cause}"),
        }
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: msg.into() }
    }

    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError { message: msg.into() }
    }

    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::ExecutionError { message: msg.into() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError { message: msg.into() }
    }

    pub fn reset_required(msg: impl Into<String>) -> Self {
        Self::ResetRequired { message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }

    /// True when the failure means the store could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_names_store_and_endpoint() {
        let err = EngineError::unreachable("PostgreSQL", "localhost:5432", "connection refused");
        assert_eq!(
            err.to_string(),
            "Connection failed: cannot reach PostgreSQL at localhost:5432: connection refused"
        );
        assert!(err.is_unreachable());
    }

    #[test]
    fn reset_required_is_not_a_connection_problem() {
        let err = EngineError::reset_required("customers already exists");
        assert!(!err.is_unreachable());
        assert!(err.to_string().contains("customers already exists"));
    }

    #[test]
    fn serializes_with_variant_tag() {
        let err = EngineError::Timeout { timeout_ms: 500 };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"Timeout":{"timeout_ms":500}}"#);
    }
}
