//! Error types for the Agora engine
//!
//! One error enum for the whole crate, built with `thiserror`:
//! - Caller-facing variants (authentication, authorization, lookup, validation)
//! - Store and infrastructure variants with source chaining
//! - HTTP status and classification code mapping for API responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use sqlx::error::ErrorKind;
use std::borrow::Cow;
use thiserror::Error;
use tracing::debug;

/// Result type alias for Agora operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Agora engine
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Configuration error: {message}")]
    Config {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing required environment variable: {var}")]
    MissingEnvVar { var: &'static str },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig {
        key: &'static str,
        message: Cow<'static, str>,
    },

    // ========================================================================
    // Store Errors
    // ========================================================================
    #[error("Database error: {message}")]
    Database {
        message: Cow<'static, str>,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("Database connection pool exhausted")]
    PoolExhausted,

    #[error("Store query timeout after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    #[error("Migration error: {0}")]
    Migration(String),

    // ========================================================================
    // Caller-facing Errors
    // ========================================================================
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: Cow<'static, str> },

    #[error("Forbidden: {message}")]
    Forbidden { message: Cow<'static, str> },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    #[error("Destination not found for id {id}")]
    DestinationNotFound { id: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: Cow<'static, str> },

    #[error("Conflict: {message}")]
    Conflict { message: Cow<'static, str> },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Internal server error")]
    Internal {
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    // ========================================================================
    // Constructors for common error patterns
    // ========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a database error
    pub fn database(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    pub fn unauthenticated(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn destination_not_found(id: impl Into<String>) -> Self {
        Self::DestinationNotFound { id: id.into() }
    }

    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal {
            source: Some(Box::new(source)),
        }
    }

    // ========================================================================
    // Error Classification
    // ========================================================================

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Database { .. } | Error::PoolExhausted | Error::QueryTimeout { .. }
        )
    }

    /// Returns true if this error should be logged at error level
    pub fn is_error_level(&self) -> bool {
        matches!(
            self,
            Error::Database { .. } | Error::Internal { .. } | Error::Migration(_) | Error::Other(_)
        )
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::ValidationFailed { .. } | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } | Error::DestinationNotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            Error::QueryTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get classification code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } | Error::MissingEnvVar { .. } | Error::InvalidConfig { .. } => {
                "CONFIG_ERROR"
            }
            Error::Database { .. }
            | Error::PoolExhausted
            | Error::QueryTimeout { .. }
            | Error::Migration(_) => "DATABASE_ERROR",
            Error::Unauthenticated { .. } => "UNAUTHENTICATED",
            Error::Forbidden { .. } => "FORBIDDEN",
            Error::NotFound { .. } | Error::DestinationNotFound { .. } => "NOT_FOUND",
            Error::ValidationFailed { .. } | Error::Json(_) => "VALIDATION_FAILED",
            Error::Conflict { .. } => "CONFLICT",
            Error::Internal { .. } | Error::Other(_) => "INTERNAL_ERROR",
        }
    }
}

// ============================================================================
// Error Response for API
// ============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_error_level() {
            tracing::error!(code, "request failed: {:?}", self);
        }

        // Store and infrastructure details never reach the caller
        let message = if status.is_server_error() {
            match self {
                Error::QueryTimeout { .. } | Error::PoolExhausted => self.to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// From implementations for external error types
// ============================================================================

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Error::NotFound {
                entity_type: "record",
                id: "unknown".to_string(),
            },
            sqlx::Error::PoolTimedOut => Error::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                if let Some(mapped) = classify_violation(db_err.kind()) {
                    debug!(constraint = ?db_err.constraint(), "constraint violation");
                    return mapped;
                }
                Error::Database {
                    message: db_err.message().to_string().into(),
                    source: Some(err),
                }
            }
            _ => Error::Database {
                message: err.to_string().into(),
                source: Some(err),
            },
        }
    }
}

/// Caller-facing error for a violated constraint. Constraint names stay in the logs.
fn classify_violation(kind: ErrorKind) -> Option<Error> {
    match kind {
        ErrorKind::UniqueViolation => Some(Error::conflict("record already exists")),
        ErrorKind::ForeignKeyViolation => {
            Some(Error::validation("referenced record does not exist"))
        }
        ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
            Some(Error::validation("value violates a data constraint"))
        }
        _ => None,
    }
}

impl From<std::env::VarError> for Error {
    fn from(_err: std::env::VarError) -> Self {
        Error::Config {
            message: "Environment variable error".into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unique_violations_conflict() {
        let unique = classify_violation(ErrorKind::UniqueViolation).unwrap();
        assert!(matches!(unique, Error::Conflict { .. }));
        assert_eq!(unique.status_code(), StatusCode::CONFLICT);

        let foreign = classify_violation(ErrorKind::ForeignKeyViolation).unwrap();
        assert!(matches!(foreign, Error::ValidationFailed { .. }));
        let check = classify_violation(ErrorKind::CheckViolation).unwrap();
        assert!(matches!(check, Error::ValidationFailed { .. }));

        assert!(classify_violation(ErrorKind::Other).is_none());
        assert!(!unique.to_string().contains("follows_pair_key"));
    }

    #[test]
    fn test_error_retryable() {
        assert!(Error::PoolExhausted.is_retryable());
        assert!(Error::QueryTimeout { timeout_ms: 5000 }.is_retryable());
        assert!(!Error::destination_not_found("abc").is_retryable());
        assert!(!Error::forbidden("nope").is_retryable());
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            Error::destination_not_found("abc").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::unauthenticated("missing caller").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::forbidden("other user").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::validation("empty body").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Internal { source: None }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::not_found("user", "u1").error_code(), "NOT_FOUND");
        assert_eq!(Error::destination_not_found("x").error_code(), "NOT_FOUND");
        assert_eq!(Error::unauthenticated("x").error_code(), "UNAUTHENTICATED");
        assert_eq!(Error::validation("x").error_code(), "VALIDATION_FAILED");
        assert_eq!(Error::conflict("x").error_code(), "CONFLICT");
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let response = Error::database("relation \"posts\" does not exist").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
