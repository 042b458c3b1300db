// ABOUTME: Unified error handling with a closed error-code set and HTTP mapping
// ABOUTME: Defines AppError, ErrorCode, FieldError, and the JSON error body
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Unified Error Handling
//!
//! Every failure that can reach the HTTP boundary is an [`AppError`] carrying
//! one [`ErrorCode`]. The HTTP layer matches the code exhaustively, so adding
//! a variant forces every mapping to be revisited.
//!
//! Server-side failures (5xx) never leak their message: the response body
//! carries [`GENERIC_SERVER_ERROR`] and the real cause is logged.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned to clients for every 5xx response
pub const GENERIC_SERVER_ERROR: &str =
    "the server encountered a problem and could not process your request";

/// Message returned for every authentication failure
pub const UNAUTHORIZED: &str = "unauthorized";

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication & Authorization
    /// No credentials were presented
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired,
    /// Credentials were presented but did not resolve to a principal
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid,
    /// Principal resolved but lacks the role or ownership required
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied,

    // Rate Limiting
    /// Request or login budget exhausted for the current window
    #[serde(rename = "RATE_LIMIT_EXCEEDED")]
    RateLimitExceeded,

    // Validation
    /// Request could not be parsed or is structurally wrong
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
    /// Request parsed but one or more fields failed validation
    #[serde(rename = "VALIDATION_FAILED")]
    ValidationFailed,

    // Resource Management
    /// Resource does not exist
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound,
    /// A unique key is already taken
    #[serde(rename = "RESOURCE_ALREADY_EXISTS")]
    ResourceAlreadyExists,
    /// Caller's observed version is stale
    #[serde(rename = "EDIT_CONFLICT")]
    EditConflict,

    // Internal Errors
    /// Unclassified server failure, including deadline expiry
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    /// Relational store failure
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    /// Key-value store failure
    #[serde(rename = "STORAGE_ERROR")]
    StorageError,
    /// Invalid or missing configuration
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::AuthRequired | Self::AuthInvalid => 401,
            Self::PermissionDenied => 403,
            Self::ResourceNotFound => 404,
            Self::ResourceAlreadyExists | Self::EditConflict => 409,
            Self::ValidationFailed => 422,
            Self::RateLimitExceeded => 429,
            Self::InternalError | Self::DatabaseError | Self::StorageError | Self::ConfigError => {
                500
            }
        }
    }

    /// Get a client-facing description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthRequired | Self::AuthInvalid => UNAUTHORIZED,
            Self::PermissionDenied => "you do not have permission to access this resource",
            Self::RateLimitExceeded => "rate limit exceeded",
            Self::InvalidInput => "the request could not be understood",
            Self::ValidationFailed => "the request contains invalid fields",
            Self::ResourceNotFound => "the requested resource could not be found",
            Self::ResourceAlreadyExists => "a resource with this identifier already exists",
            Self::EditConflict => {
                "unable to update the record due to an edit conflict, please fetch it and try again"
            }
            Self::InternalError | Self::DatabaseError | Self::StorageError | Self::ConfigError => {
                GENERIC_SERVER_ERROR
            }
        }
    }

    /// Whether this code is a server-side failure whose message must not leak
    #[must_use]
    pub const fn is_server_error(self) -> bool {
        self.http_status() >= 500
    }
}

/// One failed validation check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears in the request body
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    /// Create a field error
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message (logged; only sent to clients for 4xx)
    pub message: String,
    /// Ordered field errors for validation failures
    pub details: Vec<FieldError>,
    /// Seconds until a rate-limited caller may retry, when known
    pub retry_after: Option<u64>,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
            retry_after: None,
            source: None,
        }
    }

    /// Attach ordered field errors
    #[must_use]
    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.details = details;
        self
    }

    /// Attach retry guidance
    #[must_use]
    pub const fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Message safe to show the client
    #[must_use]
    pub fn client_message(&self) -> String {
        match self.code {
            ErrorCode::AuthRequired | ErrorCode::AuthInvalid => UNAUTHORIZED.to_owned(),
            code if code.is_server_error() => GENERIC_SERVER_ERROR.to_owned(),
            _ => self.message.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Convenience functions for creating common errors
impl AppError {
    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "authentication required")
    }

    /// Invalid authentication; the message is only logged
    #[must_use]
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Role or ownership check failed
    #[must_use]
    pub fn permission_denied() -> Self {
        Self::new(
            ErrorCode::PermissionDenied,
            ErrorCode::PermissionDenied.description(),
        )
    }

    /// Rate limit exceeded
    #[must_use]
    pub fn rate_limit_exceeded(retry_after: Option<u64>) -> Self {
        let error = Self::new(
            ErrorCode::RateLimitExceeded,
            ErrorCode::RateLimitExceeded.description(),
        );
        match retry_after {
            Some(seconds) => error.with_retry_after(seconds),
            None => error,
        }
    }

    /// Resource not found
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} could not be found", resource.into()),
        )
    }

    /// Unique key already taken
    #[must_use]
    pub fn already_exists(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceAlreadyExists,
            format!("{} already exists", resource.into()),
        )
    }

    /// Stale version submitted
    #[must_use]
    pub fn edit_conflict() -> Self {
        Self::new(ErrorCode::EditConflict, ErrorCode::EditConflict.description())
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Ordered validation failures
    #[must_use]
    pub fn validation(details: Vec<FieldError>) -> Self {
        Self::new(
            ErrorCode::ValidationFailed,
            ErrorCode::ValidationFailed.description(),
        )
        .with_details(details)
    }

    /// Internal server error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Key-value store error
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Client-facing message
    pub error: String,
    /// HTTP status code, repeated in the body
    pub status: u16,
    /// Ordered field errors, present only for validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            error: error.client_message(),
            status: error.http_status(),
            details: error.details.clone(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(format!("serialization failed: {error}")).with_source(error)
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => Self::not_found("record"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let message = db.message().to_owned();
                Self::new(ErrorCode::ResourceAlreadyExists, message).with_source(error)
            }
            _ => Self::database(format!("database operation failed: {error}")).with_source(error),
        }
    }
}

#[cfg(feature = "http-response")]
mod http_response {
    use super::{AppError, ErrorResponse};
    use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use http::{header, HeaderValue, StatusCode};

    impl From<JsonRejection> for AppError {
        fn from(rejection: JsonRejection) -> Self {
            Self::invalid_input(rejection.body_text())
        }
    }

    impl From<PathRejection> for AppError {
        fn from(rejection: PathRejection) -> Self {
            Self::invalid_input(rejection.body_text())
        }
    }

    impl From<QueryRejection> for AppError {
        fn from(rejection: QueryRejection) -> Self {
            Self::invalid_input(rejection.body_text())
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            if self.code.is_server_error() {
                tracing::error!(
                    error.code = ?self.code,
                    error.message = %self.message,
                    error.source = ?self.source,
                    "Request failed with server error"
                );
            } else {
                tracing::debug!(
                    error.code = ?self.code,
                    error.message = %self.message,
                    "Request rejected"
                );
            }

            let status = StatusCode::from_u16(self.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = ErrorResponse::from(&self);
            let mut response = (status, Json(body)).into_response();

            if let Some(seconds) = self.retry_after {
                if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }

            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::AuthRequired.http_status(), 401);
        assert_eq!(ErrorCode::AuthInvalid.http_status(), 401);
        assert_eq!(ErrorCode::PermissionDenied.http_status(), 403);
        assert_eq!(ErrorCode::RateLimitExceeded.http_status(), 429);
        assert_eq!(ErrorCode::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::EditConflict.http_status(), 409);
        assert_eq!(ErrorCode::ResourceAlreadyExists.http_status(), 409);
        assert_eq!(ErrorCode::ValidationFailed.http_status(), 422);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn test_conflict_messages_are_distinct() {
        let conflict = AppError::edit_conflict();
        let duplicate = AppError::already_exists("exercise");
        assert_eq!(conflict.http_status(), duplicate.http_status());
        assert_ne!(conflict.client_message(), duplicate.client_message());
    }

    #[test]
    fn test_server_errors_are_generic() {
        let error = AppError::database("UNIQUE constraint failed: users.secret_column");
        let response = ErrorResponse::from(&error);
        assert_eq!(response.error, GENERIC_SERVER_ERROR);
        assert_eq!(response.status, 500);
    }

    #[test]
    fn test_auth_failures_share_one_message() {
        let expired = AppError::auth_invalid("token expired");
        let missing_session = AppError::auth_invalid("session not found");
        assert_eq!(
            ErrorResponse::from(&expired).error,
            ErrorResponse::from(&missing_session).error
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let error = AppError::validation(vec![
            FieldError::new("name", "must not be empty"),
            FieldError::new("sets", "must be a positive number"),
        ]);
        let json = serde_json::to_value(ErrorResponse::from(&error)).unwrap();

        assert_eq!(json["status"], 422);
        assert_eq!(json["details"][0]["field"], "name");
        assert_eq!(json["details"][1]["field"], "sets");

        let plain = serde_json::to_value(ErrorResponse::from(&AppError::permission_denied()))
            .unwrap();
        assert!(plain.get("details").is_none());
        assert_eq!(plain["status"], 403);
    }
}
