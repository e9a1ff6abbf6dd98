//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
///
/// The credential-shaped variants (`UserNotFound`, `InvalidCredentials`,
/// `AccountInactive`) and the token-shaped variants (`InvalidToken`,
/// `SessionNotFound`) each collapse into a single generic response body so
/// callers cannot enumerate accounts or probe session state. Only the
/// security-event log carries the precise cause.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No user record for the presented email
    #[error("User not found")]
    UserNotFound,

    /// Wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account is locked after repeated failures
    #[error("Account is temporarily locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    /// Account is deactivated
    #[error("Account is inactive")]
    AccountInactive,

    /// Token failed signature, structure, or expiry checks
    #[error("Invalid token")]
    InvalidToken,

    /// Token is structurally valid but its session no longer exists,
    /// or the stored refresh token does not match the presented one
    #[error("Session not found")]
    SessionNotFound,

    /// Required permission is missing
    #[error("Permission denied: {permission}")]
    PermissionDenied { permission: String },

    /// Session store unreachable or timed out; always fail closed
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    /// Password policy violation (reset path)
    #[error("Password validation failed: {0}")]
    PasswordValidation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or malformed startup configuration; fatal at boot
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UserNotFound
            | AuthError::InvalidCredentials
            | AuthError::AccountInactive
            | AuthError::InvalidToken
            | AuthError::SessionNotFound => StatusCode::UNAUTHORIZED,
            AuthError::AccountLocked { .. } => StatusCode::LOCKED,
            AuthError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::PasswordValidation(_) => StatusCode::BAD_REQUEST,
            AuthError::Database(_) | AuthError::Configuration(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::UserNotFound
            | AuthError::InvalidCredentials
            | AuthError::AccountInactive
            | AuthError::InvalidToken
            | AuthError::SessionNotFound => ErrorKind::Unauthorized,
            AuthError::AccountLocked { .. } => ErrorKind::Locked,
            AuthError::PermissionDenied { .. } => ErrorKind::Forbidden,
            AuthError::StoreUnavailable(_) => ErrorKind::ServiceUnavailable,
            AuthError::PasswordValidation(_) => ErrorKind::BadRequest,
            AuthError::Database(_) | AuthError::Configuration(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError with enumeration-safe messages
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::UserNotFound
            | AuthError::InvalidCredentials
            | AuthError::AccountInactive => {
                AppError::unauthorized("Invalid email or password")
            }
            AuthError::InvalidToken | AuthError::SessionNotFound => {
                AppError::unauthorized("Authentication required")
            }
            // Lock-out is intentionally disclosed together with its expiry;
            // it is not sensitive and helps legitimate users.
            AuthError::AccountLocked { until } => {
                AppError::locked("Account is temporarily locked")
                    .with_action(format!("Retry after {}", until.to_rfc3339()))
            }
            AuthError::PermissionDenied { .. } => AppError::forbidden("Insufficient permissions"),
            AuthError::StoreUnavailable(_) => {
                AppError::service_unavailable("Service temporarily unavailable")
            }
            AuthError::PasswordValidation(msg) => AppError::bad_request(msg.clone()),
            AuthError::Database(_) | AuthError::Configuration(_) | AuthError::Internal(_) => {
                AppError::internal("Internal server error")
            }
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::Configuration(msg) => {
                tracing::error!(message = %msg, "Auth configuration error");
            }
            AuthError::StoreUnavailable(msg) => {
                tracing::error!(message = %msg, "Session store unavailable, failing closed");
            }
            AuthError::InvalidCredentials | AuthError::UserNotFound => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountLocked { until } => {
                tracing::warn!(locked_until = %until, "Login attempt on locked account");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<platform::password::PasswordPolicyError> for AuthError {
    fn from(err: platform::password::PasswordPolicyError) -> Self {
        AuthError::PasswordValidation(err.to_string())
    }
}
