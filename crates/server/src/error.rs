//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. The response body is always
//! `{"errorCode": <int>, "message": <string>}`; server-side faults are
//! captured to Sentry before responding.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::ServiceError;
use crate::services::auth::AuthError;

/// Numeric error codes carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Failed = 0,
    AlreadyExists = 1,
    NotFound = 2,
    InvalidCredentials = 3,
    MalformedToken = 4,
    Validation = 5,
    Unauthorized = 6,
    Forbidden = 7,
}

impl ErrorCode {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::AlreadyExists | Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidCredentials | Self::MalformedToken | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error_code: u8,
    message: String,
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Service operation failed.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// Token or password handling failed outside a service call.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request could not be parsed.
    #[error("Bad request: {0}")]
    BadRequest(String),

}

impl AppError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::AlreadyExists(_) => ErrorCode::AlreadyExists,
                ServiceError::Validation(_) => ErrorCode::Validation,
                ServiceError::NotFound(_) => ErrorCode::NotFound,
                ServiceError::InvalidCredentials => ErrorCode::InvalidCredentials,
                ServiceError::MalformedToken => ErrorCode::MalformedToken,
                ServiceError::Repository(_) | ServiceError::Internal(_) => ErrorCode::Failed,
            },
            Self::Auth(err) => match err {
                AuthError::MalformedToken => ErrorCode::MalformedToken,
                AuthError::InvalidCredentials => ErrorCode::InvalidCredentials,
                AuthError::Signing(_) | AuthError::PasswordHash => ErrorCode::Failed,
            },
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::BadRequest(_) => ErrorCode::Validation,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();

        // Don't expose internal error details to clients
        let message = if code == ErrorCode::Failed {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
            "Internal server error".to_owned()
        } else {
            tracing::debug!(error = %self, error_code = code as u8, "Request rejected");
            self.to_string()
        };

        let body = ErrorBody {
            error_code: code as u8,
            message,
        };
        (code.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
