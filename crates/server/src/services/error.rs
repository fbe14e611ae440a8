//! Service-layer error taxonomy.
//!
//! Every variant except `Repository` and `Internal` is a recoverable,
//! caller-facing outcome; the HTTP layer turns each kind into a status and
//! a numeric error code.

use thiserror::Error;

use super::auth::AuthError;
use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A uniqueness rule would be violated.
    #[error("{0}")]
    AlreadyExists(String),

    /// Request shape is invalid or the state transition is not allowed.
    #[error("{0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Username or password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token could not be parsed or verified.
    #[error("malformed token")]
    MalformedToken,

    /// Store failure.
    #[error("repository error: {0}")]
    Repository(RepositoryError),

    /// Unexpected internal fault (hashing, signing, failed compensation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::AlreadyExists(message),
            RepositoryError::NotFound => Self::NotFound("record not found".to_owned()),
            other => Self::Repository(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MalformedToken => Self::MalformedToken,
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::Signing(e) => Self::Internal(format!("token signing failed: {e}")),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_owned()),
        }
    }
}
