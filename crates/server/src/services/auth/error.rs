//! Authentication error types.

use thiserror::Error;

/// Errors raised by token handling and password hashing.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token could not be parsed or its signature does not verify.
    #[error("malformed token")]
    MalformedToken,

    /// Password does not match the stored hash.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
