//! Credential and token authority.
//!
//! Token issuance/verification lives in [`token`], password hashing in
//! [`password`]. Neither logs; callers decide what a failure means.

mod error;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use password::{MIN_PASSWORD_LENGTH, hash_password, validate_password, verify_password};
pub use token::{Claims, TokenAuthority};
