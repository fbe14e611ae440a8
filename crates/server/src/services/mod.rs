//! Business logic services.
//!
//! # Services
//!
//! - [`auth`] - token authority and password hashing
//! - [`accounts`] - registration, login, profile and password changes
//! - [`devices`] - device registration against warranty passports
//! - [`passports`] - passport management
//!
//! Services borrow the stores from [`AppState`](crate::state::AppState) and
//! are built per request.

pub mod accounts;
pub mod auth;
pub mod devices;
mod error;
pub mod passports;

pub use accounts::AccountService;
pub use devices::DeviceService;
pub use error::ServiceError;
pub use passports::PassportService;

/// Trim `value` and reject it if nothing remains.
pub(crate) fn required(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}
