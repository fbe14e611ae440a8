//! Value types for the device warranty domain.

pub mod email;
pub mod id;
pub mod phone;
pub mod role;
pub mod serial;

pub use email::{Email, EmailError};
pub use id::*;
pub use phone::{Phone, PhoneError};
pub use role::UserRole;
pub use serial::{SerialNumber, SerialNumberError};
