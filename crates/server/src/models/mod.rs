//! Domain models and request payloads.
//!
//! Domain types are validated objects separate from the database row types in
//! [`crate::db`]. Request payloads mirror the JSON bodies accepted by the API
//! and are validated by the services before anything touches a store.

pub mod device;
pub mod passport;
pub mod user;

pub use device::{Device, NewDevice};
pub use passport::{Passport, PassportDraft};
pub use user::{
    ChangePasswordRequest, LoginRequest, LoginResponse, NewUser, RegisterRequest,
    UpdateUserRequest, User, UserProfile, UserRecord,
};
