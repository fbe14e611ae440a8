//! Account domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use device_warranty_core::{Email, Phone, UserId, UserRole};

/// A registered account as exposed outside the store.
///
/// The password hash is deliberately absent; see [`UserRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub phone: Phone,
    pub address: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user together with its stored password hash.
///
/// Only the stores and the account service see this type.
#[derive(Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("user", &self.user)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Values needed to insert an account.
#[derive(Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: Email,
    pub phone: Phone,
    pub address: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// The mutable profile fields of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub full_name: String,
    pub email: Email,
    pub phone: Phone,
    pub address: String,
}

/// `POST /api/v1/users/registration` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub password: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub purchase_date: NaiveDate,
    pub device_serial_number: String,
}

/// `POST /api/v1/users/login` body.
///
/// `username` is either the account email or its phone number.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login (and registration) response.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// `PUT /api/v1/users/update` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub id: UserId,
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

/// `PUT /api/v1/users/changePassword` body.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl std::fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChangePasswordRequest { .. }")
    }
}
