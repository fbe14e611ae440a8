//! Persistence for accounts, devices and passports.
//!
//! The services only see the [`UserStore`], [`DeviceStore`] and
//! [`PassportStore`] traits. Two implementations exist:
//!
//! - [`users`], [`devices`], [`passports`] - `PostgreSQL` via sqlx
//! - [`memory`] - process-local maps for tests and `DW_STORAGE=memory`
//!
//! Uniqueness of account email/phone and device serial is enforced by the
//! store itself (unique constraints, or a single lock in memory) and surfaces
//! as [`RepositoryError::Conflict`]. Service-level pre-checks are advisory.
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p dw-cli -- migrate
//! ```

pub mod devices;
pub mod memory;
pub mod passports;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use device_warranty_core::{Email, PassportId, Phone, SerialNumber, UserId};

use crate::models::{Device, NewDevice, NewUser, Passport, PassportDraft, User, UserProfile, UserRecord};

pub use devices::PgDeviceStore;
pub use memory::MemoryStore;
pub use passports::PgPassportStore;
pub use users::PgUserStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored value failed validation when read back.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError>;

    async fn find_by_phone(&self, phone: &Phone) -> Result<Option<UserRecord>, RepositoryError>;

    /// Resolve a login name that may be either an email or a phone number.
    async fn find_by_email_or_phone(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError>;

    /// All `USER` accounts, ordered by id. Administrators are never listed.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Insert an account.
    ///
    /// Fails with [`RepositoryError::Conflict`] when the email or phone is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Overwrite the profile fields of an account.
    async fn save_profile(&self, id: UserId, profile: &UserProfile)
    -> Result<User, RepositoryError>;

    async fn set_password_hash(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    /// Delete an account. Returns `false` if it did not exist.
    async fn remove(&self, id: UserId) -> Result<bool, RepositoryError>;
}

/// Device persistence.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn exists(&self, serial: &SerialNumber) -> Result<bool, RepositoryError>;

    /// Insert a device. Fails with [`RepositoryError::Conflict`] on a taken serial.
    async fn create(&self, device: NewDevice) -> Result<Device, RepositoryError>;

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Device>, RepositoryError>;

    async fn count_by_passport(&self, passport_id: PassportId) -> Result<i64, RepositoryError>;
}

/// Passport persistence.
#[async_trait]
pub trait PassportStore: Send + Sync {
    async fn create(&self, draft: &PassportDraft) -> Result<Passport, RepositoryError>;

    async fn get(&self, id: PassportId) -> Result<Option<Passport>, RepositoryError>;

    async fn list(&self) -> Result<Vec<Passport>, RepositoryError>;

    /// Passports sharing a serial prefix, ordered by id.
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<Passport>, RepositoryError>;

    async fn update(&self, id: PassportId, draft: &PassportDraft)
    -> Result<Passport, RepositoryError>;

    async fn delete(&self, id: PassportId) -> Result<bool, RepositoryError>;

    /// The passport whose prefix and range contain `serial`, lowest id first.
    async fn find_for_serial(
        &self,
        serial: &SerialNumber,
    ) -> Result<Option<Passport>, RepositoryError>;
}

/// The three stores the services run against.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub devices: Arc<dyn DeviceStore>,
    pub passports: Arc<dyn PassportStore>,
}

impl Stores {
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            devices: Arc::new(PgDeviceStore::new(pool.clone())),
            passports: Arc::new(PgPassportStore::new(pool.clone())),
        }
    }

    #[must_use]
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            users: store.clone(),
            devices: store.clone(),
            passports: store,
        }
    }
}

/// Split a login name into the email and phone forms it could match.
///
/// Either side is `None` when the input cannot be that kind of identifier.
pub(crate) fn login_keys(username: &str) -> (Option<Email>, Option<Phone>) {
    (Email::parse(username).ok(), Phone::parse(username).ok())
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_or_database(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let what = match db_err.constraint() {
            Some("users_email_key") => "email already exists",
            Some("users_phone_key") => "phone already exists",
            Some("devices_pkey") => "device serial number already registered",
            _ => "duplicate value",
        };
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
