//! `PostgreSQL` account store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use device_warranty_core::{Email, Phone, UserId, UserRole};

use super::{RepositoryError, UserStore, conflict_or_database, login_keys};
use crate::models::{NewUser, User, UserProfile, UserRecord};

const USER_COLUMNS: &str =
    "id, full_name, email, phone, address, password_hash, role, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    full_name: String,
    email: String,
    phone: String,
    address: String,
    password_hash: String,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = Phone::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;

        Ok(Self {
            user: User {
                id: UserId::new(row.id),
                full_name: row.full_name,
                email,
                phone,
                address: row.address,
                role: row.role,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            password_hash: row.password_hash,
        })
    }
}

fn into_record(row: Option<UserRow>) -> Result<Option<UserRecord>, RepositoryError> {
    row.map(UserRecord::try_from).transpose()
}

/// Account store backed by the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        into_record(row)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        into_record(row)
    }

    async fn find_by_phone(&self, phone: &Phone) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone.as_str())
        .fetch_optional(&self.pool)
        .await?;

        into_record(row)
    }

    async fn find_by_email_or_phone(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let (email, phone) = login_keys(username);
        if email.is_none() && phone.is_none() {
            return Ok(None);
        }

        // Email wins when a value could be both.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email = $1 OR phone = $2 \
             ORDER BY (email = $1) DESC NULLS LAST \
             LIMIT 1"
        ))
        .bind(email.as_ref().map(Email::as_str))
        .bind(phone.as_ref().map(Phone::as_str))
        .fetch_optional(&self.pool)
        .await?;

        into_record(row)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY id"
        ))
        .bind(UserRole::User)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| UserRecord::try_from(row).map(|record| record.user))
            .collect()
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (full_name, email, phone, address, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.full_name)
        .bind(user.email.as_str())
        .bind(user.phone.as_str())
        .bind(&user.address)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or_database)?;

        UserRecord::try_from(row).map(|record| record.user)
    }

    async fn save_profile(
        &self,
        id: UserId,
        profile: &UserProfile,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users \
             SET full_name = $2, email = $3, phone = $4, address = $5, updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&profile.full_name)
        .bind(profile.email.as_str())
        .bind(profile.phone.as_str())
        .bind(&profile.address)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_or_database)?
        .ok_or(RepositoryError::NotFound)?;

        UserRecord::try_from(row).map(|record| record.user)
    }

    async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn remove(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
