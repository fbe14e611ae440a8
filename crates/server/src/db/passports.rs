//! `PostgreSQL` passport store.

use async_trait::async_trait;
use sqlx::PgPool;

use device_warranty_core::{PassportId, SerialNumber};

use super::{PassportStore, RepositoryError};
use crate::models::{Passport, PassportDraft};

const PASSPORT_COLUMNS: &str =
    "id, name, model, serial_prefix, from_serial_number, to_serial_number, warranty_months";

#[derive(sqlx::FromRow)]
struct PassportRow {
    id: i64,
    name: String,
    model: String,
    serial_prefix: String,
    from_serial_number: i64,
    to_serial_number: i64,
    warranty_months: i32,
}

impl From<PassportRow> for Passport {
    fn from(row: PassportRow) -> Self {
        Self {
            id: PassportId::new(row.id),
            name: row.name,
            model: row.model,
            serial_prefix: row.serial_prefix,
            from_serial_number: row.from_serial_number,
            to_serial_number: row.to_serial_number,
            warranty_months: row.warranty_months,
        }
    }
}

/// Passport store backed by the `passports` table.
#[derive(Clone)]
pub struct PgPassportStore {
    pool: PgPool,
}

impl PgPassportStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PassportStore for PgPassportStore {
    async fn create(&self, draft: &PassportDraft) -> Result<Passport, RepositoryError> {
        let row = sqlx::query_as::<_, PassportRow>(&format!(
            "INSERT INTO passports \
             (name, model, serial_prefix, from_serial_number, to_serial_number, warranty_months) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PASSPORT_COLUMNS}"
        ))
        .bind(&draft.name)
        .bind(&draft.model)
        .bind(&draft.serial_prefix)
        .bind(draft.from_serial_number)
        .bind(draft.to_serial_number)
        .bind(draft.warranty_months)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get(&self, id: PassportId) -> Result<Option<Passport>, RepositoryError> {
        let row = sqlx::query_as::<_, PassportRow>(&format!(
            "SELECT {PASSPORT_COLUMNS} FROM passports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Passport::from))
    }

    async fn list(&self) -> Result<Vec<Passport>, RepositoryError> {
        let rows = sqlx::query_as::<_, PassportRow>(&format!(
            "SELECT {PASSPORT_COLUMNS} FROM passports ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Passport::from).collect())
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<Passport>, RepositoryError> {
        let rows = sqlx::query_as::<_, PassportRow>(&format!(
            "SELECT {PASSPORT_COLUMNS} FROM passports WHERE serial_prefix = $1 ORDER BY id"
        ))
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Passport::from).collect())
    }

    async fn update(
        &self,
        id: PassportId,
        draft: &PassportDraft,
    ) -> Result<Passport, RepositoryError> {
        let row = sqlx::query_as::<_, PassportRow>(&format!(
            "UPDATE passports \
             SET name = $2, model = $3, serial_prefix = $4, \
                 from_serial_number = $5, to_serial_number = $6, warranty_months = $7 \
             WHERE id = $1 \
             RETURNING {PASSPORT_COLUMNS}"
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.model)
        .bind(&draft.serial_prefix)
        .bind(draft.from_serial_number)
        .bind(draft.to_serial_number)
        .bind(draft.warranty_months)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete(&self, id: PassportId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM passports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict("passport has registered devices".to_owned());
                }
                RepositoryError::Database(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_for_serial(
        &self,
        serial: &SerialNumber,
    ) -> Result<Option<Passport>, RepositoryError> {
        let row = sqlx::query_as::<_, PassportRow>(&format!(
            "SELECT {PASSPORT_COLUMNS} FROM passports \
             WHERE serial_prefix = $1 AND $2 BETWEEN from_serial_number AND to_serial_number \
             ORDER BY id \
             LIMIT 1"
        ))
        .bind(serial.prefix())
        .bind(serial.number())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Passport::from))
    }
}
