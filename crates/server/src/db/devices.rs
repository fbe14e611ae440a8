//! `PostgreSQL` device store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use device_warranty_core::{PassportId, SerialNumber, UserId};

use super::{DeviceStore, RepositoryError, conflict_or_database};
use crate::models::{Device, NewDevice};

const DEVICE_COLUMNS: &str =
    "serial_number, passport_id, user_id, purchase_date, warranty_expiration_date, created_at";

#[derive(sqlx::FromRow)]
struct DeviceRow {
    serial_number: String,
    passport_id: i64,
    user_id: i64,
    purchase_date: NaiveDate,
    warranty_expiration_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = RepositoryError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let serial_number = SerialNumber::parse(&row.serial_number).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid serial number in database: {e}"))
        })?;

        Ok(Self {
            serial_number,
            passport_id: PassportId::new(row.passport_id),
            user_id: UserId::new(row.user_id),
            purchase_date: row.purchase_date,
            warranty_expiration_date: row.warranty_expiration_date,
            created_at: row.created_at,
        })
    }
}

/// Device store backed by the `devices` table.
#[derive(Clone)]
pub struct PgDeviceStore {
    pool: PgPool,
}

impl PgDeviceStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for PgDeviceStore {
    async fn exists(&self, serial: &SerialNumber) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM devices WHERE serial_number = $1)")
                .bind(serial.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn create(&self, device: NewDevice) -> Result<Device, RepositoryError> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "INSERT INTO devices \
             (serial_number, passport_id, user_id, purchase_date, warranty_expiration_date) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {DEVICE_COLUMNS}"
        ))
        .bind(device.serial_number.as_str())
        .bind(device.passport_id)
        .bind(device.user_id)
        .bind(device.purchase_date)
        .bind(device.warranty_expiration_date)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or_database)?;

        Device::try_from(row)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Device>, RepositoryError> {
        let rows = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE user_id = $1 ORDER BY created_at, serial_number"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Device::try_from).collect()
    }

    async fn count_by_passport(&self, passport_id: PassportId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM devices WHERE passport_id = $1")
            .bind(passport_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
