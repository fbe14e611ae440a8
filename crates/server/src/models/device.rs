//! Registered devices.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use device_warranty_core::{PassportId, SerialNumber, UserId};

/// A physical unit bought by an account and covered by a passport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub serial_number: SerialNumber,
    pub passport_id: PassportId,
    pub user_id: UserId,
    pub purchase_date: NaiveDate,
    pub warranty_expiration_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// Whether the warranty still covers the device on `day`.
    #[must_use]
    pub fn under_warranty_on(&self, day: NaiveDate) -> bool {
        day <= self.warranty_expiration_date
    }
}

#[derive(Debug, Clone)]
pub struct NewDevice {
    pub serial_number: SerialNumber,
    pub passport_id: PassportId,
    pub user_id: UserId,
    pub purchase_date: NaiveDate,
    pub warranty_expiration_date: NaiveDate,
}
