//! Device registration.
//!
//! A serial number belongs to the passport whose prefix equals the serial's
//! letter prefix and whose inclusive range contains its unit number. The
//! warranty runs `warranty_months` calendar months from the purchase date.

use chrono::{Months, NaiveDate};

use device_warranty_core::{SerialNumber, UserId};

use super::ServiceError;
use super::passports::PassportService;
use crate::db::{DeviceStore, PassportStore, RepositoryError};
use crate::models::{Device, NewDevice, Passport};

pub struct DeviceService<'a> {
    devices: &'a dyn DeviceStore,
    passports: &'a dyn PassportStore,
}

impl<'a> DeviceService<'a> {
    #[must_use]
    pub const fn new(devices: &'a dyn DeviceStore, passports: &'a dyn PassportStore) -> Self {
        Self { devices, passports }
    }

    /// Fail if a device with `serial` is already registered.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::AlreadyExists` when the serial is taken.
    pub async fn assert_serial_available(&self, serial: &SerialNumber) -> Result<(), ServiceError> {
        if self.devices.exists(serial).await? {
            return Err(ServiceError::AlreadyExists(format!(
                "device {serial} is already registered"
            )));
        }
        Ok(())
    }

    /// Register `serial` to `user_id`, bought on `purchase_date`.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` when no passport covers the serial
    /// - `ServiceError::AlreadyExists` when the serial is already registered
    /// - `ServiceError::Validation` when the warranty end date is out of range
    pub async fn register_device(
        &self,
        serial: &SerialNumber,
        purchase_date: NaiveDate,
        user_id: UserId,
    ) -> Result<Device, ServiceError> {
        let passport = PassportService::new(self.passports, self.devices)
            .find_for_serial(serial)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("no passport covers serial {serial}")))?;

        let warranty_expiration_date = warranty_end(&passport, purchase_date)?;

        self.devices
            .create(NewDevice {
                serial_number: serial.clone(),
                passport_id: passport.id,
                user_id,
                purchase_date,
                warranty_expiration_date,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ServiceError::AlreadyExists(format!(
                    "device {serial} is already registered"
                )),
                other => other.into(),
            })
    }

    /// Devices owned by `user_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn devices_for_user(&self, user_id: UserId) -> Result<Vec<Device>, ServiceError> {
        Ok(self.devices.list_by_user(user_id).await?)
    }
}

fn warranty_end(passport: &Passport, purchase_date: NaiveDate) -> Result<NaiveDate, ServiceError> {
    let months = u32::try_from(passport.warranty_months).map_err(|_| {
        ServiceError::Internal(format!(
            "passport {} has a negative warranty length",
            passport.id
        ))
    })?;

    purchase_date
        .checked_add_months(Months::new(months))
        .ok_or_else(|| ServiceError::Validation("purchase date is out of range".to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use device_warranty_core::{Email, Phone, UserRole};

    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::{NewUser, PassportDraft};

    async fn seeded() -> (MemoryStore, UserId) {
        let store = MemoryStore::default();
        PassportStore::create(
            &store,
            &PassportDraft {
                name: "TestPassport".to_owned(),
                model: "M1".to_owned(),
                serial_prefix: "ABC".to_owned(),
                from_serial_number: 1,
                to_serial_number: 9999,
                warranty_months: 24,
            },
        )
        .await
        .unwrap();
        let user = UserStore::create(
            &store,
            NewUser {
                full_name: "Test User".to_owned(),
                email: Email::parse("a@x.com").unwrap(),
                phone: Phone::parse("111").unwrap(),
                address: "Somewhere 1".to_owned(),
                password_hash: "hash".to_owned(),
                role: UserRole::User,
            },
        )
        .await
        .unwrap();
        (store, user.id)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_register_device_computes_warranty() {
        let (store, user_id) = seeded().await;
        let service = DeviceService::new(&store, &store);
        let serial = SerialNumber::parse("ABC100").unwrap();

        let device = service
            .register_device(&serial, day(2024, 1, 31), user_id)
            .await
            .unwrap();

        assert_eq!(device.warranty_expiration_date, day(2026, 1, 31));
        assert!(device.under_warranty_on(day(2026, 1, 31)));
        assert!(!device.under_warranty_on(day(2026, 2, 1)));
        assert_eq!(service.devices_for_user(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_serial_already_exists() {
        let (store, user_id) = seeded().await;
        let service = DeviceService::new(&store, &store);
        let serial = SerialNumber::parse("ABC100").unwrap();
        let today = Utc::now().date_naive();

        service.assert_serial_available(&serial).await.unwrap();
        service
            .register_device(&serial, today, user_id)
            .await
            .unwrap();

        assert!(matches!(
            service.assert_serial_available(&serial).await,
            Err(ServiceError::AlreadyExists(_))
        ));
        assert!(matches!(
            service.register_device(&serial, today, user_id).await,
            Err(ServiceError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_padded_serial_is_the_same_device() {
        let (store, user_id) = seeded().await;
        let service = DeviceService::new(&store, &store);
        let today = Utc::now().date_naive();

        service
            .register_device(&SerialNumber::parse("ABC100").unwrap(), today, user_id)
            .await
            .unwrap();

        let padded = SerialNumber::parse("ABC0100").unwrap();
        assert!(matches!(
            service.assert_serial_available(&padded).await,
            Err(ServiceError::AlreadyExists(_))
        ));
        assert!(matches!(
            service.register_device(&padded, today, user_id).await,
            Err(ServiceError::AlreadyExists(_))
        ));
        assert_eq!(service.devices_for_user(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_uncovered_serial_not_found() {
        let (store, user_id) = seeded().await;
        let service = DeviceService::new(&store, &store);
        let today = Utc::now().date_naive();

        for raw in ["ABC10000", "XYZ100"] {
            let serial = SerialNumber::parse(raw).unwrap();
            assert!(matches!(
                service.register_device(&serial, today, user_id).await,
                Err(ServiceError::NotFound(_))
            ));
        }
    }
}
