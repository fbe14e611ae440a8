//! Passport management. Callers are expected to have checked for `ADMIN`.

use device_warranty_core::{PassportId, SerialNumber};

use super::{ServiceError, required};
use crate::db::{DeviceStore, PassportStore, RepositoryError};
use crate::models::{Passport, PassportDraft};

pub struct PassportService<'a> {
    passports: &'a dyn PassportStore,
    devices: &'a dyn DeviceStore,
}

impl<'a> PassportService<'a> {
    #[must_use]
    pub const fn new(passports: &'a dyn PassportStore, devices: &'a dyn DeviceStore) -> Self {
        Self { passports, devices }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for an invalid draft or a range
    /// that overlaps another passport with the same prefix.
    pub async fn create(&self, draft: PassportDraft) -> Result<Passport, ServiceError> {
        let draft = normalize(draft)?;
        self.ensure_no_overlap(&draft, None).await?;
        Ok(self.passports.create(&draft).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the passport does not exist.
    pub async fn get(&self, id: PassportId) -> Result<Passport, ServiceError> {
        self.passports
            .get(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<Passport>, ServiceError> {
        Ok(self.passports.list().await?)
    }

    /// Replace a passport's fields.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if the passport does not exist
    /// - `ServiceError::Validation` for an invalid or overlapping draft, or
    ///   when registered devices would fall outside the new prefix/range
    pub async fn update(
        &self,
        id: PassportId,
        draft: PassportDraft,
    ) -> Result<Passport, ServiceError> {
        let current = self.get(id).await?;
        let draft = normalize(draft)?;
        self.ensure_no_overlap(&draft, Some(id)).await?;

        let narrows = current.serial_prefix != draft.serial_prefix
            || draft.from_serial_number > current.from_serial_number
            || draft.to_serial_number < current.to_serial_number;
        if narrows && self.devices.count_by_passport(id).await? > 0 {
            return Err(ServiceError::Validation(
                "cannot narrow a passport that has registered devices".to_owned(),
            ));
        }

        self.passports.update(id, &draft).await.map_err(|e| match e {
            RepositoryError::NotFound => not_found(id),
            other => other.into(),
        })
    }

    /// # Errors
    ///
    /// - `ServiceError::NotFound` if the passport does not exist
    /// - `ServiceError::Validation` while devices are registered under it
    pub async fn delete(&self, id: PassportId) -> Result<(), ServiceError> {
        if self.devices.count_by_passport(id).await? > 0 {
            return Err(has_devices(id));
        }

        match self.passports.delete(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(not_found(id)),
            Err(RepositoryError::Conflict(_)) => Err(has_devices(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// The passport that would own `serial`, if any.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn find_for_serial(
        &self,
        serial: &SerialNumber,
    ) -> Result<Option<Passport>, ServiceError> {
        Ok(self.passports.find_for_serial(serial).await?)
    }

    async fn ensure_no_overlap(
        &self,
        draft: &PassportDraft,
        except: Option<PassportId>,
    ) -> Result<(), ServiceError> {
        let siblings = self.passports.list_by_prefix(&draft.serial_prefix).await?;
        if let Some(clash) = siblings
            .iter()
            .find(|p| Some(p.id) != except && p.overlaps(draft))
        {
            return Err(ServiceError::Validation(format!(
                "serial range overlaps passport {}",
                clash.id
            )));
        }
        Ok(())
    }
}

fn not_found(id: PassportId) -> ServiceError {
    ServiceError::NotFound(format!("passport {id} not found"))
}

fn has_devices(id: PassportId) -> ServiceError {
    ServiceError::Validation(format!("passport {id} has registered devices"))
}

fn normalize(draft: PassportDraft) -> Result<PassportDraft, ServiceError> {
    let name = required("name", &draft.name)?;
    let model = required("model", &draft.model)?;
    let serial_prefix = required("serialPrefix", &draft.serial_prefix)?.to_ascii_uppercase();

    if !serial_prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ServiceError::Validation(
            "serialPrefix may only contain letters".to_owned(),
        ));
    }
    if draft.from_serial_number < 0 {
        return Err(ServiceError::Validation(
            "fromSerialNumber must not be negative".to_owned(),
        ));
    }
    if draft.to_serial_number < draft.from_serial_number {
        return Err(ServiceError::Validation(
            "toSerialNumber must not be below fromSerialNumber".to_owned(),
        ));
    }
    if draft.warranty_months < 0 {
        return Err(ServiceError::Validation(
            "warrantyMonths must not be negative".to_owned(),
        ));
    }

    Ok(PassportDraft {
        name,
        model,
        serial_prefix,
        ..draft
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use device_warranty_core::{Email, Phone, UserRole};

    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::NewUser;
    use crate::services::DeviceService;

    fn draft(prefix: &str, from: i64, to: i64) -> PassportDraft {
        PassportDraft {
            name: "TestPassport".to_owned(),
            model: "M1".to_owned(),
            serial_prefix: prefix.to_owned(),
            from_serial_number: from,
            to_serial_number: to,
            warranty_months: 12,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_prefix() {
        let store = MemoryStore::default();
        let service = PassportService::new(&store, &store);

        let passport = service.create(draft(" abc ", 1, 10)).await.unwrap();
        assert_eq!(passport.serial_prefix, "ABC");

        let serial = SerialNumber::parse("ABC5").unwrap();
        assert_eq!(
            service.find_for_serial(&serial).await.unwrap().unwrap().id,
            passport.id
        );
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_drafts() {
        let store = MemoryStore::default();
        let service = PassportService::new(&store, &store);

        for bad in [
            draft("", 1, 10),
            draft("AB1", 1, 10),
            draft("ABC", 10, 1),
            draft("ABC", -1, 10),
        ] {
            assert!(matches!(
                service.create(bad).await,
                Err(ServiceError::Validation(_))
            ));
        }
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_ranges_rejected() {
        let store = MemoryStore::default();
        let service = PassportService::new(&store, &store);

        let first = service.create(draft("ABC", 1, 100)).await.unwrap();
        assert!(matches!(
            service.create(draft("ABC", 100, 200)).await,
            Err(ServiceError::Validation(_))
        ));
        service.create(draft("ABC", 101, 200)).await.unwrap();
        service.create(draft("XYZ", 1, 100)).await.unwrap();

        // Updating a passport may keep its own range.
        let updated = service
            .update(first.id, draft("ABC", 1, 100))
            .await
            .unwrap();
        assert_eq!(updated.id, first.id);
    }

    #[tokio::test]
    async fn test_delete_blocked_while_devices_registered() {
        let store = MemoryStore::default();
        let service = PassportService::new(&store, &store);
        let passport = service.create(draft("ABC", 1, 100)).await.unwrap();
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
        DeviceService::new(&store, &store)
            .register_device(
                &SerialNumber::parse("ABC50").unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                user.id,
            )
            .await
            .unwrap();

        assert!(matches!(
            service.delete(passport.id).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.update(passport.id, draft("ABC", 1, 10)).await,
            Err(ServiceError::Validation(_))
        ));
        service
            .update(passport.id, draft("ABC", 1, 1000))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_passport_not_found() {
        let store = MemoryStore::default();
        let service = PassportService::new(&store, &store);
        let id = PassportId::new(42);

        assert!(matches!(service.get(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            service.delete(id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.update(id, draft("ABC", 1, 10)).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
