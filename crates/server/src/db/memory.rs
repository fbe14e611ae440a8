//! Process-local store used by tests and `DW_STORAGE=memory`.
//!
//! All three store traits are implemented on one [`MemoryStore`] so that
//! cross-table rules (unique email/phone, unique serial, passports with
//! devices cannot be deleted) are checked under a single lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use device_warranty_core::{Email, PassportId, Phone, SerialNumber, UserId, UserRole};

use super::{DeviceStore, PassportStore, RepositoryError, UserStore, login_keys};
use crate::models::{
    Device, NewDevice, NewUser, Passport, PassportDraft, User, UserProfile, UserRecord,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    devices: HashMap<SerialNumber, Device>,
    passports: BTreeMap<PassportId, Passport>,
    next_user_id: i64,
    next_passport_id: i64,
}

impl Tables {
    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|r| &r.user.email == email && Some(r.user.id) != except)
    }

    fn phone_taken(&self, phone: &Phone, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|r| &r.user.phone == phone && Some(r.user.id) != except)
    }

    fn check_unique(
        &self,
        email: &Email,
        phone: &Phone,
        except: Option<UserId>,
    ) -> Result<(), RepositoryError> {
        if self.email_taken(email, except) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        if self.phone_taken(phone, except) {
            return Err(RepositoryError::Conflict("phone already exists".to_owned()));
        }
        Ok(())
    }
}

/// In-memory implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        // No method leaves the tables half-written, so a poisoned lock is safe to reuse.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|r| &r.user.email == email)
            .cloned())
    }

    async fn find_by_phone(&self, phone: &Phone) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|r| &r.user.phone == phone)
            .cloned())
    }

    async fn find_by_email_or_phone(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let (email, phone) = login_keys(username);
        let tables = self.lock();

        let by_email = email
            .as_ref()
            .and_then(|e| tables.users.values().find(|r| &r.user.email == e));
        let found = by_email.or_else(|| {
            phone
                .as_ref()
                .and_then(|p| tables.users.values().find(|r| &r.user.phone == p))
        });

        Ok(found.cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .filter(|r| r.user.role == UserRole::User)
            .map(|r| r.user.clone())
            .collect())
    }

    async fn create(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.lock();
        tables.check_unique(&new.email, &new.phone, None)?;

        tables.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: UserId::new(tables.next_user_id),
            full_name: new.full_name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );

        Ok(user)
    }

    async fn save_profile(
        &self,
        id: UserId,
        profile: &UserProfile,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.lock();
        if !tables.users.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        tables.check_unique(&profile.email, &profile.phone, Some(id))?;

        let record = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.user.full_name.clone_from(&profile.full_name);
        record.user.email = profile.email.clone();
        record.user.phone = profile.phone.clone();
        record.user.address.clone_from(&profile.address);
        record.user.updated_at = Utc::now();

        Ok(record.user.clone())
    }

    async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let record = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut record.password_hash);
        record.user.updated_at = Utc::now();
        Ok(())
    }

    async fn remove(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let removed = tables.users.remove(&id).is_some();
        if removed {
            tables.devices.retain(|_, d| d.user_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn exists(&self, serial: &SerialNumber) -> Result<bool, RepositoryError> {
        Ok(self.lock().devices.contains_key(serial))
    }

    async fn create(&self, new: NewDevice) -> Result<Device, RepositoryError> {
        let mut tables = self.lock();
        if tables.devices.contains_key(&new.serial_number) {
            return Err(RepositoryError::Conflict(
                "device serial number already registered".to_owned(),
            ));
        }
        if !tables.users.contains_key(&new.user_id) {
            return Err(RepositoryError::NotFound);
        }
        if !tables.passports.contains_key(&new.passport_id) {
            return Err(RepositoryError::NotFound);
        }

        let device = Device {
            serial_number: new.serial_number,
            passport_id: new.passport_id,
            user_id: new.user_id,
            purchase_date: new.purchase_date,
            warranty_expiration_date: new.warranty_expiration_date,
            created_at: Utc::now(),
        };
        tables
            .devices
            .insert(device.serial_number.clone(), device.clone());

        Ok(device)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Device>, RepositoryError> {
        let mut devices: Vec<Device> = self
            .lock()
            .devices
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.serial_number.as_str().cmp(b.serial_number.as_str()))
        });
        Ok(devices)
    }

    async fn count_by_passport(&self, passport_id: PassportId) -> Result<i64, RepositoryError> {
        let count = self
            .lock()
            .devices
            .values()
            .filter(|d| d.passport_id == passport_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl PassportStore for MemoryStore {
    async fn create(&self, draft: &PassportDraft) -> Result<Passport, RepositoryError> {
        let mut tables = self.lock();
        tables.next_passport_id += 1;
        let passport = Passport {
            id: PassportId::new(tables.next_passport_id),
            name: draft.name.clone(),
            model: draft.model.clone(),
            serial_prefix: draft.serial_prefix.clone(),
            from_serial_number: draft.from_serial_number,
            to_serial_number: draft.to_serial_number,
            warranty_months: draft.warranty_months,
        };
        tables.passports.insert(passport.id, passport.clone());
        Ok(passport)
    }

    async fn get(&self, id: PassportId) -> Result<Option<Passport>, RepositoryError> {
        Ok(self.lock().passports.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Passport>, RepositoryError> {
        Ok(self.lock().passports.values().cloned().collect())
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<Passport>, RepositoryError> {
        Ok(self
            .lock()
            .passports
            .values()
            .filter(|p| p.serial_prefix == prefix)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: PassportId,
        draft: &PassportDraft,
    ) -> Result<Passport, RepositoryError> {
        let mut tables = self.lock();
        let passport = tables
            .passports
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        passport.name.clone_from(&draft.name);
        passport.model.clone_from(&draft.model);
        passport.serial_prefix.clone_from(&draft.serial_prefix);
        passport.from_serial_number = draft.from_serial_number;
        passport.to_serial_number = draft.to_serial_number;
        passport.warranty_months = draft.warranty_months;
        Ok(passport.clone())
    }

    async fn delete(&self, id: PassportId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        if tables.devices.values().any(|d| d.passport_id == id) {
            return Err(RepositoryError::Conflict(
                "passport has registered devices".to_owned(),
            ));
        }
        Ok(tables.passports.remove(&id).is_some())
    }

    async fn find_for_serial(
        &self,
        serial: &SerialNumber,
    ) -> Result<Option<Passport>, RepositoryError> {
        Ok(self
            .lock()
            .passports
            .values()
            .find(|p| p.covers(serial))
            .cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn new_user(email: &str, phone: &str) -> NewUser {
        NewUser {
            full_name: "Test User".to_owned(),
            email: Email::parse(email).unwrap(),
            phone: Phone::parse(phone).unwrap(),
            address: "Somewhere 1".to_owned(),
            password_hash: "hash".to_owned(),
            role: UserRole::User,
        }
    }

    fn draft() -> PassportDraft {
        PassportDraft {
            name: "TestPassport".to_owned(),
            model: "M1".to_owned(),
            serial_prefix: "ABC".to_owned(),
            from_serial_number: 1,
            to_serial_number: 9999,
            warranty_months: 24,
        }
    }

    #[tokio::test]
    async fn test_list_users_skips_admins() {
        let store = MemoryStore::default();
        let first = UserStore::create(&store, new_user("a@example.com", "111"))
            .await
            .unwrap();
        UserStore::create(
            &store,
            NewUser {
                role: UserRole::Admin,
                ..new_user("admin@example.com", "999")
            },
        )
        .await
        .unwrap();
        let second = UserStore::create(&store, new_user("b@example.com", "222"))
            .await
            .unwrap();

        let ids: Vec<_> = store.list_users().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email_and_phone() {
        let store = MemoryStore::default();
        UserStore::create(&store, new_user("a@example.com", "111"))
            .await
            .unwrap();

        let err = UserStore::create(&store, new_user("A@example.com", "222"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(m) if m.contains("email")));

        let err = UserStore::create(&store, new_user("b@example.com", "111"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(m) if m.contains("phone")));
    }

    #[tokio::test]
    async fn test_login_lookup_by_email_or_phone() {
        let store = MemoryStore::default();
        let user = UserStore::create(&store, new_user("a@example.com", "111"))
            .await
            .unwrap();

        let by_email = store.find_by_email_or_phone("A@Example.com").await.unwrap();
        assert_eq!(by_email.unwrap().user.id, user.id);

        let by_phone = store.find_by_email_or_phone("111").await.unwrap();
        assert_eq!(by_phone.unwrap().user.id, user.id);

        assert!(store.find_by_email_or_phone("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_profile_allows_own_values() {
        let store = MemoryStore::default();
        let user = UserStore::create(&store, new_user("a@example.com", "111"))
            .await
            .unwrap();
        let other = UserStore::create(&store, new_user("b@example.com", "222"))
            .await
            .unwrap();

        let mut profile = UserProfile {
            full_name: "Renamed".to_owned(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: "Elsewhere".to_owned(),
        };
        let saved = store.save_profile(user.id, &profile).await.unwrap();
        assert_eq!(saved.full_name, "Renamed");

        profile.email = other.email;
        let err = store.save_profile(user.id, &profile).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_device_serial_unique_and_passport_delete_blocked() {
        let store = MemoryStore::default();
        let user = UserStore::create(&store, new_user("a@example.com", "111"))
            .await
            .unwrap();
        let passport = PassportStore::create(&store, &draft()).await.unwrap();
        let serial = SerialNumber::parse("ABC100").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let new_device = NewDevice {
            serial_number: serial.clone(),
            passport_id: passport.id,
            user_id: user.id,
            purchase_date: day,
            warranty_expiration_date: day,
        };

        DeviceStore::create(&store, new_device.clone()).await.unwrap();
        assert!(store.exists(&serial).await.unwrap());
        let err = DeviceStore::create(&store, new_device).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err = PassportStore::delete(&store, passport.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Removing the owner drops its devices with it.
        assert!(store.remove(user.id).await.unwrap());
        assert!(!store.exists(&serial).await.unwrap());
        assert!(PassportStore::delete(&store, passport.id).await.unwrap());
    }
}
