//! Account lifecycle: registration, login, profile update, password change.
//!
//! Uniqueness of email and phone is pre-checked here so the caller gets a
//! precise message, but the store's own constraint is what actually holds
//! under concurrent requests; a store `Conflict` surfaces as
//! [`ServiceError::AlreadyExists`] just the same.

use chrono::{NaiveDate, Utc};

use device_warranty_core::{Email, Phone, SerialNumber, UserId, UserRole};

use super::auth::{TokenAuthority, hash_password, validate_password, verify_password};
use super::{DeviceService, ServiceError, required};
use crate::db::UserStore;
use crate::models::{
    ChangePasswordRequest, LoginResponse, NewUser, RegisterRequest, UpdateUserRequest, User,
    UserProfile, UserRecord,
};

pub struct AccountService<'a> {
    users: &'a dyn UserStore,
    devices: DeviceService<'a>,
    tokens: &'a TokenAuthority,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        devices: DeviceService<'a>,
        tokens: &'a TokenAuthority,
    ) -> Self {
        Self {
            users,
            devices,
            tokens,
        }
    }

    /// Create a `USER` account and register its first device.
    ///
    /// If the device cannot be registered the new account is removed again
    /// and the device error is returned.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for an invalid field
    /// - `ServiceError::AlreadyExists` if the email, phone or serial is taken
    ///   (email is reported first)
    /// - `ServiceError::NotFound` if no passport covers the serial
    pub async fn register(&self, request: RegisterRequest) -> Result<LoginResponse, ServiceError> {
        let full_name = required("fullName", &request.full_name)?;
        let email = parse_email(&request.email)?;
        let phone = parse_phone(&request.phone)?;
        let address = required("address", &request.address)?;
        validate_password(&request.password).map_err(ServiceError::Validation)?;
        let serial = SerialNumber::parse(&request.device_serial_number)
            .map_err(|e| ServiceError::Validation(format!("deviceSerialNumber: {e}")))?;
        check_purchase_date(request.purchase_date)?;

        self.ensure_unique(&email, &phone, None).await?;
        self.devices.assert_serial_available(&serial).await?;

        let password_hash = hash_password(&request.password)?;
        let user = self
            .users
            .create(NewUser {
                full_name,
                email,
                phone,
                address,
                password_hash,
                role: UserRole::User,
            })
            .await?;

        if let Err(cause) = self
            .devices
            .register_device(&serial, request.purchase_date, user.id)
            .await
        {
            return Err(self.discard_account(user.id, cause).await);
        }

        let token = self.tokens.issue(&user)?;
        Ok(LoginResponse { token, user })
    }

    /// Exchange a username (email or phone) and password for a token.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidCredentials` for an unknown username or
    /// a wrong password alike.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ServiceError> {
        let UserRecord {
            user,
            password_hash,
        } = self
            .users
            .find_by_email_or_phone(username.trim())
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.tokens.issue(&user)?;
        Ok(LoginResponse { token, user })
    }

    /// Overwrite the profile of a `USER` account.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if the account does not exist
    /// - `ServiceError::Validation` if the target is an `ADMIN` or a field is invalid
    /// - `ServiceError::AlreadyExists` if the new email or phone belongs to
    ///   another account
    pub async fn update_user(&self, request: UpdateUserRequest) -> Result<User, ServiceError> {
        let target = self.load(request.id).await?;
        match target.user.role {
            UserRole::Admin => {
                return Err(ServiceError::Validation(
                    "administrator accounts cannot be modified".to_owned(),
                ));
            }
            UserRole::User => {}
        }

        let profile = UserProfile {
            full_name: required("fullName", &request.full_name)?,
            email: parse_email(&request.email)?,
            phone: parse_phone(&request.phone)?,
            address: required("address", &request.address)?,
        };
        self.ensure_unique(&profile.email, &profile.phone, Some(request.id))
            .await?;

        Ok(self.users.save_profile(request.id, &profile).await?)
    }

    /// Replace the password after checking the current one.
    ///
    /// The stored hash is either replaced in one write or left untouched.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if the account does not exist
    /// - `ServiceError::InvalidCredentials` if `old_password` does not match
    /// - `ServiceError::Validation` if `new_password` is too weak
    pub async fn update_password(
        &self,
        id: UserId,
        request: &ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        let record = self.load(id).await?;
        verify_password(&request.old_password, &record.password_hash)?;
        validate_password(&request.new_password).map_err(ServiceError::Validation)?;

        let password_hash = hash_password(&request.new_password)?;
        self.users.set_password_hash(id, &password_hash).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account does not exist.
    pub async fn get_user(&self, id: UserId) -> Result<User, ServiceError> {
        Ok(self.load(id).await?.user)
    }

    /// Every `USER` account; administrators are left out.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.users.list_users().await?)
    }

    /// Create an `ADMIN` account. Only reachable from the CLI.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` or `ServiceError::AlreadyExists`
    /// as for registration.
    pub async fn create_admin(
        &self,
        full_name: &str,
        email: &str,
        phone: &str,
        address: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        let full_name = required("fullName", full_name)?;
        let email = parse_email(email)?;
        let phone = parse_phone(phone)?;
        let address = required("address", address)?;
        validate_password(password).map_err(ServiceError::Validation)?;

        self.ensure_unique(&email, &phone, None).await?;

        Ok(self
            .users
            .create(NewUser {
                full_name,
                email,
                phone,
                address,
                password_hash: hash_password(password)?,
                role: UserRole::Admin,
            })
            .await?)
    }

    async fn load(&self, id: UserId) -> Result<UserRecord, ServiceError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {id} not found")))
    }

    /// Email first, then phone. Matches on `except` itself are ignored.
    async fn ensure_unique(
        &self,
        email: &Email,
        phone: &Phone,
        except: Option<UserId>,
    ) -> Result<(), ServiceError> {
        let is_other = |record: &UserRecord| Some(record.user.id) != except;

        if self.users.find_by_email(email).await?.is_some_and(|r| is_other(&r)) {
            return Err(ServiceError::AlreadyExists(format!(
                "user with email {email} already exists"
            )));
        }
        if self.users.find_by_phone(phone).await?.is_some_and(|r| is_other(&r)) {
            return Err(ServiceError::AlreadyExists(format!(
                "user with phone {phone} already exists"
            )));
        }
        Ok(())
    }

    async fn discard_account(&self, id: UserId, cause: ServiceError) -> ServiceError {
        match self.users.remove(id).await {
            Ok(_) => cause,
            Err(e) => ServiceError::Internal(format!(
                "{cause}; removing account {id} after failed device registration also failed: {e}"
            )),
        }
    }
}

fn parse_email(raw: &str) -> Result<Email, ServiceError> {
    Email::parse(raw).map_err(|e| ServiceError::Validation(format!("email: {e}")))
}

fn parse_phone(raw: &str) -> Result<Phone, ServiceError> {
    Phone::parse(raw).map_err(|e| ServiceError::Validation(format!("phone: {e}")))
}

fn check_purchase_date(date: NaiveDate) -> Result<(), ServiceError> {
    if date > Utc::now().date_naive() {
        return Err(ServiceError::Validation(
            "purchaseDate cannot be in the future".to_owned(),
        ));
    }
    Ok(())
}
