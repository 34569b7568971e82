//! Authentication service.
//!
//! Provides password and SMS OTP authentication for shoppers and admins.
//!
//! OTP flows are two requests: the first sends a code and returns an OTP
//! key, the second presents the key with the code. A key is deleted by the
//! first validation attempt, whatever its outcome, and is refused once it is
//! older than [`OTP_TTL_MINUTES`](crate::services::otp::OTP_TTL_MINUTES).

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use festiv_core::{AccountId, Email, Phone};

use crate::db::accounts::{self, NewAccount};
use crate::db::otp::{self, PendingSignup};
use crate::db::{RepositoryError, UnitOfWork, admins};
use crate::models::{Account, Admin};
use crate::services::otp::{OtpClient, OtpError, expiry_cutoff, is_fresh};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Shopper signup fields.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Fields for registering another admin.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    otp: &'a OtpClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, otp: &'a OtpClient) -> Self {
        Self { pool, otp }
    }

    // =========================================================================
    // Signup
    // =========================================================================

    /// Register a new shopper with a password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`/`InvalidPhone`/`WeakPassword` for bad
    /// input and `AuthError::UserAlreadyExists` if the email or phone is taken.
    #[instrument(skip(self, input), fields(phone = %input.phone))]
    pub async fn signup(&self, input: &SignupInput) -> Result<Account, AuthError> {
        let new = self.prepare_signup(input).await?;

        let account = accounts::create(self.pool, &new)
            .await
            .map_err(conflict_as_exists)?;

        tracing::info!(account_id = %account.id, "Account created");
        Ok(account)
    }

    /// Validate a signup, park it, and text an OTP to the phone.
    ///
    /// Returns the OTP key to present with the code.
    ///
    /// # Errors
    ///
    /// Same input errors as [`Self::signup`], plus `AuthError::Otp` if the
    /// code cannot be sent.
    #[instrument(skip(self, input), fields(phone = %input.phone))]
    pub async fn start_signup_otp(&self, input: &SignupInput) -> Result<String, AuthError> {
        let new = self.prepare_signup(input).await?;

        let key = self.otp.send(&new.phone).await?;

        let pending = PendingSignup {
            phone: new.phone,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            password_hash: new.password_hash,
        };
        self.purge_expired_keys().await?;
        otp::upsert_pending_signup(self.pool, &pending).await?;
        otp::insert_key(self.pool, &key, &pending.phone).await?;

        Ok(key)
    }

    /// Confirm an OTP signup and create the account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Otp` for an unknown, expired, or wrong code and
    /// `AuthError::NoPendingSignup` if the signup was already completed.
    #[instrument(skip(self, key, code))]
    pub async fn finish_signup_otp(&self, key: &str, code: &str) -> Result<Account, AuthError> {
        let phone = self.consume_key(key, code).await?;

        let mut uow = UnitOfWork::begin(self.pool).await?;
        let pending = otp::take_pending_signup(uow.conn(), &phone)
            .await?
            .ok_or(AuthError::NoPendingSignup)?;

        let account = accounts::create(
            uow.conn(),
            &NewAccount {
                first_name: pending.first_name,
                last_name: pending.last_name,
                email: pending.email,
                phone: pending.phone,
                password_hash: pending.password_hash,
            },
        )
        .await
        .map_err(conflict_as_exists)?;
        uow.commit().await?;

        tracing::info!(account_id = %account.id, "Account created via OTP");
        Ok(account)
    }

    // =========================================================================
    // Shopper login
    // =========================================================================

    /// Login with phone and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the phone/password is wrong
    /// and `AuthError::Blocked` for a blocked account.
    #[instrument(skip(self, password))]
    pub async fn login_with_password(
        &self,
        phone: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let phone = Phone::parse(phone).map_err(|_| AuthError::InvalidCredentials)?;

        let credentials = accounts::find_credentials_by_phone(self.pool, &phone)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &credentials.password_hash)?;
        ensure_permitted(&credentials.account)?;

        Ok(credentials.account)
    }

    /// Send a login code to a registered, unblocked phone.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown phone and
    /// `AuthError::Blocked` for a blocked account.
    #[instrument(skip(self))]
    pub async fn start_login_otp(&self, phone: &str) -> Result<String, AuthError> {
        let phone = Phone::parse(phone)?;
        let account = accounts::find_by_phone(self.pool, &phone)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        ensure_permitted(&account)?;

        self.issue_key(&account.phone).await
    }

    /// # Errors
    ///
    /// Returns `AuthError::Otp` for an unknown, expired, or wrong code.
    #[instrument(skip(self, key, code))]
    pub async fn finish_login_otp(&self, key: &str, code: &str) -> Result<Account, AuthError> {
        let phone = self.consume_key(key, code).await?;
        let account = accounts::find_by_phone(self.pool, &phone)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        ensure_permitted(&account)?;
        Ok(account)
    }

    // =========================================================================
    // Password change
    // =========================================================================

    /// Send a code to the account's phone before a password change.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    #[instrument(skip(self))]
    pub async fn start_password_change(&self, account_id: AccountId) -> Result<String, AuthError> {
        let account = accounts::find_by_id(self.pool, account_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.issue_key(&account.phone).await
    }

    /// Replace the password once the OTP checks out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Otp` for a bad key or code, including a key issued
    /// to another phone, and `AuthError::WeakPassword` for a short password.
    #[instrument(skip(self, key, code, new_password))]
    pub async fn change_password(
        &self,
        account_id: AccountId,
        key: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let account = accounts::find_by_id(self.pool, account_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let phone = self.consume_key(key, code).await?;
        if phone != account.phone {
            return Err(OtpError::UnknownKey.into());
        }

        let password_hash = hash_password(new_password)?;
        accounts::update_password(self.pool, account.id, &password_hash).await?;
        tracing::info!(account_id = %account.id, "Password changed");
        Ok(())
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Register another admin.
    ///
    /// # Errors
    ///
    /// Returns input validation errors and `AuthError::UserAlreadyExists` if
    /// the email or phone is taken.
    #[instrument(skip(self, input), fields(phone = %input.phone))]
    pub async fn register_admin(&self, input: &AdminInput) -> Result<Admin, AuthError> {
        let new = admins::NewAdmin {
            name: input.name.trim().to_owned(),
            email: Email::parse(&input.email)?,
            phone: Phone::parse(&input.phone)?,
            password_hash: {
                validate_password(&input.password)?;
                hash_password(&input.password)?
            },
        };

        let admin = admins::create(self.pool, &new)
            .await
            .map_err(conflict_as_exists)?;
        tracing::info!(admin_id = %admin.id, "Admin registered");
        Ok(admin)
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the phone/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn admin_login_with_password(
        &self,
        phone: &str,
        password: &str,
    ) -> Result<Admin, AuthError> {
        let phone = Phone::parse(phone).map_err(|_| AuthError::InvalidCredentials)?;
        let credentials = admins::find_credentials_by_phone(self.pool, &phone)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &credentials.password_hash)?;
        Ok(credentials.admin)
    }

    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no admin has this phone.
    #[instrument(skip(self))]
    pub async fn admin_start_login_otp(&self, phone: &str) -> Result<String, AuthError> {
        let phone = Phone::parse(phone)?;
        let admin = admins::find_by_phone(self.pool, &phone)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.issue_key(&admin.phone).await
    }

    /// # Errors
    ///
    /// Returns `AuthError::Otp` for an unknown, expired, or wrong code.
    #[instrument(skip(self, key, code))]
    pub async fn admin_finish_login_otp(&self, key: &str, code: &str) -> Result<Admin, AuthError> {
        let phone = self.consume_key(key, code).await?;
        admins::find_by_phone(self.pool, &phone)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn prepare_signup(&self, input: &SignupInput) -> Result<NewAccount, AuthError> {
        let email = Email::parse(&input.email)?;
        let phone = Phone::parse(&input.phone)?;
        validate_password(&input.password)?;

        if accounts::email_or_phone_taken(self.pool, &email, &phone).await? {
            return Err(AuthError::UserAlreadyExists);
        }

        Ok(NewAccount {
            first_name: input.first_name.trim().to_owned(),
            last_name: input.last_name.trim().to_owned(),
            email,
            phone,
            password_hash: hash_password(&input.password)?,
        })
    }

    async fn issue_key(&self, phone: &Phone) -> Result<String, AuthError> {
        let key = self.otp.send(phone).await?;
        self.purge_expired_keys().await?;
        otp::insert_key(self.pool, &key, phone).await?;
        Ok(key)
    }

    async fn purge_expired_keys(&self) -> Result<(), AuthError> {
        let removed = otp::purge_expired(self.pool, expiry_cutoff(Utc::now())).await?;
        if removed > 0 {
            tracing::debug!(removed, "Expired OTP keys purged");
        }
        Ok(())
    }

    /// Delete the key, then check freshness and the code with the provider.
    async fn consume_key(&self, key: &str, code: &str) -> Result<Phone, AuthError> {
        let issued = otp::take_key(self.pool, key)
            .await?
            .ok_or(OtpError::UnknownKey)?;

        if !is_fresh(issued.created_at, Utc::now()) {
            return Err(OtpError::Expired.into());
        }

        self.otp.check(&issued.phone, code).await?;
        Ok(issued.phone)
    }
}

fn conflict_as_exists(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
        other => AuthError::Repository(other),
    }
}

const fn ensure_permitted(account: &Account) -> Result<(), AuthError> {
    if account.permission {
        Ok(())
    } else {
        Err(AuthError::Blocked)
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_against_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_ok());
    }
}
