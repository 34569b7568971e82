//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::otp::OtpError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] festiv_core::EmailError),

    /// Invalid phone number format.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] festiv_core::PhoneError),

    /// Invalid credentials (wrong password or unknown phone).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An admin has blocked this account.
    #[error("account is blocked")]
    Blocked,

    /// No account is registered for this phone.
    #[error("account not found")]
    UserNotFound,

    /// Email or phone already registered.
    #[error("email or phone already registered")]
    UserAlreadyExists,

    /// No pending signup for the OTP key's phone.
    #[error("no signup is waiting for this OTP")]
    NoPendingSignup,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// OTP delivery or verification failed.
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
