//! OTP keys and signups waiting on OTP confirmation.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use festiv_core::{Email, Phone};

use super::RepositoryError;

/// A consumed OTP key.
#[derive(Debug, sqlx::FromRow)]
pub struct OtpKey {
    pub phone: Phone,
    pub created_at: DateTime<Utc>,
}

/// Signup data held until its OTP is confirmed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingSignup {
    pub phone: Phone,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub password_hash: String,
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_key(
    executor: impl PgExecutor<'_>,
    key: &str,
    phone: &Phone,
) -> Result<(), RepositoryError> {
    sqlx::query(r"INSERT INTO festiv.otp_key (key, phone) VALUES ($1, $2)")
        .bind(key)
        .bind(phone)
        .execute(executor)
        .await
        .map_err(RepositoryError::on_unique("otp key already issued"))?;
    Ok(())
}

/// Delete OTP keys and pending signups issued before `cutoff`.
///
/// Returns how many rows were removed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn purge_expired(
    executor: impl PgExecutor<'_>,
    cutoff: DateTime<Utc>,
) -> Result<i64, RepositoryError> {
    let removed = sqlx::query_scalar::<_, i64>(
        r"
        WITH keys AS (
            DELETE FROM festiv.otp_key WHERE created_at < $1 RETURNING 1
        ),
        signups AS (
            DELETE FROM festiv.pending_signup WHERE created_at < $1 RETURNING 1
        )
        SELECT (SELECT COUNT(*) FROM keys) + (SELECT COUNT(*) FROM signups)
        ",
    )
    .bind(cutoff)
    .fetch_one(executor)
    .await?;

    Ok(removed)
}

/// Delete a key and return what it was issued for.
///
/// A key can be taken once; expiry is checked by the caller.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn take_key(
    executor: impl PgExecutor<'_>,
    key: &str,
) -> Result<Option<OtpKey>, RepositoryError> {
    let row = sqlx::query_as::<_, OtpKey>(
        r"DELETE FROM festiv.otp_key WHERE key = $1 RETURNING phone, created_at",
    )
    .bind(key)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Store (or replace) the pending signup for a phone number.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn upsert_pending_signup(
    executor: impl PgExecutor<'_>,
    signup: &PendingSignup,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO festiv.pending_signup (phone, first_name, last_name, email, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (phone) DO UPDATE
        SET first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            email = EXCLUDED.email,
            password_hash = EXCLUDED.password_hash,
            created_at = NOW()
        ",
    )
    .bind(&signup.phone)
    .bind(&signup.first_name)
    .bind(&signup.last_name)
    .bind(&signup.email)
    .bind(&signup.password_hash)
    .execute(executor)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn take_pending_signup(
    executor: impl PgExecutor<'_>,
    phone: &Phone,
) -> Result<Option<PendingSignup>, RepositoryError> {
    let row = sqlx::query_as::<_, PendingSignup>(
        r"
        DELETE FROM festiv.pending_signup
        WHERE phone = $1
        RETURNING phone, first_name, last_name, email, password_hash
        ",
    )
    .bind(phone)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}
