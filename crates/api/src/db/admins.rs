//! Admin repository.

use sqlx::PgExecutor;

use festiv_core::{AdminId, Email, Phone};

use super::RepositoryError;
use crate::models::account::Admin;

pub struct NewAdmin {
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub password_hash: String,
}

#[derive(sqlx::FromRow)]
pub struct AdminCredentials {
    #[sqlx(flatten)]
    pub admin: Admin,
    pub password_hash: String,
}

/// # Errors
///
/// Returns `RepositoryError::Conflict` if the email or phone is taken.
pub async fn create(executor: impl PgExecutor<'_>, new: &NewAdmin) -> Result<Admin, RepositoryError> {
    sqlx::query_as::<_, Admin>(
        r"
        INSERT INTO festiv.admin (name, email, phone, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, email, phone, created_at
        ",
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.password_hash)
    .fetch_one(executor)
    .await
    .map_err(RepositoryError::on_unique("admin email or phone already registered"))
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: AdminId,
) -> Result<Option<Admin>, RepositoryError> {
    let admin = sqlx::query_as::<_, Admin>(
        r"SELECT id, name, email, phone, created_at FROM festiv.admin WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(admin)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_phone(
    executor: impl PgExecutor<'_>,
    phone: &Phone,
) -> Result<Option<Admin>, RepositoryError> {
    let admin = sqlx::query_as::<_, Admin>(
        r"SELECT id, name, email, phone, created_at FROM festiv.admin WHERE phone = $1",
    )
    .bind(phone)
    .fetch_optional(executor)
    .await?;

    Ok(admin)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_credentials_by_phone(
    executor: impl PgExecutor<'_>,
    phone: &Phone,
) -> Result<Option<AdminCredentials>, RepositoryError> {
    let row = sqlx::query_as::<_, AdminCredentials>(
        r"
        SELECT id, name, email, phone, created_at, password_hash
        FROM festiv.admin
        WHERE phone = $1
        ",
    )
    .bind(phone)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}
