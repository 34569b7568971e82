//! Database operations for the marketplace `PostgreSQL` schema.
//!
//! # Schema: `festiv`
//!
//! ## Tables
//!
//! - `account`, `address` - Shoppers, their addresses and wallet balance
//! - `admin` - Catalog and order administrators
//! - `otp_key`, `pending_signup` - Outstanding OTP verifications
//! - `product`, `product_detail`, `inventory` - Tickets and apparels
//! - `cart`, `cart_item`, `wishlist_entry` - Per-account baskets
//! - `coupon`, `offer` - Promotions
//! - `order`, `order_item`, `invoice`, `return_request` - Order lifecycle
//!
//! Repository functions are free functions. Single-statement reads take any
//! `PgExecutor` (a pool or a transaction); anything that must run inside a
//! workflow takes `&mut PgConnection`, which callers obtain from a
//! [`UnitOfWork`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p festiv-cli -- migrate
//! ```

pub mod accounts;
pub mod admins;
pub mod carts;
pub mod catalog;
pub mod orders;
pub mod otp;
pub mod promotions;
pub mod reports;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to [`RepositoryError::Conflict`].
    pub(crate) fn on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> Self + '_ {
        move |e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return Self::Conflict(message.to_owned());
            }
            Self::Database(e)
        }
    }
}

/// Build a `LIKE` pattern matching values that start with `prefix`.
pub(crate) fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// A database transaction spanning one business workflow.
///
/// Dropping a `UnitOfWork` without calling [`UnitOfWork::commit`] rolls back
/// every write made through it, so an early `?` return leaves no partial
/// order, inventory, or wallet state behind.
pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl UnitOfWork {
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection can be acquired.
    pub async fn begin(pool: &PgPool) -> Result<Self, RepositoryError> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }

    /// Connection to run repository calls against.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the commit fails.
    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("Sunburn"), "Sunburn%");
        assert_eq!(like_prefix("50%_off"), "50\\%\\_off%");
        assert_eq!(like_prefix(r"a\b"), r"a\\b%");
    }
}
