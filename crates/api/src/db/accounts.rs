//! Account and address repository.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};

use festiv_core::{AccountId, AddressId, Email, Pagination, Phone};

use super::{RepositoryError, like_prefix};
use crate::models::account::{Account, Address, NewAddress};

/// Parameters for creating an account.
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Phone,
    pub password_hash: String,
}

/// An account together with its stored password hash.
#[derive(sqlx::FromRow)]
pub struct AccountCredentials {
    #[sqlx(flatten)]
    pub account: Account,
    pub password_hash: String,
}

/// Create an account.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the email or phone is taken.
pub async fn create(
    executor: impl PgExecutor<'_>,
    new: &NewAccount,
) -> Result<Account, RepositoryError> {
    sqlx::query_as::<_, Account>(
        r"
        INSERT INTO festiv.account (first_name, last_name, email, phone, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, first_name, last_name, email, phone, wallet, permission,
                  created_at, updated_at
        ",
    )
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.password_hash)
    .fetch_one(executor)
    .await
    .map_err(RepositoryError::on_unique("email or phone already registered"))
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: AccountId,
) -> Result<Option<Account>, RepositoryError> {
    let account = sqlx::query_as::<_, Account>(
        r"
        SELECT id, first_name, last_name, email, phone, wallet, permission,
               created_at, updated_at
        FROM festiv.account
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_phone(
    executor: impl PgExecutor<'_>,
    phone: &Phone,
) -> Result<Option<Account>, RepositoryError> {
    let account = sqlx::query_as::<_, Account>(
        r"
        SELECT id, first_name, last_name, email, phone, wallet, permission,
               created_at, updated_at
        FROM festiv.account
        WHERE phone = $1
        ",
    )
    .bind(phone)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_credentials_by_phone(
    executor: impl PgExecutor<'_>,
    phone: &Phone,
) -> Result<Option<AccountCredentials>, RepositoryError> {
    let row = sqlx::query_as::<_, AccountCredentials>(
        r"
        SELECT id, first_name, last_name, email, phone, wallet, permission,
               created_at, updated_at, password_hash
        FROM festiv.account
        WHERE phone = $1
        ",
    )
    .bind(phone)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Whether an account already uses this email or phone.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn email_or_phone_taken(
    executor: impl PgExecutor<'_>,
    email: &Email,
    phone: &Phone,
) -> Result<bool, RepositoryError> {
    let taken = sqlx::query_scalar::<_, bool>(
        r"SELECT EXISTS (SELECT 1 FROM festiv.account WHERE email = $1 OR phone = $2)",
    )
    .bind(email)
    .bind(phone)
    .fetch_one(executor)
    .await?;

    Ok(taken)
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the account does not exist and
/// `RepositoryError::Conflict` if the new email is taken.
pub async fn update_profile(
    executor: impl PgExecutor<'_>,
    id: AccountId,
    first_name: &str,
    last_name: &str,
    email: &Email,
) -> Result<Account, RepositoryError> {
    sqlx::query_as::<_, Account>(
        r"
        UPDATE festiv.account
        SET first_name = $2, last_name = $3, email = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING id, first_name, last_name, email, phone, wallet, permission,
                  created_at, updated_at
        ",
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .fetch_optional(executor)
    .await
    .map_err(RepositoryError::on_unique("email already registered"))?
    .ok_or(RepositoryError::NotFound)
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the account does not exist.
pub async fn update_password(
    executor: impl PgExecutor<'_>,
    id: AccountId,
    password_hash: &str,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"UPDATE festiv.account SET password_hash = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(password_hash)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Lock the account row and return its wallet balance.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the account does not exist.
pub async fn lock_wallet(conn: &mut PgConnection, id: AccountId) -> Result<Decimal, RepositoryError> {
    sqlx::query_scalar::<_, Decimal>(r"SELECT wallet FROM festiv.account WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// Debit the wallet, returning the new balance, or `None` if the balance
/// does not cover `amount`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn debit_wallet(
    conn: &mut PgConnection,
    id: AccountId,
    amount: Decimal,
) -> Result<Option<Decimal>, RepositoryError> {
    let balance = sqlx::query_scalar::<_, Decimal>(
        r"
        UPDATE festiv.account
        SET wallet = wallet - $2, updated_at = NOW()
        WHERE id = $1 AND wallet >= $2
        RETURNING wallet
        ",
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(conn)
    .await?;

    Ok(balance)
}

/// Add `amount` to the wallet and return the new balance.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the account does not exist.
pub async fn credit_wallet(
    conn: &mut PgConnection,
    id: AccountId,
    amount: Decimal,
) -> Result<Decimal, RepositoryError> {
    sqlx::query_scalar::<_, Decimal>(
        r"
        UPDATE festiv.account
        SET wallet = wallet + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING wallet
        ",
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// List accounts, newest first, optionally filtered by permission flag.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(
    executor: impl PgExecutor<'_>,
    permission: Option<bool>,
    page: Pagination,
) -> Result<Vec<Account>, RepositoryError> {
    let accounts = sqlx::query_as::<_, Account>(
        r"
        SELECT id, first_name, last_name, email, phone, wallet, permission,
               created_at, updated_at
        FROM festiv.account
        WHERE $1::BOOLEAN IS NULL OR permission = $1
        ORDER BY id DESC
        LIMIT $2 OFFSET $3
        ",
    )
    .bind(permission)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await?;

    Ok(accounts)
}

/// Accounts whose first or last name starts with `prefix` (case-insensitive).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn search_by_name(
    executor: impl PgExecutor<'_>,
    prefix: &str,
    page: Pagination,
) -> Result<Vec<Account>, RepositoryError> {
    let accounts = sqlx::query_as::<_, Account>(
        r"
        SELECT id, first_name, last_name, email, phone, wallet, permission,
               created_at, updated_at
        FROM festiv.account
        WHERE first_name ILIKE $1 OR last_name ILIKE $1
        ORDER BY first_name, last_name
        LIMIT $2 OFFSET $3
        ",
    )
    .bind(like_prefix(prefix))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await?;

    Ok(accounts)
}

/// Flip the permission flag (block/unblock).
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the account does not exist.
pub async fn toggle_permission(
    executor: impl PgExecutor<'_>,
    id: AccountId,
) -> Result<Account, RepositoryError> {
    sqlx::query_as::<_, Account>(
        r"
        UPDATE festiv.account
        SET permission = NOT permission, updated_at = NOW()
        WHERE id = $1
        RETURNING id, first_name, last_name, email, phone, wallet, permission,
                  created_at, updated_at
        ",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Whether the account may still use its session; `None` if it is gone.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn permission(
    executor: impl PgExecutor<'_>,
    id: AccountId,
) -> Result<Option<bool>, RepositoryError> {
    let permission =
        sqlx::query_scalar::<_, bool>(r"SELECT permission FROM festiv.account WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
    Ok(permission)
}

// =============================================================================
// Addresses
// =============================================================================

/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn add_address(
    executor: impl PgExecutor<'_>,
    account_id: AccountId,
    new: &NewAddress,
) -> Result<Address, RepositoryError> {
    let address = sqlx::query_as::<_, Address>(
        r"
        INSERT INTO festiv.address
            (account_id, address_type, house, street, city, state, pincode, landmark)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, account_id, address_type, house, street, city, state, pincode,
                  landmark, removed, created_at
        ",
    )
    .bind(account_id)
    .bind(&new.address_type)
    .bind(&new.house)
    .bind(&new.street)
    .bind(&new.city)
    .bind(&new.state)
    .bind(&new.pincode)
    .bind(&new.landmark)
    .fetch_one(executor)
    .await?;

    Ok(address)
}

/// Active (not removed) addresses for an account.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_addresses(
    executor: impl PgExecutor<'_>,
    account_id: AccountId,
) -> Result<Vec<Address>, RepositoryError> {
    let addresses = sqlx::query_as::<_, Address>(
        r"
        SELECT id, account_id, address_type, house, street, city, state, pincode,
               landmark, removed, created_at
        FROM festiv.address
        WHERE account_id = $1 AND NOT removed
        ORDER BY id
        ",
    )
    .bind(account_id)
    .fetch_all(executor)
    .await?;

    Ok(addresses)
}

/// An active address, only if it belongs to `account_id`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_address(
    executor: impl PgExecutor<'_>,
    account_id: AccountId,
    id: AddressId,
) -> Result<Option<Address>, RepositoryError> {
    let address = sqlx::query_as::<_, Address>(
        r"
        SELECT id, account_id, address_type, house, street, city, state, pincode,
               landmark, removed, created_at
        FROM festiv.address
        WHERE id = $1 AND account_id = $2 AND NOT removed
        ",
    )
    .bind(id)
    .bind(account_id)
    .fetch_optional(executor)
    .await?;

    Ok(address)
}

/// Address by id regardless of owner or removal, for invoices.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the address does not exist.
pub async fn address_type(
    executor: impl PgExecutor<'_>,
    id: AddressId,
) -> Result<String, RepositoryError> {
    sqlx::query_scalar::<_, String>(r"SELECT address_type FROM festiv.address WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// Soft-delete an address.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` unless an active address with this id
/// belongs to `account_id`.
pub async fn remove_address(
    executor: impl PgExecutor<'_>,
    account_id: AccountId,
    id: AddressId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"UPDATE festiv.address SET removed = TRUE WHERE id = $1 AND account_id = $2 AND NOT removed",
    )
    .bind(id)
    .bind(account_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
