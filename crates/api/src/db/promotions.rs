//! Coupon and offer repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};

use super::RepositoryError;
use crate::models::cart::{Coupon, NewCoupon, NewOffer, Offer};

/// Coupons that are neither expired nor used up.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn available_coupons(
    executor: impl PgExecutor<'_>,
    now: DateTime<Utc>,
) -> Result<Vec<Coupon>, RepositoryError> {
    let coupons = sqlx::query_as::<_, Coupon>(
        r"
        SELECT id, code, discount_type, amount, category, usage_limit, used_count,
               valid_until, created_at
        FROM festiv.coupon
        WHERE valid_until >= $1 AND used_count < usage_limit
        ORDER BY valid_until
        ",
    )
    .bind(now)
    .fetch_all(executor)
    .await?;

    Ok(coupons)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_coupon(
    executor: impl PgExecutor<'_>,
    code: &str,
) -> Result<Option<Coupon>, RepositoryError> {
    let coupon = sqlx::query_as::<_, Coupon>(
        r"
        SELECT id, code, discount_type, amount, category, usage_limit, used_count,
               valid_until, created_at
        FROM festiv.coupon
        WHERE code = $1
        ",
    )
    .bind(code)
    .fetch_optional(executor)
    .await?;

    Ok(coupon)
}

/// Count one more redemption of a coupon.
///
/// Returns `false` when the coupon is gone or already at its usage limit.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn redeem_coupon(conn: &mut PgConnection, code: &str) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE festiv.coupon
        SET used_count = used_count + 1
        WHERE code = $1 AND used_count < usage_limit
        ",
    )
    .bind(code)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// # Errors
///
/// Returns `RepositoryError::Conflict` if the code already exists.
pub async fn create_coupon(
    executor: impl PgExecutor<'_>,
    new: &NewCoupon,
) -> Result<Coupon, RepositoryError> {
    sqlx::query_as::<_, Coupon>(
        r"
        INSERT INTO festiv.coupon
            (code, discount_type, amount, category, usage_limit, valid_until)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, code, discount_type, amount, category, usage_limit, used_count,
                  valid_until, created_at
        ",
    )
    .bind(&new.code)
    .bind(new.discount_type)
    .bind(new.amount)
    .bind(new.category)
    .bind(new.usage_limit)
    .bind(new.valid_until)
    .fetch_one(executor)
    .await
    .map_err(RepositoryError::on_unique("coupon code already exists"))
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn create_offer(
    executor: impl PgExecutor<'_>,
    new: &NewOffer,
) -> Result<Offer, RepositoryError> {
    let offer = sqlx::query_as::<_, Offer>(
        r"
        INSERT INTO festiv.offer (name, min_price, amount)
        VALUES ($1, $2, $3)
        RETURNING id, name, min_price, amount, created_at
        ",
    )
    .bind(&new.name)
    .bind(new.min_price)
    .bind(new.amount)
    .fetch_one(executor)
    .await?;

    Ok(offer)
}

/// Offers whose threshold a cart of `total` meets, best first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn offers_for_total(
    executor: impl PgExecutor<'_>,
    total: Decimal,
) -> Result<Vec<Offer>, RepositoryError> {
    let offers = sqlx::query_as::<_, Offer>(
        r"
        SELECT id, name, min_price, amount, created_at
        FROM festiv.offer
        WHERE min_price <= $1
        ORDER BY amount DESC
        ",
    )
    .bind(total)
    .fetch_all(executor)
    .await?;

    Ok(offers)
}
