//! Aggregate queries for the admin dashboard and sales reports.
//!
//! Canceled orders never count toward revenue or sales.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use festiv_core::ProductCategory;

use super::RepositoryError;
use crate::models::report::{Dashboard, PaymentMethodCount, SalesReport};

#[derive(sqlx::FromRow)]
struct AccountCounts {
    total_users: i64,
    new_users_last_7_days: i64,
}

#[derive(sqlx::FromRow)]
struct OrderCounts {
    total_orders: i64,
    average_order_value: Decimal,
    pending_orders: i64,
    return_orders: i64,
    revenue: Decimal,
}

#[derive(sqlx::FromRow)]
struct SalesTotals {
    total_sales: Decimal,
    order_count: i64,
}

/// # Errors
///
/// Returns `RepositoryError::Database` if any query fails.
pub async fn dashboard(pool: &PgPool, now: DateTime<Utc>) -> Result<Dashboard, RepositoryError> {
    let accounts = sqlx::query_as::<_, AccountCounts>(
        r"
        SELECT COUNT(*) AS total_users,
               COUNT(*) FILTER (WHERE created_at >= $1 - INTERVAL '7 days') AS new_users_last_7_days
        FROM festiv.account
        ",
    )
    .bind(now)
    .fetch_one(pool)
    .await?;

    let active_products = sqlx::query_scalar::<_, i64>(
        r"SELECT COUNT(*) FROM festiv.product WHERE NOT removed",
    )
    .fetch_one(pool)
    .await?;

    let lowest_stock_category = sqlx::query_scalar::<_, ProductCategory>(
        r"
        SELECT category
        FROM festiv.inventory
        GROUP BY category
        ORDER BY SUM(quantity) ASC
        LIMIT 1
        ",
    )
    .fetch_optional(pool)
    .await?;

    let orders = sqlx::query_as::<_, OrderCounts>(
        r#"
        SELECT COUNT(*) AS total_orders,
               COALESCE(ROUND(AVG(total) FILTER (WHERE status <> 'canceled'), 2), 0)
                   AS average_order_value,
               COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders,
               COUNT(*) FILTER (WHERE status = 'return') AS return_orders,
               COALESCE(SUM(total) FILTER (WHERE status <> 'canceled'), 0) AS revenue
        FROM festiv."order"
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(Dashboard {
        total_users: accounts.total_users,
        new_users_last_7_days: accounts.new_users_last_7_days,
        active_products,
        lowest_stock_category,
        total_orders: orders.total_orders,
        average_order_value: orders.average_order_value,
        pending_orders: orders.pending_orders,
        return_orders: orders.return_orders,
        revenue: orders.revenue,
    })
}

/// Sales between `from` (inclusive) and `to` (exclusive).
///
/// With a category, only order lines of that category are summed and only
/// orders containing such a line are counted.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any query fails.
pub async fn sales(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    category: Option<ProductCategory>,
) -> Result<SalesReport, RepositoryError> {
    let totals = if category.is_some() {
        sqlx::query_as::<_, SalesTotals>(
            r#"
            SELECT COALESCE(SUM(oi.quantity * oi.unit_price), 0) AS total_sales,
                   COUNT(DISTINCT o.id) AS order_count
            FROM festiv."order" o
            JOIN festiv.order_item oi ON oi.order_id = o.id
            WHERE o.created_at >= $1 AND o.created_at < $2
              AND o.status <> 'canceled'
              AND oi.category = $3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(category)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as::<_, SalesTotals>(
            r#"
            SELECT COALESCE(SUM(total), 0) AS total_sales, COUNT(*) AS order_count
            FROM festiv."order"
            WHERE created_at >= $1 AND created_at < $2 AND status <> 'canceled'
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await?
    };

    let by_payment_method = sqlx::query_as::<_, PaymentMethodCount>(
        r#"
        SELECT o.payment_method, COUNT(*) AS orders
        FROM festiv."order" o
        WHERE o.created_at >= $1 AND o.created_at < $2
          AND o.status <> 'canceled'
          AND ($3::festiv.product_category IS NULL OR EXISTS (
              SELECT 1 FROM festiv.order_item oi
              WHERE oi.order_id = o.id AND oi.category = $3
          ))
        GROUP BY o.payment_method
        ORDER BY o.payment_method
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(category)
    .fetch_all(pool)
    .await?;

    Ok(SalesReport {
        from,
        to,
        category,
        total_sales: totals.total_sales,
        order_count: totals.order_count,
        average_order: average(totals.total_sales, totals.order_count),
        by_payment_method,
    })
}

fn average(total: Decimal, count: i64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(count)).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_no_orders_is_zero() {
        assert_eq!(average(Decimal::from(500), 0), Decimal::ZERO);
    }

    #[test]
    fn test_average_rounds_to_cents() {
        assert_eq!(average(Decimal::from(100), 3), Decimal::new(3333, 2));
    }
}
