//! Order, invoice, and return repository.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};

use festiv_core::{
    AccountId, AddressId, OrderId, OrderStatus, Pagination, PaymentMethod, PaymentStatus,
    ReturnId, ReturnStatus,
};

use super::RepositoryError;
use crate::models::cart::CartItem;
use crate::models::order::{Invoice, Order, OrderItem, ReturnRequest};

const ORDER_COLUMNS: &str = r"id, account_id, address_id, total, coupon_code, status,
    payment_method, payment_status, gateway_order_id, created_at, updated_at";

/// Parameters for a new order row.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub account_id: AccountId,
    pub address_id: AddressId,
    pub total: Decimal,
    pub coupon_code: Option<&'a str>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub gateway_order_id: Option<&'a str>,
}

/// Parameters for an invoice row.
#[derive(Debug)]
pub struct NewInvoice<'a> {
    pub address_type: &'a str,
    pub quantity: i32,
    pub payment_id: Option<&'a str>,
    pub remark: &'a str,
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(conn: &mut PgConnection, new: &NewOrder<'_>) -> Result<Order, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        r#"
        INSERT INTO festiv."order"
            (account_id, address_id, total, coupon_code, status, payment_method,
             payment_status, gateway_order_id)
        VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7)
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(new.account_id)
    .bind(new.address_id)
    .bind(new.total)
    .bind(new.coupon_code)
    .bind(new.payment_method)
    .bind(new.payment_status)
    .bind(new.gateway_order_id)
    .fetch_one(conn)
    .await?;

    Ok(order)
}

/// Snapshot cart lines into order items.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any insert fails.
pub async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    lines: &[CartItem],
) -> Result<Vec<OrderItem>, RepositoryError> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = sqlx::query_as::<_, OrderItem>(
            r"
            INSERT INTO festiv.order_item
                (order_id, product_id, category, product_name, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, order_id, product_id, category, product_name, quantity, unit_price
            ",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.category)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .fetch_one(&mut *conn)
        .await?;
        items.push(item);
    }
    Ok(items)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items(
    executor: impl PgExecutor<'_>,
    order_id: OrderId,
) -> Result<Vec<OrderItem>, RepositoryError> {
    let items = sqlx::query_as::<_, OrderItem>(
        r"
        SELECT id, order_id, product_id, category, product_name, quantity, unit_price
        FROM festiv.order_item
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

/// Items for several orders at once, ordered by order then line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_for_orders(
    executor: impl PgExecutor<'_>,
    order_ids: &[OrderId],
) -> Result<Vec<OrderItem>, RepositoryError> {
    let items = sqlx::query_as::<_, OrderItem>(
        r"
        SELECT id, order_id, product_id, category, product_name, quantity, unit_price
        FROM festiv.order_item
        WHERE order_id = ANY($1)
        ORDER BY order_id, id
        ",
    )
    .bind(order_ids)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

/// Lock an order for a status change.
///
/// When `account_id` is given the order must belong to it.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no order matches.
pub async fn lock(
    conn: &mut PgConnection,
    id: OrderId,
    account_id: Option<AccountId>,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS}
        FROM festiv."order"
        WHERE id = $1 AND ($2::INTEGER IS NULL OR account_id = $2)
        FOR UPDATE
        "#
    ))
    .bind(id)
    .bind(account_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if no order carries this gateway id.
pub async fn lock_by_gateway_id(
    conn: &mut PgConnection,
    gateway_order_id: &str,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS}
        FROM festiv."order"
        WHERE gateway_order_id = $1
        FOR UPDATE
        "#
    ))
    .bind(gateway_order_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist.
pub async fn update_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
    payment_status: PaymentStatus,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE festiv."order"
        SET status = $2, payment_status = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .bind(payment_status)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// An account's orders, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_account(
    executor: impl PgExecutor<'_>,
    account_id: AccountId,
    page: Pagination,
) -> Result<Vec<Order>, RepositoryError> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS}
        FROM festiv."order"
        WHERE account_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(account_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await?;

    Ok(orders)
}

/// All orders, newest first, optionally narrowed to one status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_by_status(
    executor: impl PgExecutor<'_>,
    status: Option<OrderStatus>,
    page: Pagination,
) -> Result<Vec<Order>, RepositoryError> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS}
        FROM festiv."order"
        WHERE $1::festiv.order_status IS NULL OR status = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(status)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await?;

    Ok(orders)
}

// =============================================================================
// Invoices
// =============================================================================

/// Record the invoice for a paid (or COD-placed) order.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order already has an invoice.
pub async fn insert_invoice(
    conn: &mut PgConnection,
    order: &Order,
    new: &NewInvoice<'_>,
) -> Result<Invoice, RepositoryError> {
    sqlx::query_as::<_, Invoice>(
        r"
        INSERT INTO festiv.invoice
            (order_id, account_id, address_type, quantity, amount, payment_method,
             payment_status, payment_id, remark)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, order_id, account_id, address_type, quantity, amount, payment_method,
                  payment_status, payment_id, remark, created_at
        ",
    )
    .bind(order.id)
    .bind(order.account_id)
    .bind(new.address_type)
    .bind(new.quantity)
    .bind(order.total)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(new.payment_id)
    .bind(new.remark)
    .fetch_one(conn)
    .await
    .map_err(RepositoryError::on_unique("order already invoiced"))
}

// =============================================================================
// Returns
// =============================================================================

/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order already has a return.
pub async fn insert_return(
    conn: &mut PgConnection,
    order: &Order,
    reason: &str,
) -> Result<ReturnRequest, RepositoryError> {
    sqlx::query_as::<_, ReturnRequest>(
        r"
        INSERT INTO festiv.return_request (order_id, account_id, reason)
        VALUES ($1, $2, $3)
        RETURNING id, order_id, account_id, reason, status, refund_method, refunded_amount,
                  created_at, updated_at
        ",
    )
    .bind(order.id)
    .bind(order.account_id)
    .bind(reason)
    .fetch_one(conn)
    .await
    .map_err(RepositoryError::on_unique("a return was already requested for this order"))
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the return does not exist.
pub async fn lock_return(
    conn: &mut PgConnection,
    id: ReturnId,
) -> Result<ReturnRequest, RepositoryError> {
    sqlx::query_as::<_, ReturnRequest>(
        r"
        SELECT id, order_id, account_id, reason, status, refund_method, refunded_amount,
               created_at, updated_at
        FROM festiv.return_request
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// The return filed against an order, locked.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_return_for_order(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<ReturnRequest>, RepositoryError> {
    let row = sqlx::query_as::<_, ReturnRequest>(
        r"
        SELECT id, order_id, account_id, reason, status, refund_method, refunded_amount,
               created_at, updated_at
        FROM festiv.return_request
        WHERE order_id = $1
        FOR UPDATE
        ",
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the return does not exist.
pub async fn update_return(
    conn: &mut PgConnection,
    id: ReturnId,
    status: ReturnStatus,
    refund_method: Option<&str>,
    refunded_amount: Option<Decimal>,
) -> Result<ReturnRequest, RepositoryError> {
    sqlx::query_as::<_, ReturnRequest>(
        r"
        UPDATE festiv.return_request
        SET status = $2,
            refund_method = COALESCE($3, refund_method),
            refunded_amount = COALESCE($4, refunded_amount),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, order_id, account_id, reason, status, refund_method, refunded_amount,
                  created_at, updated_at
        ",
    )
    .bind(id)
    .bind(status)
    .bind(refund_method)
    .bind(refunded_amount)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}
