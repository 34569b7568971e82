//! Cart and wishlist repository.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};

use festiv_core::pricing::CartTotals;
use festiv_core::{AccountId, CartId, ProductCategory, ProductId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartItem, WishlistEntry};
use crate::models::catalog::Product;

/// Fetch the account's cart, creating an empty one first if needed, and lock
/// it for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if either statement fails.
pub async fn lock_or_create(
    conn: &mut PgConnection,
    account_id: AccountId,
) -> Result<Cart, RepositoryError> {
    sqlx::query(
        r"INSERT INTO festiv.cart (account_id) VALUES ($1) ON CONFLICT (account_id) DO NOTHING",
    )
    .bind(account_id)
    .execute(&mut *conn)
    .await?;

    let cart = sqlx::query_as::<_, Cart>(
        r"
        SELECT id, account_id, total_price, offer_price, coupon_code,
               ticket_quantity, apparel_quantity, updated_at
        FROM festiv.cart
        WHERE account_id = $1
        FOR UPDATE
        ",
    )
    .bind(account_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(cart)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_for_account(
    executor: impl PgExecutor<'_>,
    account_id: AccountId,
) -> Result<Option<Cart>, RepositoryError> {
    let cart = sqlx::query_as::<_, Cart>(
        r"
        SELECT id, account_id, total_price, offer_price, coupon_code,
               ticket_quantity, apparel_quantity, updated_at
        FROM festiv.cart
        WHERE account_id = $1
        ",
    )
    .bind(account_id)
    .fetch_optional(executor)
    .await?;

    Ok(cart)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items(
    executor: impl PgExecutor<'_>,
    cart_id: CartId,
) -> Result<Vec<CartItem>, RepositoryError> {
    let items = sqlx::query_as::<_, CartItem>(
        r"
        SELECT id, cart_id, product_id, category, product_name, quantity, unit_price
        FROM festiv.cart_item
        WHERE cart_id = $1
        ORDER BY id
        ",
    )
    .bind(cart_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_item(
    conn: &mut PgConnection,
    cart_id: CartId,
    category: ProductCategory,
    product_id: ProductId,
) -> Result<Option<CartItem>, RepositoryError> {
    let item = sqlx::query_as::<_, CartItem>(
        r"
        SELECT id, cart_id, product_id, category, product_name, quantity, unit_price
        FROM festiv.cart_item
        WHERE cart_id = $1 AND category = $2 AND product_id = $3
        ",
    )
    .bind(cart_id)
    .bind(category)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    Ok(item)
}

/// Add a new line priced at the product's current price.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the product is already in the cart.
pub async fn insert_item(
    conn: &mut PgConnection,
    cart_id: CartId,
    product: &Product,
    quantity: i32,
) -> Result<CartItem, RepositoryError> {
    sqlx::query_as::<_, CartItem>(
        r"
        INSERT INTO festiv.cart_item
            (cart_id, product_id, category, product_name, quantity, unit_price)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, cart_id, product_id, category, product_name, quantity, unit_price
        ",
    )
    .bind(cart_id)
    .bind(product.id)
    .bind(product.category)
    .bind(&product.name)
    .bind(quantity)
    .bind(product.price)
    .fetch_one(conn)
    .await
    .map_err(RepositoryError::on_unique("product already in cart"))
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the line does not exist.
pub async fn set_item_quantity(
    conn: &mut PgConnection,
    item: &CartItem,
    quantity: i32,
) -> Result<CartItem, RepositoryError> {
    sqlx::query_as::<_, CartItem>(
        r"
        UPDATE festiv.cart_item
        SET quantity = $2
        WHERE id = $1
        RETURNING id, cart_id, product_id, category, product_name, quantity, unit_price
        ",
    )
    .bind(item.id)
    .bind(quantity)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete_item(conn: &mut PgConnection, item: &CartItem) -> Result<(), RepositoryError> {
    sqlx::query(r"DELETE FROM festiv.cart_item WHERE id = $1")
        .bind(item.id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Empty a cart and reset its aggregates.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if either statement fails.
pub async fn clear(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query(r"DELETE FROM festiv.cart_item WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;

    store_totals(conn, cart_id, &CartTotals::default(), Decimal::ZERO, None).await?;
    Ok(())
}

/// Write recomputed aggregates and the current discount back to the cart.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the cart does not exist.
pub async fn store_totals(
    conn: &mut PgConnection,
    cart_id: CartId,
    totals: &CartTotals,
    offer_price: Decimal,
    coupon_code: Option<&str>,
) -> Result<Cart, RepositoryError> {
    sqlx::query_as::<_, Cart>(
        r"
        UPDATE festiv.cart
        SET total_price = $2,
            ticket_quantity = $3,
            apparel_quantity = $4,
            offer_price = $5,
            coupon_code = $6,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, account_id, total_price, offer_price, coupon_code,
                  ticket_quantity, apparel_quantity, updated_at
        ",
    )
    .bind(cart_id)
    .bind(totals.total_price)
    .bind(totals.ticket_quantity)
    .bind(totals.apparel_quantity)
    .bind(offer_price)
    .bind(coupon_code)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

// =============================================================================
// Wishlist
// =============================================================================

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn wishlist(
    executor: impl PgExecutor<'_>,
    account_id: AccountId,
) -> Result<Vec<WishlistEntry>, RepositoryError> {
    let entries = sqlx::query_as::<_, WishlistEntry>(
        r"
        SELECT id, account_id, product_id, category, product_name, price, created_at
        FROM festiv.wishlist_entry
        WHERE account_id = $1
        ORDER BY created_at DESC
        ",
    )
    .bind(account_id)
    .fetch_all(executor)
    .await?;

    Ok(entries)
}

/// # Errors
///
/// Returns `RepositoryError::Conflict` if the product is already wishlisted.
pub async fn add_to_wishlist(
    executor: impl PgExecutor<'_>,
    account_id: AccountId,
    product: &Product,
) -> Result<WishlistEntry, RepositoryError> {
    sqlx::query_as::<_, WishlistEntry>(
        r"
        INSERT INTO festiv.wishlist_entry (account_id, product_id, category, product_name, price)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, account_id, product_id, category, product_name, price, created_at
        ",
    )
    .bind(account_id)
    .bind(product.id)
    .bind(product.category)
    .bind(&product.name)
    .bind(product.price)
    .fetch_one(executor)
    .await
    .map_err(RepositoryError::on_unique("product already in wishlist"))
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product is not wishlisted.
pub async fn remove_from_wishlist(
    executor: impl PgExecutor<'_>,
    account_id: AccountId,
    category: ProductCategory,
    product_id: ProductId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        DELETE FROM festiv.wishlist_entry
        WHERE account_id = $1 AND category = $2 AND product_id = $3
        ",
    )
    .bind(account_id)
    .bind(category)
    .bind(product_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
