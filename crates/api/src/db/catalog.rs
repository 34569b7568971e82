//! Catalog repository: products, details, and inventory.

use sqlx::{PgConnection, PgExecutor};

use festiv_core::{AdminId, Pagination, ProductCategory, ProductId};

use super::{RepositoryError, like_prefix};
use crate::models::catalog::{NewProduct, Product, ProductChanges, ProductView};

/// Optional narrowing for catalog listings.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Tickets only: exact location match.
    pub location: Option<String>,
    /// Exact subcategory match.
    pub subcategory: Option<String>,
    /// Case-insensitive name prefix.
    pub name_prefix: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ProductViewRow {
    #[sqlx(flatten)]
    product: Product,
    description: String,
    venue: Option<String>,
    stock: i32,
}

impl From<ProductViewRow> for ProductView {
    fn from(row: ProductViewRow) -> Self {
        Self {
            product: row.product,
            description: row.description,
            venue: row.venue,
            stock: row.stock,
        }
    }
}

/// Active products of a category, oldest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(
    executor: impl PgExecutor<'_>,
    category: ProductCategory,
    filter: &ListFilter,
    page: Pagination,
) -> Result<Vec<Product>, RepositoryError> {
    let products = sqlx::query_as::<_, Product>(
        r"
        SELECT id, category, name, price, image_url, subcategory, event_date, location,
               removed, admin_id, created_at, updated_at
        FROM festiv.product
        WHERE category = $1
          AND NOT removed
          AND ($2::TEXT IS NULL OR location = $2)
          AND ($3::TEXT IS NULL OR subcategory = $3)
          AND ($4::TEXT IS NULL OR name ILIKE $4)
        ORDER BY id
        LIMIT $5 OFFSET $6
        ",
    )
    .bind(category)
    .bind(filter.location.as_deref())
    .bind(filter.subcategory.as_deref())
    .bind(filter.name_prefix.as_deref().map(like_prefix))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await?;

    Ok(products)
}

/// A product page. Removed products are only visible when `include_removed`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_view(
    executor: impl PgExecutor<'_>,
    id: ProductId,
    category: ProductCategory,
    include_removed: bool,
) -> Result<Option<ProductView>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductViewRow>(
        r"
        SELECT p.id, p.category, p.name, p.price, p.image_url, p.subcategory, p.event_date,
               p.location, p.removed, p.admin_id, p.created_at, p.updated_at,
               COALESCE(d.description, '') AS description, d.venue,
               COALESCE(i.quantity, 0) AS stock
        FROM festiv.product p
        LEFT JOIN festiv.product_detail d ON d.product_id = p.id
        LEFT JOIN festiv.inventory i ON i.product_id = p.id AND i.category = p.category
        WHERE p.id = $1 AND p.category = $2 AND ($3 OR NOT p.removed)
        ",
    )
    .bind(id)
    .bind(category)
    .bind(include_removed)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(ProductView::from))
}

/// An active product that can be put in a cart or wishlist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_active(
    executor: impl PgExecutor<'_>,
    id: ProductId,
    category: ProductCategory,
) -> Result<Option<Product>, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(
        r"
        SELECT id, category, name, price, image_url, subcategory, event_date, location,
               removed, admin_id, created_at, updated_at
        FROM festiv.product
        WHERE id = $1 AND category = $2 AND NOT removed
        ",
    )
    .bind(id)
    .bind(category)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

/// Create a product with its detail record and inventory counter.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the category already has a product
/// with this name.
pub async fn create(
    conn: &mut PgConnection,
    category: ProductCategory,
    admin_id: AdminId,
    new: &NewProduct,
) -> Result<Product, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(
        r"
        INSERT INTO festiv.product
            (category, name, price, image_url, subcategory, event_date, location, admin_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, category, name, price, image_url, subcategory, event_date, location,
                  removed, admin_id, created_at, updated_at
        ",
    )
    .bind(category)
    .bind(&new.name)
    .bind(new.price)
    .bind(&new.image_url)
    .bind(&new.subcategory)
    .bind(new.event_date)
    .bind(&new.location)
    .bind(admin_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(RepositoryError::on_unique("a product with this name already exists"))?;

    sqlx::query(
        r"INSERT INTO festiv.product_detail (product_id, description, venue) VALUES ($1, $2, $3)",
    )
    .bind(product.id)
    .bind(&new.description)
    .bind(&new.venue)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"INSERT INTO festiv.inventory (product_id, category, quantity) VALUES ($1, $2, $3)",
    )
    .bind(product.id)
    .bind(category)
    .bind(new.stock)
    .execute(&mut *conn)
    .await?;

    Ok(product)
}

/// Apply a partial update to a product and its detail record.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no product matches and
/// `RepositoryError::Conflict` if the new name is taken.
pub async fn update(
    conn: &mut PgConnection,
    id: ProductId,
    category: ProductCategory,
    changes: &ProductChanges,
) -> Result<Product, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(
        r"
        UPDATE festiv.product
        SET name = COALESCE($3, name),
            price = COALESCE($4, price),
            image_url = COALESCE($5, image_url),
            subcategory = COALESCE($6, subcategory),
            event_date = COALESCE($7, event_date),
            location = COALESCE($8, location),
            updated_at = NOW()
        WHERE id = $1 AND category = $2
        RETURNING id, category, name, price, image_url, subcategory, event_date, location,
                  removed, admin_id, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(category)
    .bind(&changes.name)
    .bind(changes.price)
    .bind(&changes.image_url)
    .bind(&changes.subcategory)
    .bind(changes.event_date)
    .bind(&changes.location)
    .fetch_optional(&mut *conn)
    .await
    .map_err(RepositoryError::on_unique("a product with this name already exists"))?
    .ok_or(RepositoryError::NotFound)?;

    sqlx::query(
        r"
        UPDATE festiv.product_detail
        SET description = COALESCE($2, description),
            venue = COALESCE($3, venue)
        WHERE product_id = $1
        ",
    )
    .bind(id)
    .bind(&changes.description)
    .bind(&changes.venue)
    .execute(&mut *conn)
    .await?;

    Ok(product)
}

/// Flip the soft-delete flag.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no product matches.
pub async fn toggle_removed(
    executor: impl PgExecutor<'_>,
    id: ProductId,
    category: ProductCategory,
) -> Result<Product, RepositoryError> {
    sqlx::query_as::<_, Product>(
        r"
        UPDATE festiv.product
        SET removed = NOT removed, updated_at = NOW()
        WHERE id = $1 AND category = $2
        RETURNING id, category, name, price, image_url, subcategory, event_date, location,
                  removed, admin_id, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(category)
    .fetch_optional(executor)
    .await?
    .ok_or(RepositoryError::NotFound)
}

// =============================================================================
// Inventory
// =============================================================================

/// Lock an inventory row and return its quantity.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product has no inventory row.
pub async fn lock_stock(
    conn: &mut PgConnection,
    id: ProductId,
    category: ProductCategory,
) -> Result<i32, RepositoryError> {
    sqlx::query_scalar::<_, i32>(
        r"
        SELECT quantity FROM festiv.inventory
        WHERE product_id = $1 AND category = $2
        FOR UPDATE
        ",
    )
    .bind(id)
    .bind(category)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Add `delta` (possibly negative) to a locked inventory row.
///
/// The `quantity >= 0` check constraint rejects a decrement past zero; callers
/// check with [`festiv_core::pricing::ensure_stock`] first to report a
/// readable error.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product has no inventory row.
pub async fn adjust_stock(
    conn: &mut PgConnection,
    id: ProductId,
    category: ProductCategory,
    delta: i32,
) -> Result<i32, RepositoryError> {
    sqlx::query_scalar::<_, i32>(
        r"
        UPDATE festiv.inventory
        SET quantity = quantity + $3
        WHERE product_id = $1 AND category = $2
        RETURNING quantity
        ",
    )
    .bind(id)
    .bind(category)
    .bind(delta)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}
