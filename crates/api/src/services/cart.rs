//! Cart, coupon, and wishlist operations.
//!
//! Every cart mutation runs in one [`UnitOfWork`] holding the cart row lock,
//! rewrites the cached aggregates from the surviving lines, and drops any
//! applied coupon: a discount is only valid for the cart it was computed on.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use festiv_core::pricing::{self, CartTotals, checkout_total, ensure_stock};
use festiv_core::{AccountId, PricingError, ProductCategory, ProductId};

use super::ServiceError;
use crate::db::{UnitOfWork, carts, catalog, promotions};
use crate::models::cart::{Cart, CartItem, CartView, Coupon, Offer, WishlistEntry};

/// Cart service.
pub struct CartService<'a> {
    pool: &'a PgPool,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The caller's cart with its lines, created empty on first use.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self))]
    pub async fn view(&self, account_id: AccountId) -> Result<CartView, ServiceError> {
        let mut uow = UnitOfWork::begin(self.pool).await?;
        let cart = carts::lock_or_create(uow.conn(), account_id).await?;
        let items = carts::items(uow.conn(), cart.id).await?;
        uow.commit().await?;
        Ok(cart_view(cart, items))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn items(&self, account_id: AccountId) -> Result<Vec<CartItem>, ServiceError> {
        match carts::find_for_account(self.pool, account_id).await? {
            Some(cart) => Ok(carts::items(self.pool, cart.id).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Add `quantity` units of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for a missing or removed product,
    /// `PricingError::InvalidQuantity` for a non-positive quantity, and
    /// `PricingError::InsufficientStock` if the line would exceed stock.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        account_id: AccountId,
        category: ProductCategory,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        let mut uow = UnitOfWork::begin(self.pool).await?;
        let cart = carts::lock_or_create(uow.conn(), account_id).await?;

        let view = catalog::find_view(uow.conn(), product_id, category, false)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;

        match carts::find_item(uow.conn(), cart.id, category, product_id).await? {
            Some(item) => {
                let next = pricing::add_quantity(item.quantity, quantity)?;
                ensure_stock(view.stock, next)?;
                carts::set_item_quantity(uow.conn(), &item, next).await?;
            }
            None => {
                let next = pricing::add_quantity(0, quantity)?;
                ensure_stock(view.stock, next)?;
                carts::insert_item(uow.conn(), cart.id, &view.product, next).await?;
            }
        }

        let view = recompute(uow.conn(), &cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    /// Add one unit to an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product is not in the cart and
    /// `PricingError::InsufficientStock` if stock runs out.
    #[instrument(skip(self))]
    pub async fn increment(
        &self,
        account_id: AccountId,
        category: ProductCategory,
        product_id: ProductId,
    ) -> Result<CartView, ServiceError> {
        let mut uow = UnitOfWork::begin(self.pool).await?;
        let cart = carts::lock_or_create(uow.conn(), account_id).await?;
        let item = carts::find_item(uow.conn(), cart.id, category, product_id)
            .await?
            .ok_or(ServiceError::NotFound("cart item"))?;

        let stock = catalog::find_view(uow.conn(), product_id, category, false)
            .await?
            .ok_or(ServiceError::NotFound("product"))?
            .stock;
        let next = pricing::add_quantity(item.quantity, 1)?;
        ensure_stock(stock, next)?;
        carts::set_item_quantity(uow.conn(), &item, next).await?;

        let view = recompute(uow.conn(), &cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    /// Remove one unit; the line goes away with its last unit.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product is not in the cart.
    #[instrument(skip(self))]
    pub async fn remove_one(
        &self,
        account_id: AccountId,
        category: ProductCategory,
        product_id: ProductId,
    ) -> Result<CartView, ServiceError> {
        let mut uow = UnitOfWork::begin(self.pool).await?;
        let cart = carts::lock_or_create(uow.conn(), account_id).await?;
        let item = carts::find_item(uow.conn(), cart.id, category, product_id)
            .await?
            .ok_or(ServiceError::NotFound("cart item"))?;

        match pricing::decrement_quantity(item.quantity) {
            Some(next) => {
                carts::set_item_quantity(uow.conn(), &item, next).await?;
            }
            None => carts::delete_item(uow.conn(), &item).await?,
        }

        let view = recompute(uow.conn(), &cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    /// Apply a coupon to the cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown code, and
    /// `PricingError` when the coupon is expired or exhausted, nothing in the
    /// cart is in scope, or a discount is already applied.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        account_id: AccountId,
        code: &str,
    ) -> Result<CartView, ServiceError> {
        let mut uow = UnitOfWork::begin(self.pool).await?;
        let cart = carts::lock_or_create(uow.conn(), account_id).await?;
        let items = carts::items(uow.conn(), cart.id).await?;
        if items.is_empty() {
            return Err(PricingError::EmptyCart.into());
        }

        let coupon = promotions::find_coupon(uow.conn(), code)
            .await?
            .ok_or(ServiceError::NotFound("coupon"))?;

        let discount = coupon
            .terms()
            .apply(items.as_slice(), cart.offer_price, Utc::now())?;

        let totals = CartTotals::from_lines(&items);
        let cart =
            carts::store_totals(uow.conn(), cart.id, &totals, discount, Some(&coupon.code)).await?;
        uow.commit().await?;

        tracing::info!(cart_id = %cart.id, code = %coupon.code, %discount, "Coupon applied");
        Ok(cart_view(cart, items))
    }

    /// Coupons still open for redemption.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn available_coupons(&self) -> Result<Vec<Coupon>, ServiceError> {
        Ok(promotions::available_coupons(self.pool, Utc::now()).await?)
    }

    /// Offers the caller's current cart total qualifies for.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn offers(&self, account_id: AccountId) -> Result<Vec<Offer>, ServiceError> {
        let total = carts::find_for_account(self.pool, account_id)
            .await?
            .map_or(Decimal::ZERO, |cart| cart.total_price);
        Ok(promotions::offers_for_total(self.pool, total).await?)
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn wishlist(&self, account_id: AccountId) -> Result<Vec<WishlistEntry>, ServiceError> {
        Ok(carts::wishlist(self.pool, account_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for a missing or removed product and
    /// `RepositoryError::Conflict` if it is already wishlisted.
    #[instrument(skip(self))]
    pub async fn add_to_wishlist(
        &self,
        account_id: AccountId,
        category: ProductCategory,
        product_id: ProductId,
    ) -> Result<WishlistEntry, ServiceError> {
        let product = catalog::find_active(self.pool, product_id, category)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        Ok(carts::add_to_wishlist(self.pool, account_id, &product).await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not wishlisted.
    #[instrument(skip(self))]
    pub async fn remove_from_wishlist(
        &self,
        account_id: AccountId,
        category: ProductCategory,
        product_id: ProductId,
    ) -> Result<(), ServiceError> {
        Ok(carts::remove_from_wishlist(self.pool, account_id, category, product_id).await?)
    }
}

/// Rewrite the cart aggregates from its lines and clear any discount.
async fn recompute(conn: &mut PgConnection, cart: &Cart) -> Result<CartView, ServiceError> {
    let items = carts::items(&mut *conn, cart.id).await?;
    let totals = CartTotals::from_lines(&items);
    let cart = carts::store_totals(conn, cart.id, &totals, Decimal::ZERO, None).await?;
    Ok(cart_view(cart, items))
}

pub(crate) fn cart_view(cart: Cart, items: Vec<CartItem>) -> CartView {
    let payable = checkout_total(cart.total_price, cart.offer_price);
    CartView {
        cart,
        items,
        payable,
    }
}
