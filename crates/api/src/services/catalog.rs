//! Catalog browsing and administration.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use festiv_core::pricing::ensure_stock;
use festiv_core::{AdminId, Pagination, PricingError, ProductCategory, ProductId};

use super::ServiceError;
use crate::db::catalog::{self, ListFilter};
use crate::db::UnitOfWork;
use crate::models::catalog::{NewProduct, Product, ProductChanges, ProductView, StockAdjustment};

/// Catalog service.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(
        &self,
        category: ProductCategory,
        filter: &ListFilter,
        page: Pagination,
    ) -> Result<Vec<Product>, ServiceError> {
        Ok(catalog::list(self.pool, category, filter, page).await?)
    }

    /// Active products whose name starts with `query`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for an empty query.
    pub async fn search(
        &self,
        category: ProductCategory,
        query: &str,
        page: Pagination,
    ) -> Result<Vec<Product>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::Invalid("search query is empty".to_owned()));
        }
        let filter = ListFilter {
            name_prefix: Some(query.to_owned()),
            ..ListFilter::default()
        };
        Ok(catalog::list(self.pool, category, &filter, page).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for a missing or removed product.
    pub async fn details(
        &self,
        category: ProductCategory,
        id: ProductId,
    ) -> Result<ProductView, ServiceError> {
        catalog::find_view(self.pool, id, category, false)
            .await?
            .ok_or(ServiceError::NotFound("product"))
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Create a product with its details and opening stock.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for bad input and
    /// `RepositoryError::Conflict` for a duplicate name.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create(
        &self,
        category: ProductCategory,
        admin_id: AdminId,
        new: &NewProduct,
    ) -> Result<ProductView, ServiceError> {
        validate_name(&new.name)?;
        validate_price(new.price)?;
        if new.stock < 0 {
            return Err(PricingError::InvalidQuantity.into());
        }
        if category == ProductCategory::Ticket && (new.event_date.is_none() || new.location.is_none())
        {
            return Err(ServiceError::Invalid(
                "tickets need an event date and a location".to_owned(),
            ));
        }

        let mut uow = UnitOfWork::begin(self.pool).await?;
        let product = catalog::create(uow.conn(), category, admin_id, new).await?;
        uow.commit().await?;

        tracing::info!(product_id = %product.id, %category, "Product created");
        Ok(ProductView {
            product,
            description: new.description.clone(),
            venue: new.venue.clone(),
            stock: new.stock,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product matches.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        category: ProductCategory,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Product, ServiceError> {
        if let Some(name) = &changes.name {
            validate_name(name)?;
        }
        if let Some(price) = changes.price {
            validate_price(price)?;
        }

        let mut uow = UnitOfWork::begin(self.pool).await?;
        let product = catalog::update(uow.conn(), id, category, changes).await?;
        uow.commit().await?;
        Ok(product)
    }

    /// Flip the removed flag; removing twice restores the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product matches.
    #[instrument(skip(self))]
    pub async fn toggle_removed(
        &self,
        category: ProductCategory,
        id: ProductId,
    ) -> Result<Product, ServiceError> {
        let product = catalog::toggle_removed(self.pool, id, category).await?;
        tracing::info!(product_id = %product.id, removed = product.removed, "Product visibility changed");
        Ok(product)
    }

    /// Increase or decrease stock; returns the new quantity.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidQuantity` for a non-positive quantity and
    /// `PricingError::InsufficientStock` for a decrease below zero.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        category: ProductCategory,
        id: ProductId,
        method: StockAdjustment,
        quantity: i32,
    ) -> Result<i32, ServiceError> {
        if quantity <= 0 {
            return Err(PricingError::InvalidQuantity.into());
        }

        let mut uow = UnitOfWork::begin(self.pool).await?;
        let available = catalog::lock_stock(uow.conn(), id, category).await?;
        let delta = match method {
            StockAdjustment::Increase => quantity,
            StockAdjustment::Decrease => {
                ensure_stock(available, quantity)?;
                -quantity
            }
        };
        let stock = catalog::adjust_stock(uow.conn(), id, category, delta).await?;
        uow.commit().await?;
        Ok(stock)
    }
}

fn validate_name(name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::Invalid("product name is required".to_owned()));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), ServiceError> {
    if price.is_sign_negative() {
        return Err(ServiceError::Invalid("price cannot be negative".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Sunburn Goa").is_ok());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::new(-1, 0)).is_err());
    }
}
