//! Admin user management and promotions.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use festiv_core::{AccountId, DiscountType, Pagination, PricingError};

use super::ServiceError;
use crate::db::{accounts, promotions};
use crate::models::Account;
use crate::models::cart::{Coupon, NewCoupon, NewOffer, Offer};

/// How an admin looks up users.
#[derive(Debug, Clone)]
pub enum UserLookup {
    Id(AccountId),
    NamePrefix(String),
}

/// Admin service.
pub struct AdminService<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Users, newest first, optionally only active (`true`) or blocked.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn users(
        &self,
        permission: Option<bool>,
        page: Pagination,
    ) -> Result<Vec<Account>, ServiceError> {
        Ok(accounts::list(self.pool, permission, page).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for an empty name.
    pub async fn search_users(
        &self,
        lookup: UserLookup,
        page: Pagination,
    ) -> Result<Vec<Account>, ServiceError> {
        match lookup {
            UserLookup::Id(id) => Ok(accounts::find_by_id(self.pool, id)
                .await?
                .into_iter()
                .collect()),
            UserLookup::NamePrefix(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ServiceError::Invalid("name is empty".to_owned()));
                }
                Ok(accounts::search_by_name(self.pool, name, page).await?)
            }
        }
    }

    /// Block an active user or unblock a blocked one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn toggle_permission(&self, id: AccountId) -> Result<Account, ServiceError> {
        let account = accounts::toggle_permission(self.pool, id).await?;
        tracing::info!(account_id = %account.id, permission = account.permission, "User permission changed");
        Ok(account)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` or `PricingError::InvalidPercentage`
    /// for bad terms and `RepositoryError::Conflict` for a duplicate code.
    #[instrument(skip(self, new), fields(code = %new.code))]
    pub async fn create_coupon(&self, new: &NewCoupon) -> Result<Coupon, ServiceError> {
        let code = new.code.trim();
        if code.is_empty() {
            return Err(ServiceError::Invalid("coupon code is required".to_owned()));
        }
        if new.amount <= Decimal::ZERO {
            return Err(ServiceError::Invalid("coupon amount must be positive".to_owned()));
        }
        if new.discount_type == DiscountType::Percentage && new.amount > Decimal::ONE_HUNDRED {
            return Err(PricingError::InvalidPercentage.into());
        }
        if new.usage_limit <= 0 {
            return Err(ServiceError::Invalid("usage limit must be positive".to_owned()));
        }
        if new.valid_until <= Utc::now() {
            return Err(ServiceError::Invalid("coupon expiry must be in the future".to_owned()));
        }

        let new = NewCoupon {
            code: code.to_owned(),
            ..new.clone()
        };
        Ok(promotions::create_coupon(self.pool, &new).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a blank name or negative amounts.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_offer(&self, new: &NewOffer) -> Result<Offer, ServiceError> {
        if new.name.trim().is_empty() {
            return Err(ServiceError::Invalid("offer name is required".to_owned()));
        }
        if new.amount <= Decimal::ZERO || new.min_price.is_sign_negative() {
            return Err(ServiceError::Invalid(
                "offer amount must be positive and minimum price non-negative".to_owned(),
            ));
        }
        Ok(promotions::create_offer(self.pool, new).await?)
    }
}
