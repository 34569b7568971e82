//! Cart, wishlist, and promotion models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use festiv_core::pricing::{CouponTerms, PricedLine};
use festiv_core::{
    AccountId, CartId, CartItemId, CouponId, DiscountType, OfferId, ProductCategory, ProductId,
    WishlistEntryId,
};

/// A shopper's cart and its cached aggregates.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Cart {
    pub id: CartId,
    pub account_id: AccountId,
    pub total_price: Decimal,
    /// Discount from the applied coupon; zero when none is applied.
    pub offer_price: Decimal,
    pub coupon_code: Option<String>,
    pub ticket_quantity: i32,
    pub apparel_quantity: i32,
    pub updated_at: DateTime<Utc>,
}

/// A cart line with the unit price captured when it was added.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub category: ProductCategory,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl PricedLine for CartItem {
    fn category(&self) -> ProductCategory {
        self.category
    }

    fn quantity(&self) -> i32 {
        self.quantity
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WishlistEntry {
    pub id: WishlistEntryId,
    pub account_id: AccountId,
    pub product_id: ProductId,
    pub category: ProductCategory,
    pub product_name: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A discount code scoped to one product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub amount: Decimal,
    pub category: ProductCategory,
    pub usage_limit: i32,
    pub used_count: i32,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    #[must_use]
    pub fn terms(&self) -> CouponTerms {
        CouponTerms {
            discount_type: self.discount_type,
            amount: self.amount,
            category: self.category,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            valid_until: self.valid_until,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub amount: Decimal,
    pub category: ProductCategory,
    pub usage_limit: i32,
    pub valid_until: DateTime<Utc>,
}

/// A price-threshold promotion shown to carts above `min_price`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Offer {
    pub id: OfferId,
    pub name: String,
    pub min_price: Decimal,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOffer {
    pub name: String,
    pub min_price: Decimal,
    pub amount: Decimal,
}

/// Cart with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub items: Vec<CartItem>,
    /// `total_price - offer_price`.
    pub payable: Decimal,
}
