//! Catalog models: tickets and apparels.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use festiv_core::{AdminId, ProductCategory, ProductId};

/// A ticket or apparel listing.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category: ProductCategory,
    pub name: String,
    pub price: Decimal,
    pub image_url: String,
    /// Event type for tickets, garment type for apparels.
    pub subcategory: String,
    /// Ticket only.
    pub event_date: Option<NaiveDate>,
    /// Ticket only.
    pub location: Option<String>,
    pub removed: bool,
    pub admin_id: AdminId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Long-form detail record, one per product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductDetail {
    pub product_id: ProductId,
    pub description: String,
    pub venue: Option<String>,
}

/// Stock counter for a product.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct Inventory {
    pub product_id: ProductId,
    pub category: ProductCategory,
    pub quantity: i32,
}

/// Product page: listing, details, and current stock.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub description: String,
    pub venue: Option<String>,
    pub stock: i32,
}

/// Admin input for a new ticket or apparel.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub subcategory: String,
    pub event_date: Option<NaiveDate>,
    pub location: Option<String>,
    #[serde(default)]
    pub description: String,
    pub venue: Option<String>,
    #[serde(default)]
    pub stock: i32,
}

/// Admin partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub subcategory: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub venue: Option<String>,
}

/// Direction of an inventory adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAdjustment {
    Increase,
    Decrease,
}
