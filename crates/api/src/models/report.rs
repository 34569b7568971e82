//! Admin dashboard and sales report models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use festiv_core::{PaymentMethod, ProductCategory};

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_users: i64,
    pub new_users_last_7_days: i64,
    pub active_products: i64,
    /// Category with the least stock across its products.
    pub lowest_stock_category: Option<ProductCategory>,
    pub total_orders: i64,
    pub average_order_value: Decimal,
    pub pending_orders: i64,
    pub return_orders: i64,
    /// Sum of all non-canceled orders.
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub category: Option<ProductCategory>,
    pub total_sales: Decimal,
    pub order_count: i64,
    pub average_order: Decimal,
    pub by_payment_method: Vec<PaymentMethodCount>,
}

#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct PaymentMethodCount {
    pub payment_method: PaymentMethod,
    pub orders: i64,
}
