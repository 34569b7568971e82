//! Order, invoice, and return models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use festiv_core::pricing::PricedLine;
use festiv_core::{
    AccountId, AddressId, InvoiceId, OrderId, OrderItemId, OrderStatus, PaymentMethod,
    PaymentStatus, ProductCategory, ProductId, ReturnId, ReturnStatus,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub address_id: AddressId,
    pub total: Decimal,
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Razorpay order id for gateway checkouts.
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of a cart line at checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub category: ProductCategory,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl PricedLine for OrderItem {
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

/// Receipt generated once an order is paid for (or placed, for COD).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: InvoiceId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub address_type: String,
    pub quantity: i32,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReturnRequest {
    pub id: ReturnId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub reason: String,
    pub status: ReturnStatus,
    pub refund_method: Option<String>,
    pub refunded_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Result of placing an order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// COD and wallet orders are complete when this is returned.
    Placed { order: Order, invoice: Invoice },
    /// Gateway orders wait for the client to pay and call verification.
    AwaitingPayment {
        order: Order,
        gateway_order_id: String,
        /// Amount in the currency's minor unit (paise).
        amount_minor: i64,
        currency: String,
        key_id: String,
    },
}
