//! Cart-to-order conversion and gateway payment verification.
//!
//! Checkout locks, in order: the cart, the account wallet, inventory rows
//! sorted by `(category, product_id)`, then the coupon row (through its
//! conditional update). A fixed lock order keeps two concurrent checkouts
//! from deadlocking on shared products. No lock is held across a gateway
//! call.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use festiv_core::lifecycle::ensure_awaiting_payment;
use festiv_core::pricing::{CartTotals, checkout_total, ensure_stock, ensure_wallet_covers};
use festiv_core::{
    AccountId, AddressId, OrderStatus, PaymentMethod, PaymentStatus, PricingError,
    ProductCategory, ProductId,
};

use super::ServiceError;
use super::razorpay::RazorpayClient;
use crate::db::orders::{NewInvoice, NewOrder};
use crate::db::{UnitOfWork, accounts, carts, catalog, orders, promotions};
use crate::models::cart::{Cart, CartItem};
use crate::models::order::{Invoice, Order, OrderItem, Placement};

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    gateway: &'a RazorpayClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, gateway: &'a RazorpayClient) -> Self {
        Self { pool, gateway }
    }

    /// Turn the caller's cart into an order.
    ///
    /// COD and wallet orders are complete on return: stock is taken, the
    /// coupon is redeemed, an invoice is written, and the cart is emptied.
    /// Gateway orders only record the order and its lines; the rest happens in
    /// [`Self::verify_payment`].
    ///
    /// # Errors
    ///
    /// Returns `PricingError::EmptyCart`, `PricingError::InsufficientFunds`,
    /// `PricingError::InsufficientStock`, or `PricingError::CouponExhausted`
    /// when a rule fails, `ServiceError::NotFound` for an address the caller
    /// does not own, and `ServiceError::Gateway` if the gateway refuses the
    /// order. Nothing is written on failure.
    #[instrument(skip(self))]
    pub async fn place_order(
        &self,
        account_id: AccountId,
        address_id: AddressId,
        payment_method: PaymentMethod,
    ) -> Result<Placement, ServiceError> {
        if payment_method == PaymentMethod::Razorpay {
            return self.place_gateway_order(account_id, address_id).await;
        }

        let mut uow = UnitOfWork::begin(self.pool).await?;

        let cart = carts::lock_or_create(uow.conn(), account_id).await?;
        let items = carts::items(uow.conn(), cart.id).await?;
        if items.is_empty() {
            return Err(PricingError::EmptyCart.into());
        }

        let address = accounts::find_address(uow.conn(), account_id, address_id)
            .await?
            .ok_or(ServiceError::NotFound("address"))?;

        let total = checkout_total(cart.total_price, cart.offer_price);
        let coupon_code = applied_coupon(&cart);

        if payment_method == PaymentMethod::Wallet {
            let balance = accounts::lock_wallet(uow.conn(), account_id).await?;
            ensure_wallet_covers(balance, total)?;
            accounts::debit_wallet(uow.conn(), account_id, total)
                .await?
                .ok_or(PricingError::InsufficientFunds {
                    balance,
                    required: total,
                })?;
        }

        let order = orders::insert(
            uow.conn(),
            &NewOrder {
                account_id,
                address_id: address.id,
                total,
                coupon_code,
                payment_method,
                payment_status: payment_method.initial_payment_status(),
                gateway_order_id: None,
            },
        )
        .await?;
        orders::insert_items(uow.conn(), order.id, &items).await?;

        take_stock(uow.conn(), &cart_lines(&items)).await?;
        if let Some(code) = coupon_code {
            redeem(uow.conn(), code).await?;
        }

        let totals = CartTotals::from_lines(&items);
        let remark = match payment_method {
            PaymentMethod::Wallet => "paid from wallet",
            _ => "payable on delivery",
        };
        let invoice = orders::insert_invoice(
            uow.conn(),
            &order,
            &NewInvoice {
                address_type: &address.address_type,
                quantity: totals.item_count(),
                payment_id: None,
                remark,
            },
        )
        .await?;

        carts::clear(uow.conn(), cart.id).await?;
        uow.commit().await?;

        tracing::info!(order_id = %order.id, %total, method = %payment_method, "Order placed");
        Ok(Placement::Placed { order, invoice })
    }

    /// Record a gateway order for the cart.
    ///
    /// The gateway call happens before any row is locked. The cart is then
    /// locked and re-priced; if it changed in the meantime the placement is
    /// refused and the unused gateway order simply expires.
    async fn place_gateway_order(
        &self,
        account_id: AccountId,
        address_id: AddressId,
    ) -> Result<Placement, ServiceError> {
        let quoted = carts::find_for_account(self.pool, account_id)
            .await?
            .ok_or(PricingError::EmptyCart)?;
        if carts::items(self.pool, quoted.id).await?.is_empty() {
            return Err(PricingError::EmptyCart.into());
        }
        accounts::find_address(self.pool, account_id, address_id)
            .await?
            .ok_or(ServiceError::NotFound("address"))?;

        let quoted_total = checkout_total(quoted.total_price, quoted.offer_price);
        let gateway_order = self
            .gateway
            .create_order(quoted_total, &quoted.id.to_string())
            .await?;

        let mut uow = UnitOfWork::begin(self.pool).await?;
        let cart = carts::lock_or_create(uow.conn(), account_id).await?;
        let items = carts::items(uow.conn(), cart.id).await?;
        if items.is_empty() {
            return Err(PricingError::EmptyCart.into());
        }
        let total = checkout_total(cart.total_price, cart.offer_price);
        ensure_quote_holds(quoted_total, total)?;
        let address = accounts::find_address(uow.conn(), account_id, address_id)
            .await?
            .ok_or(ServiceError::NotFound("address"))?;

        if let Some(shortage) = find_shortage(uow.conn(), &cart_lines(&items)).await? {
            return Err(shortage.into());
        }

        let order = orders::insert(
            uow.conn(),
            &NewOrder {
                account_id,
                address_id: address.id,
                total,
                coupon_code: applied_coupon(&cart),
                payment_method: PaymentMethod::Razorpay,
                payment_status: PaymentStatus::Pending,
                gateway_order_id: Some(&gateway_order.id),
            },
        )
        .await?;
        orders::insert_items(uow.conn(), order.id, &items).await?;
        uow.commit().await?;

        tracing::info!(
            order_id = %order.id,
            gateway_order_id = %gateway_order.id,
            "Order awaiting gateway payment"
        );
        Ok(Placement::AwaitingPayment {
            order,
            gateway_order_id: gateway_order.id,
            amount_minor: gateway_order.amount,
            currency: gateway_order.currency,
            key_id: self.gateway.key_id().to_owned(),
        })
    }

    /// Settle a gateway order from the signature the browser posts back.
    ///
    /// A bad signature marks the payment `failed` (the order is kept) and
    /// returns `GatewayError::InvalidSignature`. A good signature on an order
    /// that can no longer be fulfilled, because it was canceled or its stock
    /// ran out, still records the payment: the order is canceled, the amount
    /// is credited to the wallet, and `ServiceError::PaymentCredited` is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the caller has no order with this
    /// gateway id and `TransitionError::PaymentSettled` if it was already
    /// settled.
    #[instrument(skip(self, signature))]
    pub async fn verify_payment(
        &self,
        account_id: AccountId,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(Order, Invoice), ServiceError> {
        let mut uow = UnitOfWork::begin(self.pool).await?;

        let order = orders::lock_by_gateway_id(uow.conn(), gateway_order_id).await?;
        if order.account_id != account_id {
            return Err(ServiceError::NotFound("order"));
        }
        ensure_awaiting_payment(order.payment_status)?;

        if let Err(e) = self
            .gateway
            .verify_signature(gateway_order_id, payment_id, signature)
        {
            orders::update_status(uow.conn(), order.id, order.status, PaymentStatus::Failed)
                .await?;
            uow.commit().await?;
            tracing::warn!(order_id = %order.id, "Payment signature rejected");
            return Err(e.into());
        }

        let cart = carts::lock_or_create(uow.conn(), account_id).await?;
        let items = orders::items(uow.conn(), order.id).await?;
        let lines = order_lines(&items);
        let address_type = accounts::address_type(uow.conn(), order.address_id).await?;
        let quantity = CartTotals::from_lines(&items).item_count();

        let unfulfillable = if order.status.can_cancel() {
            find_shortage(uow.conn(), &lines)
                .await?
                .map(|shortage| shortage.to_string())
        } else {
            Some(format!("order is {}", order.status))
        };

        if let Some(reason) = unfulfillable {
            accounts::credit_wallet(uow.conn(), account_id, order.total).await?;
            let order = orders::update_status(
                uow.conn(),
                order.id,
                OrderStatus::Canceled,
                PaymentStatus::Refund,
            )
            .await?;
            orders::insert_invoice(
                uow.conn(),
                &order,
                &NewInvoice {
                    address_type: &address_type,
                    quantity,
                    payment_id: Some(payment_id),
                    remark: "paid via razorpay, credited to wallet",
                },
            )
            .await?;
            uow.commit().await?;

            tracing::warn!(
                order_id = %order.id,
                payment_id,
                %reason,
                "Gateway payment credited to wallet"
            );
            return Err(ServiceError::PaymentCredited(reason));
        }

        let order =
            orders::update_status(uow.conn(), order.id, order.status, PaymentStatus::Successful)
                .await?;
        remove_stock(uow.conn(), &lines).await?;
        if let Some(code) = order.coupon_code.as_deref() {
            // The discount is already in the captured amount.
            if !promotions::redeem_coupon(uow.conn(), code).await? {
                tracing::warn!(order_id = %order.id, code, "Coupon exhausted before payment settled");
            }
        }

        let invoice = orders::insert_invoice(
            uow.conn(),
            &order,
            &NewInvoice {
                address_type: &address_type,
                quantity,
                payment_id: Some(payment_id),
                remark: "paid via razorpay",
            },
        )
        .await?;

        carts::clear(uow.conn(), cart.id).await?;
        uow.commit().await?;

        tracing::info!(order_id = %order.id, payment_id, "Gateway payment settled");
        Ok((order, invoice))
    }
}

/// The cart must still cost what the gateway order was created for.
fn ensure_quote_holds(quoted: Decimal, current: Decimal) -> Result<(), ServiceError> {
    if quoted == current {
        Ok(())
    } else {
        Err(ServiceError::Invalid(
            "cart changed during checkout; please try again".to_owned(),
        ))
    }
}

/// One inventory movement: category, product, quantity.
pub(crate) type StockLine = (ProductCategory, ProductId, i32);

/// Lines in inventory lock order.
fn sorted(mut lines: Vec<StockLine>) -> Vec<StockLine> {
    lines.sort_by_key(|(category, product_id, _)| (category.as_str(), *product_id));
    lines
}

fn cart_lines(items: &[CartItem]) -> Vec<StockLine> {
    sorted(items.iter().map(|i| (i.category, i.product_id, i.quantity)).collect())
}

pub(crate) fn order_lines(items: &[OrderItem]) -> Vec<StockLine> {
    sorted(items.iter().map(|i| (i.category, i.product_id, i.quantity)).collect())
}

/// The coupon that produced the cart's discount, if any.
fn applied_coupon(cart: &Cart) -> Option<&str> {
    cart.coupon_code.as_deref().filter(|_| !cart.offer_price.is_zero())
}

/// Lock the inventory rows for `lines` and report the first one that lacks
/// stock.
async fn find_shortage(
    conn: &mut PgConnection,
    lines: &[StockLine],
) -> Result<Option<PricingError>, ServiceError> {
    for &(category, product_id, quantity) in lines {
        let available = catalog::lock_stock(&mut *conn, product_id, category).await?;
        if let Err(shortage) = ensure_stock(available, quantity) {
            return Ok(Some(shortage));
        }
    }
    Ok(None)
}

async fn remove_stock(conn: &mut PgConnection, lines: &[StockLine]) -> Result<(), ServiceError> {
    for &(category, product_id, quantity) in lines {
        catalog::adjust_stock(&mut *conn, product_id, category, -quantity).await?;
    }
    Ok(())
}

/// Decrement inventory for each line, failing the whole unit of work on the
/// first line that lacks stock.
async fn take_stock(conn: &mut PgConnection, lines: &[StockLine]) -> Result<(), ServiceError> {
    if let Some(shortage) = find_shortage(&mut *conn, lines).await? {
        return Err(shortage.into());
    }
    remove_stock(conn, lines).await
}

/// Put stock back for canceled or returned lines.
pub(crate) async fn restock(conn: &mut PgConnection, lines: &[StockLine]) -> Result<(), ServiceError> {
    for &(category, product_id, quantity) in lines {
        catalog::adjust_stock(&mut *conn, product_id, category, quantity).await?;
    }
    Ok(())
}

async fn redeem(conn: &mut PgConnection, code: &str) -> Result<(), ServiceError> {
    if promotions::redeem_coupon(conn, code).await? {
        Ok(())
    } else {
        Err(PricingError::CouponExhausted.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_must_match_locked_cart() {
        assert!(ensure_quote_holds(Decimal::from(180), Decimal::from(180)).is_ok());
        assert!(matches!(
            ensure_quote_holds(Decimal::from(180), Decimal::from(200)),
            Err(ServiceError::Invalid(_))
        ));
    }

    #[test]
    fn test_stock_lines_follow_lock_order() {
        let lines = sorted(vec![
            (ProductCategory::Ticket, ProductId::new(2), 1),
            (ProductCategory::Apparel, ProductId::new(9), 3),
            (ProductCategory::Ticket, ProductId::new(1), 2),
        ]);
        assert_eq!(
            lines,
            vec![
                (ProductCategory::Apparel, ProductId::new(9), 3),
                (ProductCategory::Ticket, ProductId::new(1), 2),
                (ProductCategory::Ticket, ProductId::new(2), 1),
            ]
        );
    }
}
