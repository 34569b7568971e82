//! Order history, cancellation, returns, and refunds.
//!
//! Wallet credits from cancellations and refunds are added to the current
//! balance inside the same unit of work that moves the order.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use festiv_core::lifecycle::{self, Cancellation};
use festiv_core::{
    AccountId, OrderId, OrderStatus, Pagination, ReturnId, ReturnStatus, TransitionError,
};

use super::ServiceError;
use super::checkout::{order_lines, restock};
use crate::db::{UnitOfWork, accounts, orders};
use crate::models::order::{Order, OrderView, ReturnRequest};

/// Refund method recorded on approved returns.
const REFUND_METHOD_WALLET: &str = "wallet";

/// Outcome of an admin refund.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Refund {
    pub order: Order,
    pub wallet_credit: Decimal,
    /// Present when the refund completed a return.
    pub return_request: Option<ReturnRequest>,
}

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The caller's orders with their lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn history(
        &self,
        account_id: AccountId,
        page: Pagination,
    ) -> Result<Vec<OrderView>, ServiceError> {
        let list = orders::list_for_account(self.pool, account_id, page).await?;
        self.with_items(list).await
    }

    /// Orders in one status (or all), for admins.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn list_by_status(
        &self,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> Result<Vec<OrderView>, ServiceError> {
        let list = orders::list_by_status(self.pool, status, page).await?;
        self.with_items(list).await
    }

    /// Cancel one of the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the caller has no such order and
    /// `TransitionError::CancelWindowExceeded` once it is delivered.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        account_id: AccountId,
        order_id: OrderId,
    ) -> Result<Order, ServiceError> {
        let mut uow = UnitOfWork::begin(self.pool).await?;
        let order = orders::lock(uow.conn(), order_id, Some(account_id)).await?;
        let (order, _) = cancel_locked(uow.conn(), &order).await?;
        uow.commit().await?;
        Ok(order)
    }

    /// Ask to return a delivered order.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::NotReturnable` unless the order is delivered
    /// and `RepositoryError::Conflict` if a return was already filed.
    #[instrument(skip(self, reason))]
    pub async fn request_return(
        &self,
        account_id: AccountId,
        order_id: OrderId,
        reason: &str,
    ) -> Result<ReturnRequest, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::Invalid("a return reason is required".to_owned()));
        }

        let mut uow = UnitOfWork::begin(self.pool).await?;
        let order = orders::lock(uow.conn(), order_id, Some(account_id)).await?;
        if order.status != OrderStatus::Delivered {
            return Err(TransitionError::NotReturnable(order.status).into());
        }

        let next = order.status.transition(OrderStatus::Return)?;
        orders::update_status(uow.conn(), order.id, next, order.payment_status).await?;
        let request = orders::insert_return(uow.conn(), &order, reason).await?;
        uow.commit().await?;

        tracing::info!(order_id = %order.id, return_id = %request.id, "Return requested");
        Ok(request)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Move an order along the fulfillment graph.
    ///
    /// Only `confirmed`, `delivered`, and `canceled` can be set directly;
    /// canceling here follows the same wallet and restock rules as a shopper
    /// cancellation. Gateway orders ship only once their payment succeeded.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a status that is not directly
    /// settable, `TransitionError::Unpaid` for an unpaid gateway order, and
    /// `TransitionError::Order` for an edge not in the graph.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, ServiceError> {
        if !next.is_admin_settable() {
            return Err(ServiceError::Invalid(format!(
                "order status {next} cannot be set directly"
            )));
        }

        let mut uow = UnitOfWork::begin(self.pool).await?;
        let order = orders::lock(uow.conn(), order_id, None).await?;

        let order = if next == OrderStatus::Canceled {
            cancel_locked(uow.conn(), &order).await?.0
        } else {
            lifecycle::ensure_paid_for(next, order.payment_method, order.payment_status)?;
            let status = order.status.transition(next)?;
            let payment_status =
                lifecycle::payment_status_after(status, order.payment_method, order.payment_status);
            orders::update_status(uow.conn(), order.id, status, payment_status).await?
        };
        uow.commit().await?;

        tracing::info!(order_id = %order.id, status = %order.status, "Order status updated");
        Ok(order)
    }

    /// Approve or reject a return request.
    ///
    /// Approval records a wallet refund of the order total; rejection moves
    /// the order back to `delivered`.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Return` unless the request is `requested`
    /// and `next` is `approved` or `rejected`.
    #[instrument(skip(self))]
    pub async fn review_return(
        &self,
        return_id: ReturnId,
        next: ReturnStatus,
    ) -> Result<ReturnRequest, ServiceError> {
        let mut uow = UnitOfWork::begin(self.pool).await?;
        let request = orders::lock_return(uow.conn(), return_id).await?;

        if !matches!(next, ReturnStatus::Approved | ReturnStatus::Rejected) {
            return Err(TransitionError::Return {
                from: request.status,
                to: next,
            }
            .into());
        }
        let status = request.status.transition(next)?;

        let order = orders::lock(uow.conn(), request.order_id, None).await?;
        let request = if status == ReturnStatus::Approved {
            orders::update_return(
                uow.conn(),
                request.id,
                status,
                Some(REFUND_METHOD_WALLET),
                Some(order.total),
            )
            .await?
        } else {
            let back = order.status.transition(OrderStatus::Delivered)?;
            orders::update_status(uow.conn(), order.id, back, order.payment_status).await?;
            orders::update_return(uow.conn(), request.id, status, None, None).await?
        };
        uow.commit().await?;

        tracing::info!(return_id = %request.id, status = %request.status, "Return reviewed");
        Ok(request)
    }

    /// Refund an order to the shopper's wallet.
    ///
    /// An order in `return` with an approved return is refunded and the return
    /// completed; only a collected payment is credited and only stock that
    /// was taken goes back. Any other order is canceled under the
    /// cancellation rules.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` when neither path applies.
    #[instrument(skip(self))]
    pub async fn refund(&self, order_id: OrderId) -> Result<Refund, ServiceError> {
        let mut uow = UnitOfWork::begin(self.pool).await?;
        let order = orders::lock(uow.conn(), order_id, None).await?;

        let refund = if order.status == OrderStatus::Return {
            let request = orders::lock_return_for_order(uow.conn(), order.id)
                .await?
                .ok_or(ServiceError::NotFound("return request"))?;
            let amount = request.refunded_amount.unwrap_or(order.total);
            let outcome = lifecycle::refund_return(
                order.status,
                request.status,
                order.payment_status,
                amount,
            )?;

            if !outcome.wallet_credit.is_zero() {
                accounts::credit_wallet(uow.conn(), order.account_id, outcome.wallet_credit)
                    .await?;
            }
            if lifecycle::stock_taken(order.payment_method, order.payment_status) {
                let items = orders::items(uow.conn(), order.id).await?;
                restock(uow.conn(), &order_lines(&items)).await?;
            }
            let updated = orders::update_status(
                uow.conn(),
                order.id,
                outcome.status,
                outcome.payment_status,
            )
            .await?;
            let request = orders::update_return(
                uow.conn(),
                request.id,
                outcome.return_status,
                None,
                None,
            )
            .await?;

            Refund {
                order: updated,
                wallet_credit: outcome.wallet_credit,
                return_request: Some(request),
            }
        } else {
            let (updated, cancellation) = cancel_locked(uow.conn(), &order).await?;
            Refund {
                order: updated,
                wallet_credit: cancellation.wallet_credit,
                return_request: None,
            }
        };
        uow.commit().await?;

        tracing::info!(
            order_id = %refund.order.id,
            wallet_credit = %refund.wallet_credit,
            "Order refunded"
        );
        Ok(refund)
    }

    async fn with_items(&self, list: Vec<Order>) -> Result<Vec<OrderView>, ServiceError> {
        let ids: Vec<OrderId> = list.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<OrderId, Vec<_>> = HashMap::new();
        for item in orders::items_for_orders(self.pool, &ids).await? {
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(list
            .into_iter()
            .map(|order| OrderView {
                items: items_by_order.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }
}

/// Cancel a locked order: credit the wallet if it was paid, put its stock
/// back, and persist the new status.
async fn cancel_locked(
    conn: &mut PgConnection,
    order: &Order,
) -> Result<(Order, Cancellation), ServiceError> {
    let cancellation = lifecycle::cancel(order.status, order.payment_status, order.total)?;

    if !cancellation.wallet_credit.is_zero() {
        accounts::credit_wallet(&mut *conn, order.account_id, cancellation.wallet_credit).await?;
    }

    if lifecycle::stock_taken(order.payment_method, order.payment_status) {
        let items = orders::items(&mut *conn, order.id).await?;
        restock(&mut *conn, &order_lines(&items)).await?;
    }

    let updated = orders::update_status(
        conn,
        order.id,
        cancellation.status,
        cancellation.payment_status,
    )
    .await?;

    tracing::info!(
        order_id = %order.id,
        wallet_credit = %cancellation.wallet_credit,
        "Order canceled"
    );
    Ok((updated, cancellation))
}
