//! Order and return state machines.
//!
//! ```text
//! pending ──► confirmed ──► delivered ──► return ──► refunded
//!    │            │             ▲            │
//!    └──► canceled ◄┘            └────────────┘ (return rejected)
//!
//! requested ──► approved ──► completed
//!     └───────► rejected
//! ```
//!
//! The functions here only decide; the caller persists the outcome inside
//! one transaction.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::{OrderStatus, PaymentMethod, PaymentStatus, ReturnStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("order cannot move from {from} to {to}")]
    Order { from: OrderStatus, to: OrderStatus },
    #[error("return cannot move from {from} to {to}")]
    Return { from: ReturnStatus, to: ReturnStatus },
    #[error("cancel window exceeded: order is {0}")]
    CancelWindowExceeded(OrderStatus),
    #[error("only delivered orders can be returned; order is {0}")]
    NotReturnable(OrderStatus),
    #[error("order payment is already settled ({0})")]
    PaymentSettled(PaymentStatus),
    #[error("order payment is {0}; gateway orders ship only once paid")]
    Unpaid(PaymentStatus),
}

impl OrderStatus {
    /// Orders can be canceled until they are delivered.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Canceled)
                | (Self::Confirmed, Self::Delivered | Self::Canceled)
                | (Self::Delivered, Self::Return)
                | (Self::Return, Self::Refunded | Self::Delivered)
        )
    }

    /// Statuses an admin may set directly; return states go through the
    /// return workflow instead.
    #[must_use]
    pub const fn is_admin_settable(self) -> bool {
        matches!(self, Self::Confirmed | Self::Delivered | Self::Canceled)
    }

    /// # Errors
    ///
    /// Returns [`TransitionError::Order`] if the edge is not in the graph.
    pub const fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError::Order {
                from: self,
                to: next,
            })
        }
    }
}

impl ReturnStatus {
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Approved | Self::Rejected) | (Self::Approved, Self::Completed)
        )
    }

    /// # Errors
    ///
    /// Returns [`TransitionError::Return`] if the edge is not in the graph.
    pub const fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError::Return {
                from: self,
                to: next,
            })
        }
    }
}

/// Order state after a cancellation, and what to credit back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cancellation {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Added to the wallet balance; zero when nothing was collected.
    pub wallet_credit: Decimal,
}

/// Decide the outcome of canceling an order.
///
/// # Errors
///
/// Returns [`TransitionError::CancelWindowExceeded`] unless the order is
/// pending or confirmed.
pub const fn cancel(
    status: OrderStatus,
    payment_status: PaymentStatus,
    total: Decimal,
) -> Result<Cancellation, TransitionError> {
    if !status.can_cancel() {
        return Err(TransitionError::CancelWindowExceeded(status));
    }

    let (payment_status, wallet_credit) = match payment_status {
        PaymentStatus::Successful => (PaymentStatus::Refund, total),
        other => (other, Decimal::ZERO),
    };

    Ok(Cancellation {
        status: OrderStatus::Canceled,
        payment_status,
        wallet_credit,
    })
}

/// Payment status after an admin moves an order to `next`.
///
/// Cash-on-delivery orders are paid on delivery.
#[must_use]
pub const fn payment_status_after(
    next: OrderStatus,
    method: PaymentMethod,
    current: PaymentStatus,
) -> PaymentStatus {
    match (next, method, current) {
        (OrderStatus::Delivered, PaymentMethod::Cod, PaymentStatus::Pending) => {
            PaymentStatus::Successful
        }
        _ => current,
    }
}

/// Check that an admin may move an order to `next` given its payment.
///
/// Gateway orders cannot be confirmed or delivered until the gateway payment
/// has succeeded.
///
/// # Errors
///
/// Returns [`TransitionError::Unpaid`] for an unpaid gateway order.
pub fn ensure_paid_for(
    next: OrderStatus,
    method: PaymentMethod,
    payment_status: PaymentStatus,
) -> Result<(), TransitionError> {
    let fulfils = matches!(next, OrderStatus::Confirmed | OrderStatus::Delivered);
    if fulfils && method == PaymentMethod::Razorpay && payment_status != PaymentStatus::Successful {
        return Err(TransitionError::Unpaid(payment_status));
    }
    Ok(())
}

/// Whether an order's stock left inventory.
///
/// COD and wallet orders take stock when placed; gateway orders only once
/// their payment succeeds.
#[must_use]
pub fn stock_taken(method: PaymentMethod, payment_status: PaymentStatus) -> bool {
    method != PaymentMethod::Razorpay || payment_status == PaymentStatus::Successful
}

/// Order state after a return refund is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReturnRefund {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub return_status: ReturnStatus,
    pub wallet_credit: Decimal,
}

/// Decide the outcome of refunding an approved return.
///
/// Only money that was collected goes back: an order whose payment never
/// succeeded completes its return with nothing credited.
///
/// # Errors
///
/// Fails unless the order is in `return` and the return is `approved`.
pub fn refund_return(
    status: OrderStatus,
    return_status: ReturnStatus,
    payment_status: PaymentStatus,
    refunded_amount: Decimal,
) -> Result<ReturnRefund, TransitionError> {
    let status = status.transition(OrderStatus::Refunded)?;
    let return_status = return_status.transition(ReturnStatus::Completed)?;

    let (payment_status, wallet_credit) = match payment_status {
        PaymentStatus::Successful => (PaymentStatus::Refund, refunded_amount),
        other => (other, Decimal::ZERO),
    };

    Ok(ReturnRefund {
        status,
        payment_status,
        return_status,
        wallet_credit,
    })
}

/// Check that a gateway order is still waiting for its payment result.
///
/// # Errors
///
/// Returns [`TransitionError::PaymentSettled`] for any status but pending.
pub const fn ensure_awaiting_payment(payment_status: PaymentStatus) -> Result<(), TransitionError> {
    match payment_status {
        PaymentStatus::Pending => Ok(()),
        other => Err(TransitionError::PaymentSettled(other)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_window() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Confirmed.can_cancel());
        for status in [
            OrderStatus::Delivered,
            OrderStatus::Canceled,
            OrderStatus::Return,
            OrderStatus::Refunded,
        ] {
            assert_eq!(
                cancel(status, PaymentStatus::Successful, Decimal::from(10)),
                Err(TransitionError::CancelWindowExceeded(status))
            );
        }
    }

    #[test]
    fn test_cancel_paid_order_credits_wallet() {
        let outcome = cancel(
            OrderStatus::Confirmed,
            PaymentStatus::Successful,
            Decimal::from(180),
        )
        .unwrap();

        assert_eq!(outcome.status, OrderStatus::Canceled);
        assert_eq!(outcome.payment_status, PaymentStatus::Refund);
        assert_eq!(outcome.wallet_credit, Decimal::from(180));
    }

    #[test]
    fn test_cancel_unpaid_order_credits_nothing() {
        let outcome = cancel(OrderStatus::Pending, PaymentStatus::Pending, Decimal::from(180)).unwrap();
        assert_eq!(outcome.payment_status, PaymentStatus::Pending);
        assert_eq!(outcome.wallet_credit, Decimal::ZERO);
    }

    #[test]
    fn test_order_transitions() {
        assert_eq!(
            OrderStatus::Pending.transition(OrderStatus::Confirmed),
            Ok(OrderStatus::Confirmed)
        );
        assert_eq!(
            OrderStatus::Confirmed.transition(OrderStatus::Delivered),
            Ok(OrderStatus::Delivered)
        );
        assert!(OrderStatus::Pending.transition(OrderStatus::Delivered).is_err());
        assert!(OrderStatus::Canceled.transition(OrderStatus::Confirmed).is_err());
        assert!(OrderStatus::Refunded.transition(OrderStatus::Return).is_err());
    }

    #[test]
    fn test_admin_settable() {
        assert!(OrderStatus::Delivered.is_admin_settable());
        assert!(!OrderStatus::Return.is_admin_settable());
        assert!(!OrderStatus::Refunded.is_admin_settable());
        assert!(!OrderStatus::Pending.is_admin_settable());
    }

    #[test]
    fn test_return_transitions() {
        assert!(ReturnStatus::Requested.can_transition_to(ReturnStatus::Approved));
        assert!(ReturnStatus::Requested.can_transition_to(ReturnStatus::Rejected));
        assert!(ReturnStatus::Approved.can_transition_to(ReturnStatus::Completed));
        assert!(!ReturnStatus::Requested.can_transition_to(ReturnStatus::Completed));
        assert!(!ReturnStatus::Rejected.can_transition_to(ReturnStatus::Approved));
    }

    #[test]
    fn test_refund_return() {
        let outcome = refund_return(
            OrderStatus::Return,
            ReturnStatus::Approved,
            PaymentStatus::Successful,
            Decimal::from(500),
        )
        .unwrap();
        assert_eq!(outcome.status, OrderStatus::Refunded);
        assert_eq!(outcome.return_status, ReturnStatus::Completed);
        assert_eq!(outcome.payment_status, PaymentStatus::Refund);
        assert_eq!(outcome.wallet_credit, Decimal::from(500));

        let paid = PaymentStatus::Successful;
        assert!(refund_return(OrderStatus::Return, ReturnStatus::Requested, paid, Decimal::ONE).is_err());
        assert!(refund_return(OrderStatus::Delivered, ReturnStatus::Approved, paid, Decimal::ONE).is_err());
    }

    #[test]
    fn test_refund_return_credits_only_collected_payment() {
        let outcome = refund_return(
            OrderStatus::Return,
            ReturnStatus::Approved,
            PaymentStatus::Pending,
            Decimal::from(200),
        )
        .unwrap();
        assert_eq!(outcome.status, OrderStatus::Refunded);
        assert_eq!(outcome.payment_status, PaymentStatus::Pending);
        assert_eq!(outcome.wallet_credit, Decimal::ZERO);
    }

    #[test]
    fn test_unpaid_gateway_order_cannot_ship() {
        for next in [OrderStatus::Confirmed, OrderStatus::Delivered] {
            assert_eq!(
                ensure_paid_for(next, PaymentMethod::Razorpay, PaymentStatus::Pending),
                Err(TransitionError::Unpaid(PaymentStatus::Pending))
            );
            assert_eq!(
                ensure_paid_for(next, PaymentMethod::Razorpay, PaymentStatus::Failed),
                Err(TransitionError::Unpaid(PaymentStatus::Failed))
            );
            assert!(ensure_paid_for(next, PaymentMethod::Razorpay, PaymentStatus::Successful).is_ok());
            assert!(ensure_paid_for(next, PaymentMethod::Cod, PaymentStatus::Pending).is_ok());
        }
        assert!(
            ensure_paid_for(OrderStatus::Canceled, PaymentMethod::Razorpay, PaymentStatus::Pending)
                .is_ok()
        );
    }

    #[test]
    fn test_stock_taken() {
        assert!(stock_taken(PaymentMethod::Cod, PaymentStatus::Pending));
        assert!(stock_taken(PaymentMethod::Wallet, PaymentStatus::Successful));
        assert!(stock_taken(PaymentMethod::Razorpay, PaymentStatus::Successful));
        assert!(!stock_taken(PaymentMethod::Razorpay, PaymentStatus::Pending));
        assert!(!stock_taken(PaymentMethod::Razorpay, PaymentStatus::Failed));
    }

    #[test]
    fn test_cod_paid_on_delivery() {
        assert_eq!(
            payment_status_after(OrderStatus::Delivered, PaymentMethod::Cod, PaymentStatus::Pending),
            PaymentStatus::Successful
        );
        assert_eq!(
            payment_status_after(
                OrderStatus::Confirmed,
                PaymentMethod::Cod,
                PaymentStatus::Pending
            ),
            PaymentStatus::Pending
        );
        assert_eq!(
            payment_status_after(
                OrderStatus::Delivered,
                PaymentMethod::Razorpay,
                PaymentStatus::Failed
            ),
            PaymentStatus::Failed
        );
    }

    #[test]
    fn test_awaiting_payment() {
        assert!(ensure_awaiting_payment(PaymentStatus::Pending).is_ok());
        assert_eq!(
            ensure_awaiting_payment(PaymentStatus::Successful),
            Err(TransitionError::PaymentSettled(PaymentStatus::Successful))
        );
    }
}
