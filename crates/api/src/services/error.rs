//! Errors raised by the shopping and administration services.

use thiserror::Error;

use festiv_core::{PricingError, TransitionError};

use super::razorpay::GatewayError;
use crate::db::RepositoryError;

/// Errors from the cart, catalog, checkout, order, and admin services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A pricing rule was violated (empty cart, stock, wallet, coupon).
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// An order or return cannot make the requested move.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Payment gateway failure or bad payment signature.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A referenced entity does not exist or is not visible to the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A verified gateway payment could not be fulfilled and was credited to
    /// the shopper's wallet instead.
    #[error("order could not be fulfilled ({0}); the payment was credited to your wallet")]
    PaymentCredited(String),

    /// Input that passed deserialization but is not acceptable.
    #[error("{0}")]
    Invalid(String),
}
