//! Cart arithmetic.
//!
//! The cart row caches its totals, but the cached values are never updated
//! incrementally: every mutation recomputes [`CartTotals`] from the surviving
//! line items, so the aggregate always equals the sum of the lines.

mod checkout;
mod coupon;

pub use checkout::{checkout_total, ensure_wallet_covers, ensure_stock};
pub use coupon::{CouponTerms, category_subtotal};

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::ProductCategory;

/// Business-rule violations raised by the pricing functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("quantity must be positive")]
    InvalidQuantity,
    #[error("cart is empty")]
    EmptyCart,
    #[error("no items in the cart match the coupon category {0}")]
    NoItemsInScope(ProductCategory),
    #[error("a discount is already applied to this cart")]
    DiscountAlreadyApplied,
    #[error("coupon has expired")]
    CouponExpired,
    #[error("coupon usage limit reached")]
    CouponExhausted,
    #[error("percentage coupon amount must be between 0 and 100")]
    InvalidPercentage,
    #[error("insufficient wallet balance: {balance} available, {required} required")]
    InsufficientFunds { balance: Decimal, required: Decimal },
    #[error("only {available} left in stock, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },
}

/// A priced cart or order line.
pub trait PricedLine {
    fn category(&self) -> ProductCategory;
    fn quantity(&self) -> i32;
    fn unit_price(&self) -> Decimal;

    /// `quantity × unit_price`.
    fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity())
    }
}

/// Aggregates cached on the cart row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CartTotals {
    pub total_price: Decimal,
    pub ticket_quantity: i32,
    pub apparel_quantity: i32,
}

impl CartTotals {
    /// Recompute totals from the current line items.
    pub fn from_lines<'a, L>(lines: impl IntoIterator<Item = &'a L>) -> Self
    where
        L: PricedLine + 'a,
    {
        lines.into_iter().fold(Self::default(), |mut totals, line| {
            totals.total_price += line.line_total();
            match line.category() {
                ProductCategory::Ticket => totals.ticket_quantity += line.quantity(),
                ProductCategory::Apparel => totals.apparel_quantity += line.quantity(),
            }
            totals
        })
    }

    #[must_use]
    pub const fn item_count(&self) -> i32 {
        self.ticket_quantity + self.apparel_quantity
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.item_count() == 0
    }
}

/// Quantity after adding `delta` units to a line holding `current`.
///
/// # Errors
///
/// Returns [`PricingError::InvalidQuantity`] unless `delta` is positive.
pub fn add_quantity(current: i32, delta: i32) -> Result<i32, PricingError> {
    if delta <= 0 {
        return Err(PricingError::InvalidQuantity);
    }
    current
        .checked_add(delta)
        .ok_or(PricingError::InvalidQuantity)
}

/// Quantity left after removing one unit, or `None` when the line should be
/// deleted.
#[must_use]
pub const fn decrement_quantity(current: i32) -> Option<i32> {
    if current > 1 { Some(current - 1) } else { None }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub struct Line {
        pub category: ProductCategory,
        pub quantity: i32,
        pub unit_price: Decimal,
    }

    impl PricedLine for Line {
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

    pub fn ticket(quantity: i32, price: i64) -> Line {
        Line {
            category: ProductCategory::Ticket,
            quantity,
            unit_price: Decimal::from(price),
        }
    }

    pub fn apparel(quantity: i32, price: i64) -> Line {
        Line {
            category: ProductCategory::Apparel,
            quantity,
            unit_price: Decimal::from(price),
        }
    }

    #[test]
    fn test_totals_single_ticket_line() {
        let lines = [ticket(2, 100)];
        let totals = CartTotals::from_lines(&lines);
        assert_eq!(totals.total_price, Decimal::from(200));
        assert_eq!(totals.ticket_quantity, 2);
        assert_eq!(totals.apparel_quantity, 0);
    }

    #[test]
    fn test_totals_mixed_lines() {
        let lines = [ticket(2, 100), apparel(3, 450), ticket(1, 1250)];
        let totals = CartTotals::from_lines(&lines);
        assert_eq!(totals.total_price, Decimal::from(2800));
        assert_eq!(totals.ticket_quantity, 3);
        assert_eq!(totals.apparel_quantity, 3);
        assert_eq!(totals.item_count(), 6);
    }

    #[test]
    fn test_totals_empty() {
        let lines: [Line; 0] = [];
        let totals = CartTotals::from_lines(&lines);
        assert!(totals.is_empty());
        assert_eq!(totals.total_price, Decimal::ZERO);
    }

    #[test]
    fn test_totals_track_add_and_remove_sequence() {
        // add 1, add 2 more, remove one unit, add an apparel, remove it
        let mut lines = vec![ticket(1, 100)];
        lines[0].quantity = add_quantity(lines[0].quantity, 2).unwrap_or_default();
        lines[0].quantity = decrement_quantity(lines[0].quantity).unwrap_or_default();
        lines.push(apparel(1, 300));
        if decrement_quantity(lines[1].quantity).is_none() {
            lines.pop();
        }

        let totals = CartTotals::from_lines(&lines);
        let expected: Decimal = lines.iter().map(PricedLine::line_total).sum();
        assert_eq!(totals.total_price, expected);
        assert_eq!(totals.total_price, Decimal::from(200));
        assert_eq!(totals.apparel_quantity, 0);
    }

    #[test]
    fn test_add_quantity_rejects_non_positive() {
        assert_eq!(add_quantity(1, 0), Err(PricingError::InvalidQuantity));
        assert_eq!(add_quantity(1, -3), Err(PricingError::InvalidQuantity));
        assert_eq!(add_quantity(i32::MAX, 1), Err(PricingError::InvalidQuantity));
        assert_eq!(add_quantity(2, 3), Ok(5));
    }

    #[test]
    fn test_decrement_quantity() {
        assert_eq!(decrement_quantity(3), Some(2));
        assert_eq!(decrement_quantity(1), None);
    }
}
