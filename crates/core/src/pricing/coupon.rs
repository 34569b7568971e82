use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{PricedLine, PricingError};
use crate::{DiscountType, ProductCategory};

/// The parts of a coupon that decide whether and how much it discounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponTerms {
    pub discount_type: DiscountType,
    pub amount: Decimal,
    pub category: ProductCategory,
    pub usage_limit: i32,
    pub used_count: i32,
    pub valid_until: DateTime<Utc>,
}

/// Sum of `quantity × unit_price` over lines in `category`.
pub fn category_subtotal<L: PricedLine>(lines: &[L], category: ProductCategory) -> Decimal {
    lines
        .iter()
        .filter(|line| line.category() == category)
        .map(PricedLine::line_total)
        .sum()
}

impl CouponTerms {
    /// Whether the coupon can still be redeemed at `now`.
    #[must_use]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.ensure_usable(now).is_ok()
    }

    /// # Errors
    ///
    /// [`PricingError::CouponExpired`] past `valid_until`,
    /// [`PricingError::CouponExhausted`] once `used_count` reaches `usage_limit`.
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<(), PricingError> {
        if now > self.valid_until {
            return Err(PricingError::CouponExpired);
        }
        if self.used_count >= self.usage_limit {
            return Err(PricingError::CouponExhausted);
        }
        Ok(())
    }

    /// Discount granted on an in-scope `subtotal`.
    ///
    /// Flat discounts are capped at the subtotal. Percentage discounts are
    /// `subtotal × amount / 100`, rounded half-up to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidPercentage`] for a percentage outside 0-100.
    pub fn discount_on(&self, subtotal: Decimal) -> Result<Decimal, PricingError> {
        match self.discount_type {
            DiscountType::Flat => Ok(self.amount.min(subtotal).max(Decimal::ZERO)),
            DiscountType::Percentage => {
                if self.amount < Decimal::ZERO || self.amount > Decimal::ONE_HUNDRED {
                    return Err(PricingError::InvalidPercentage);
                }
                Ok((subtotal * self.amount / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
            }
        }
    }

    /// Compute the discount this coupon gives a cart.
    ///
    /// `current_offer` is the discount already stored on the cart; a non-zero
    /// value means a coupon was applied and the cart has not changed since.
    ///
    /// # Errors
    ///
    /// Fails if the coupon is unusable, no line matches its category, or a
    /// discount is already applied.
    pub fn apply<L: PricedLine>(
        &self,
        lines: &[L],
        current_offer: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal, PricingError> {
        self.ensure_usable(now)?;

        let subtotal = category_subtotal(lines, self.category);
        if subtotal.is_zero() {
            return Err(PricingError::NoItemsInScope(self.category));
        }

        let discount = self.discount_on(subtotal)?;

        if !current_offer.is_zero() {
            return Err(PricingError::DiscountAlreadyApplied);
        }

        Ok(discount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::pricing::tests::{apparel, ticket};

    fn coupon(discount_type: DiscountType, amount: i64, category: ProductCategory) -> CouponTerms {
        CouponTerms {
            discount_type,
            amount: Decimal::from(amount),
            category,
            usage_limit: 10,
            used_count: 0,
            valid_until: Utc::now() + Duration::days(7),
        }
    }

    #[test]
    fn test_flat_coupon_on_two_tickets() {
        let lines = [ticket(2, 100)];
        let terms = coupon(DiscountType::Flat, 20, ProductCategory::Ticket);

        let discount = terms.apply(&lines, Decimal::ZERO, Utc::now()).unwrap();
        assert_eq!(discount, Decimal::from(20));
    }

    #[test]
    fn test_percentage_coupon_is_a_true_percentage() {
        let lines = [ticket(2, 100), apparel(1, 999)];
        let terms = coupon(DiscountType::Percentage, 10, ProductCategory::Ticket);

        let discount = terms.apply(&lines, Decimal::ZERO, Utc::now()).unwrap();
        assert_eq!(discount, Decimal::from(20));
    }

    #[test]
    fn test_percentage_rounds_to_paise() {
        let terms = coupon(DiscountType::Percentage, 15, ProductCategory::Apparel);
        let discount = terms.discount_on(Decimal::new(33_333, 2)).unwrap();
        assert_eq!(discount, Decimal::new(5000, 2));
    }

    #[test]
    fn test_flat_discount_capped_at_subtotal() {
        let lines = [apparel(1, 50)];
        let terms = coupon(DiscountType::Flat, 80, ProductCategory::Apparel);

        let discount = terms.apply(&lines, Decimal::ZERO, Utc::now()).unwrap();
        assert_eq!(discount, Decimal::from(50));
    }

    #[test]
    fn test_rejects_out_of_range_percentage() {
        let terms = coupon(DiscountType::Percentage, 120, ProductCategory::Ticket);
        assert_eq!(
            terms.discount_on(Decimal::from(100)),
            Err(PricingError::InvalidPercentage)
        );
    }

    #[test]
    fn test_no_items_in_scope() {
        let lines = [apparel(2, 300)];
        let terms = coupon(DiscountType::Flat, 20, ProductCategory::Ticket);

        assert_eq!(
            terms.apply(&lines, Decimal::ZERO, Utc::now()),
            Err(PricingError::NoItemsInScope(ProductCategory::Ticket))
        );
    }

    #[test]
    fn test_applying_twice_is_rejected() {
        let lines = [ticket(2, 100)];
        let terms = coupon(DiscountType::Flat, 20, ProductCategory::Ticket);

        let first = terms.apply(&lines, Decimal::ZERO, Utc::now()).unwrap();
        assert_eq!(
            terms.apply(&lines, first, Utc::now()),
            Err(PricingError::DiscountAlreadyApplied)
        );
    }

    #[test]
    fn test_expired_and_exhausted() {
        let lines = [ticket(1, 100)];
        let now = Utc::now();

        let mut expired = coupon(DiscountType::Flat, 10, ProductCategory::Ticket);
        expired.valid_until = now - Duration::seconds(1);
        assert_eq!(
            expired.apply(&lines, Decimal::ZERO, now),
            Err(PricingError::CouponExpired)
        );
        assert!(!expired.is_available(now));

        let mut exhausted = coupon(DiscountType::Flat, 10, ProductCategory::Ticket);
        exhausted.used_count = exhausted.usage_limit;
        assert_eq!(
            exhausted.apply(&lines, Decimal::ZERO, now),
            Err(PricingError::CouponExhausted)
        );
    }

    #[test]
    fn test_category_subtotal() {
        let lines = [ticket(2, 100), apparel(3, 10), ticket(1, 5)];
        assert_eq!(
            category_subtotal(&lines, ProductCategory::Ticket),
            Decimal::from(205)
        );
        assert_eq!(
            category_subtotal(&lines, ProductCategory::Apparel),
            Decimal::from(30)
        );
    }
}
