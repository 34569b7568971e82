use rust_decimal::Decimal;

use super::PricingError;

/// Amount charged for a cart: `total_price - offer_price`, never negative.
#[must_use]
pub fn checkout_total(total_price: Decimal, offer_price: Decimal) -> Decimal {
    (total_price - offer_price).max(Decimal::ZERO)
}

/// # Errors
///
/// Returns [`PricingError::InsufficientFunds`] when `balance < required`.
pub fn ensure_wallet_covers(balance: Decimal, required: Decimal) -> Result<(), PricingError> {
    if balance < required {
        return Err(PricingError::InsufficientFunds { balance, required });
    }
    Ok(())
}

/// # Errors
///
/// Returns [`PricingError::InsufficientStock`] when `requested > available`.
pub const fn ensure_stock(available: i32, requested: i32) -> Result<(), PricingError> {
    if requested > available {
        return Err(PricingError::InsufficientStock {
            available,
            requested,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_total_subtracts_offer() {
        assert_eq!(
            checkout_total(Decimal::from(200), Decimal::from(20)),
            Decimal::from(180)
        );
        assert_eq!(
            checkout_total(Decimal::from(200), Decimal::ZERO),
            Decimal::from(200)
        );
    }

    #[test]
    fn test_checkout_total_never_negative() {
        assert_eq!(
            checkout_total(Decimal::from(10), Decimal::from(25)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_wallet_short_of_total() {
        let err = ensure_wallet_covers(Decimal::from(50), Decimal::from(100));
        assert_eq!(
            err,
            Err(PricingError::InsufficientFunds {
                balance: Decimal::from(50),
                required: Decimal::from(100),
            })
        );
    }

    #[test]
    fn test_wallet_exact_balance_is_enough() {
        assert!(ensure_wallet_covers(Decimal::from(100), Decimal::from(100)).is_ok());
    }

    #[test]
    fn test_stock() {
        assert!(ensure_stock(5, 5).is_ok());
        assert_eq!(
            ensure_stock(2, 3),
            Err(PricingError::InsufficientStock {
                available: 2,
                requested: 3
            })
        );
    }
}
