//! Enumerations for product, order, payment, and return state.
//!
//! With the `postgres` feature each enum maps to a Postgres enum type in the
//! `festiv` schema, using the same snake_case labels as the JSON form.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

macro_rules! labelled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire and database label.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Product category. Tickets and apparels share one catalog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "festiv.product_category", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Ticket,
    Apparel,
}

labelled_enum!(ProductCategory, "product category", {
    Ticket => "ticket",
    Apparel => "apparel",
});

/// How a coupon's `amount` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "festiv.discount_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Fixed amount off the in-scope subtotal.
    Flat,
    /// Percentage (0-100) of the in-scope subtotal.
    Percentage,
}

labelled_enum!(DiscountType, "discount type", {
    Flat => "flat",
    Percentage => "percentage",
});

/// Order fulfillment status.
///
/// See [`crate::lifecycle`] for the permitted transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "festiv.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Delivered,
    Canceled,
    Return,
    Refunded,
}

labelled_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Delivered => "delivered",
    Canceled => "canceled",
    Return => "return",
    Refunded => "refunded",
});

/// Payment method chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "festiv.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    /// Debited from the account wallet at checkout.
    Wallet,
    /// Paid through the Razorpay gateway and confirmed by signature.
    Razorpay,
}

labelled_enum!(PaymentMethod, "payment method", {
    Cod => "cod",
    Wallet => "wallet",
    Razorpay => "razorpay",
});

impl PaymentMethod {
    /// Payment status an order starts with for this method.
    ///
    /// Wallet orders are paid in the same transaction that creates them.
    #[must_use]
    pub const fn initial_payment_status(self) -> PaymentStatus {
        match self {
            Self::Wallet => PaymentStatus::Successful,
            Self::Cod | Self::Razorpay => PaymentStatus::Pending,
        }
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "festiv.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Successful,
    Failed,
    /// Paid amount was credited back to the wallet.
    Refund,
}

labelled_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Successful => "successful",
    Failed => "failed",
    Refund => "refund",
});

/// Status of a return request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "festiv.return_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    #[default]
    Requested,
    Approved,
    Rejected,
    Completed,
}

labelled_enum!(ReturnStatus, "return status", {
    Requested => "requested",
    Approved => "approved",
    Rejected => "rejected",
    Completed => "completed",
});

/// Who a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

labelled_enum!(Role, "role", {
    User => "user",
    Admin => "admin",
});

/// Look-back window for sales reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Day,
    Week,
    Month,
    Year,
}

labelled_enum!(ReportPeriod, "report period", {
    Day => "day",
    Week => "week",
    Month => "month",
    Year => "year",
});

impl ReportPeriod {
    /// Start of the window that ends at `now`.
    #[must_use]
    pub fn start(self, now: chrono::DateTime<chrono::Utc>) -> chrono::DateTime<chrono::Utc> {
        let span = match self {
            Self::Day => chrono::Duration::days(1),
            Self::Week => chrono::Duration::weeks(1),
            Self::Month => chrono::Duration::days(30),
            Self::Year => chrono::Duration::days(365),
        };
        now - span
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        for category in ProductCategory::ALL {
            assert_eq!(category.to_string().parse::<ProductCategory>().unwrap(), *category);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid order status: shipped");
    }

    #[test]
    fn test_serde_uses_snake_case_labels() {
        let json = serde_json::to_string(&PaymentMethod::Razorpay).unwrap();
        assert_eq!(json, "\"razorpay\"");

        let parsed: OrderStatus = serde_json::from_str("\"return\"").unwrap();
        assert_eq!(parsed, OrderStatus::Return);
    }

    #[test]
    fn test_initial_payment_status() {
        assert_eq!(PaymentMethod::Cod.initial_payment_status(), PaymentStatus::Pending);
        assert_eq!(
            PaymentMethod::Wallet.initial_payment_status(),
            PaymentStatus::Successful
        );
        assert_eq!(
            PaymentMethod::Razorpay.initial_payment_status(),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_report_period_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        assert_eq!(
            ReportPeriod::Day.start(now),
            Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap()
        );
        assert_eq!(
            ReportPeriod::Week.start(now),
            Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap()
        );
    }
}
