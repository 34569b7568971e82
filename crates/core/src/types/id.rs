//! Newtype IDs for the marketplace entities.
//!
//! Every table keyed by a `SERIAL` column gets its own wrapper so that an
//! order id can never be passed where a cart id is expected.

/// Define a type-safe `i32` ID wrapper.
///
/// The generated type is `Copy`, serializes as a bare integer, and (with the
/// `postgres` feature) encodes and decodes as `INT4`, including arrays of the
/// ID for `= ANY($1)` queries.
///
/// ```rust
/// # use festiv_core::define_id;
/// define_id!(TicketId);
/// define_id!(VenueId);
///
/// let ticket = TicketId::new(7);
/// assert_eq!(ticket.as_i32(), 7);
/// assert_eq!(ticket.to_string(), "7");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw database id.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw database id.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::postgres::PgHasArrayType for $name {
            fn array_type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::postgres::PgHasArrayType>::array_type_info()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(AccountId);
define_id!(AddressId);
define_id!(AdminId);
define_id!(ProductId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(WishlistEntryId);
define_id!(CouponId);
define_id!(OfferId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(InvoiceId);
define_id!(ReturnId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&OrderId::new(42)).unwrap();
        assert_eq!(json, "42");

        let parsed: OrderId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, OrderId::new(42));
    }

    #[test]
    fn test_id_conversions() {
        let id = CartId::from(9);
        assert_eq!(i32::from(id), 9);
        assert_eq!(id.to_string(), "9");
    }
}
