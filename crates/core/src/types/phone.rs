//! Phone number type used for logins and OTP delivery.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number cannot be empty")]
    Empty,
    #[error("phone number may only contain digits, spaces, dashes and a leading +")]
    InvalidCharacter,
    #[error("phone number must have between {min} and {max} digits")]
    Length { min: usize, max: usize },
}

/// A phone number, stored with separators removed.
///
/// Numbers may be national (`9876543210`) or carry a country code
/// (`+919876543210`). [`Phone::to_e164`] fills in a default country code for
/// national numbers before they are handed to the OTP provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    const MIN_DIGITS: usize = 10;
    const MAX_DIGITS: usize = 15;

    /// Parse a phone number, dropping spaces and dashes.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] if the input is empty, contains anything other
    /// than digits and separators, or has the wrong number of digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let (plus, rest) = s
            .strip_prefix('+')
            .map_or((false, s), |rest| (true, rest));

        let mut digits = String::with_capacity(rest.len() + 1);
        if plus {
            digits.push('+');
        }
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        let count = digits.trim_start_matches('+').len();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&count) {
            return Err(PhoneError::Length {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format for the OTP provider, prefixing `country_code` to national numbers.
    #[must_use]
    pub fn to_e164(&self, country_code: &str) -> String {
        if self.0.starts_with('+') {
            self.0.clone()
        } else {
            format!("{country_code}{}", self.0)
        }
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Phone {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Phone {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        <String as sqlx::Decode<sqlx::Postgres>>::decode(value).map(Self)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Phone {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_separators() {
        let phone = Phone::parse("98765-43210").unwrap();
        assert_eq!(phone.as_str(), "9876543210");

        let phone = Phone::parse("+91 98765 43210").unwrap();
        assert_eq!(phone.as_str(), "+919876543210");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Phone::parse(""), Err(PhoneError::Empty));
        assert_eq!(Phone::parse("98765x3210"), Err(PhoneError::InvalidCharacter));
        assert_eq!(Phone::parse("9+876543210"), Err(PhoneError::InvalidCharacter));
        assert!(matches!(Phone::parse("12345"), Err(PhoneError::Length { .. })));
        assert!(matches!(
            Phone::parse("1234567890123456"),
            Err(PhoneError::Length { .. })
        ));
    }

    #[test]
    fn test_to_e164() {
        let national = Phone::parse("9876543210").unwrap();
        assert_eq!(national.to_e164("+91"), "+919876543210");

        let international = Phone::parse("+14155550100").unwrap();
        assert_eq!(international.to_e164("+91"), "+14155550100");
    }
}
