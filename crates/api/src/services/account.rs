//! Profile and address management.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use festiv_core::{AccountId, AddressId, Email};

use super::ServiceError;
use crate::db::accounts;
use crate::models::account::{Account, Address, NewAddress, Profile};

/// Editable profile fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Account service.
pub struct AccountService<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The account with its active addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account no longer exists.
    pub async fn profile(&self, account_id: AccountId) -> Result<Profile, ServiceError> {
        let account = accounts::find_by_id(self.pool, account_id)
            .await?
            .ok_or(ServiceError::NotFound("account"))?;
        let addresses = accounts::list_addresses(self.pool, account_id).await?;
        Ok(Profile { account, addresses })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for blank names or a malformed email
    /// and `RepositoryError::Conflict` if the email belongs to another account.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        account_id: AccountId,
        changes: &ProfileChanges,
    ) -> Result<Account, ServiceError> {
        let first_name = changes.first_name.trim();
        let last_name = changes.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(ServiceError::Invalid("first and last name are required".to_owned()));
        }
        let email =
            Email::parse(&changes.email).map_err(|e| ServiceError::Invalid(e.to_string()))?;

        Ok(accounts::update_profile(self.pool, account_id, first_name, last_name, &email).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` if a required field is blank or the
    /// pincode is not six digits.
    #[instrument(skip(self, new))]
    pub async fn add_address(
        &self,
        account_id: AccountId,
        new: &NewAddress,
    ) -> Result<Address, ServiceError> {
        validate_address(new)?;
        let address = accounts::add_address(self.pool, account_id, new).await?;
        tracing::info!(address_id = %address.id, "Address added");
        Ok(address)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` unless the caller owns an active
    /// address with this id.
    #[instrument(skip(self))]
    pub async fn remove_address(
        &self,
        account_id: AccountId,
        id: AddressId,
    ) -> Result<(), ServiceError> {
        accounts::remove_address(self.pool, account_id, id).await?;
        Ok(())
    }
}

fn validate_address(new: &NewAddress) -> Result<(), ServiceError> {
    let required = [
        ("address type", &new.address_type),
        ("house", &new.house),
        ("street", &new.street),
        ("city", &new.city),
        ("state", &new.state),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ServiceError::Invalid(format!("{field} is required")));
    }

    let pincode = new.pincode.trim();
    if pincode.len() != 6 || !pincode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::Invalid("pincode must be six digits".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> NewAddress {
        NewAddress {
            address_type: "home".to_owned(),
            house: "12B".to_owned(),
            street: "MG Road".to_owned(),
            city: "Bengaluru".to_owned(),
            state: "Karnataka".to_owned(),
            pincode: "560001".to_owned(),
            landmark: None,
        }
    }

    #[test]
    fn test_valid_address() {
        assert!(validate_address(&address()).is_ok());
    }

    #[test]
    fn test_blank_field_rejected() {
        let mut new = address();
        new.city = "  ".to_owned();
        let err = validate_address(&new).unwrap_err();
        assert_eq!(err.to_string(), "city is required");
    }

    #[test]
    fn test_pincode_must_be_six_digits() {
        for bad in ["56000", "5600011", "56000A"] {
            let mut new = address();
            new.pincode = bad.to_owned();
            assert!(validate_address(&new).is_err(), "{bad} accepted");
        }
    }
}
