//! Account, address, and admin models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use festiv_core::{AccountId, AddressId, AdminId, Email, Phone};

/// A shopper account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Phone,
    pub wallet: Decimal,
    /// `false` when an admin has blocked the account.
    pub permission: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A delivery address. Removal is a soft delete.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub account_id: AccountId,
    /// Free-form tag such as `home` or `work`.
    pub address_type: String,
    pub house: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub landmark: Option<String>,
    pub removed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when adding an address.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
    pub address_type: String,
    pub house: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub landmark: Option<String>,
}

/// Account profile together with its active addresses.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub account: Account,
    pub addresses: Vec<Address>,
}

/// An administrator.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Admin {
    pub id: AdminId,
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub created_at: DateTime<Utc>,
}
