//! Profile, addresses, and password change for the logged-in shopper.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use festiv_core::AddressId;

use super::auth::OtpIssued;
use crate::error::Result;
use crate::extract;
use crate::middleware::RequireUser;
use crate::models::account::{Account, Address, NewAddress, Profile};
use crate::services::account::ProfileChanges;
use crate::services::{AccountService, AuthService};
use crate::state::AppState;

/// OTP key and code plus the new password.
#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub key: String,
    pub code: String,
    pub new_password: String,
}

pub async fn profile(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
) -> Result<Json<Profile>> {
    Ok(Json(AccountService::new(state.pool()).profile(account_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Json(changes): extract::Json<ProfileChanges>,
) -> Result<Json<Account>> {
    let account = AccountService::new(state.pool())
        .update_profile(account_id, &changes)
        .await?;
    Ok(Json(account))
}

pub async fn add_address(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Json(new): extract::Json<NewAddress>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = AccountService::new(state.pool())
        .add_address(account_id, &new)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn remove_address(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Path(id): extract::Path<AddressId>,
) -> Result<StatusCode> {
    AccountService::new(state.pool())
        .remove_address(account_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Send a code to the account's phone before a password change.
pub async fn start_password_change(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
) -> Result<Json<OtpIssued>> {
    let key = AuthService::new(state.pool(), state.otp())
        .start_password_change(account_id)
        .await?;
    Ok(Json(OtpIssued { key }))
}

pub async fn change_password(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Json(input): extract::Json<PasswordChange>,
) -> Result<StatusCode> {
    AuthService::new(state.pool(), state.otp())
        .change_password(account_id, &input.key, &input.code, &input.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
