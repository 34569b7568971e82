//! Shopper signup, login, and logout.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use festiv_core::Role;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract;
use crate::middleware::{clear_current_session, set_current_session};
use crate::models::{Account, CurrentSession};
use crate::services::AuthService;
use crate::services::auth::SignupInput;
use crate::state::AppState;

/// Phone and password.
#[derive(Debug, Deserialize)]
pub struct PasswordLogin {
    pub phone: String,
    pub password: String,
}

/// Phone to send a login code to.
#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub phone: String,
}

/// Key returned by an OTP start call and the code the user received.
#[derive(Debug, Deserialize)]
pub struct OtpVerification {
    pub key: String,
    pub code: String,
}

/// Handle for a pending OTP verification.
#[derive(Debug, Serialize)]
pub struct OtpIssued {
    pub key: String,
}

/// Register with a password.
#[instrument(skip(state, input))]
pub async fn signup(
    State(state): State<AppState>,
    extract::Json(input): extract::Json<SignupInput>,
) -> Result<(StatusCode, Json<Account>)> {
    let account = AuthService::new(state.pool(), state.otp())
        .signup(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Start an OTP signup; the account is created on verification.
#[instrument(skip(state, input))]
pub async fn start_signup_otp(
    State(state): State<AppState>,
    extract::Json(input): extract::Json<SignupInput>,
) -> Result<Json<OtpIssued>> {
    let key = AuthService::new(state.pool(), state.otp())
        .start_signup_otp(&input)
        .await?;
    Ok(Json(OtpIssued { key }))
}

#[instrument(skip(state, input))]
pub async fn finish_signup_otp(
    State(state): State<AppState>,
    extract::Json(input): extract::Json<OtpVerification>,
) -> Result<(StatusCode, Json<Account>)> {
    let account = AuthService::new(state.pool(), state.otp())
        .finish_signup_otp(&input.key, &input.code)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[instrument(skip(state, session, input))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    extract::Json(input): extract::Json<PasswordLogin>,
) -> Result<Json<Account>> {
    let account = AuthService::new(state.pool(), state.otp())
        .login_with_password(&input.phone, &input.password)
        .await?;
    start_session(&session, &account).await?;
    Ok(Json(account))
}

#[instrument(skip(state, input))]
pub async fn start_login_otp(
    State(state): State<AppState>,
    extract::Json(input): extract::Json<OtpRequest>,
) -> Result<Json<OtpIssued>> {
    let key = AuthService::new(state.pool(), state.otp())
        .start_login_otp(&input.phone)
        .await?;
    Ok(Json(OtpIssued { key }))
}

#[instrument(skip(state, session, input))]
pub async fn finish_login_otp(
    State(state): State<AppState>,
    session: Session,
    extract::Json(input): extract::Json<OtpVerification>,
) -> Result<Json<Account>> {
    let account = AuthService::new(state.pool(), state.otp())
        .finish_login_otp(&input.key, &input.code)
        .await?;
    start_session(&session, &account).await?;
    Ok(Json(account))
}

/// Log out whoever owns the session, shopper or admin.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_session(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

async fn start_session(session: &Session, account: &Account) -> Result<()> {
    let current = CurrentSession {
        subject_id: account.id.as_i32(),
        phone: account.phone.clone(),
        role: Role::User,
    };
    set_current_session(session, &current).await?;
    set_sentry_user(&account.id, Role::User);
    tracing::info!(account_id = %account.id, "Shopper logged in");
    Ok(())
}
