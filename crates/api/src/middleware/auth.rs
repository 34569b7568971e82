//! Authentication extractors.
//!
//! A login stores a [`CurrentSession`] in the session; the extractors here
//! read it back and check its role. Missing sessions and role mismatches both
//! answer 401 with a JSON body. Shopper sessions are also checked against the
//! account's current permission, so blocking a user ends their sessions.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use festiv_core::{AccountId, AdminId, Role};

use crate::db::accounts;
use crate::models::{CurrentSession, keys};
use crate::state::AppState;

/// Extractor that requires a logged-in shopper.
///
/// ```rust,ignore
/// async fn view_cart(RequireUser(account_id): RequireUser) -> impl IntoResponse {
///     format!("cart for {account_id}")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub AccountId);

/// Extractor that requires a logged-in admin.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub AdminId);

/// Rejection for the authentication extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session layer ran, or nobody is logged in.
    NotLoggedIn,
    /// Logged in, but with the wrong role for this route.
    WrongRole(Role),
    /// The account was blocked after logging in.
    Blocked,
    /// The account could not be checked.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotLoggedIn => (StatusCode::UNAUTHORIZED, "login required".to_owned()),
            Self::WrongRole(role) => (StatusCode::UNAUTHORIZED, format!("{role} login required")),
            Self::Blocked => (StatusCode::FORBIDDEN, "account is blocked".to_owned()),
            Self::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn session_for(parts: &Parts, role: Role) -> Result<CurrentSession, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::NotLoggedIn)?;

    let current: CurrentSession = session
        .get(keys::CURRENT_SESSION)
        .await
        .ok()
        .flatten()
        .ok_or(AuthRejection::NotLoggedIn)?;

    if current.role != role {
        return Err(AuthRejection::WrongRole(role));
    }
    Ok(current)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = session_for(parts, Role::User).await?;
        let account_id = AccountId::new(current.subject_id);

        match accounts::permission(state.pool(), account_id).await {
            Ok(Some(true)) => Ok(Self(account_id)),
            Ok(Some(false)) => Err(AuthRejection::Blocked),
            Ok(None) => Err(AuthRejection::NotLoggedIn),
            Err(e) => {
                tracing::error!(error = %e, %account_id, "Failed to check account permission");
                Err(AuthRejection::Unavailable)
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let current = session_for(parts, Role::Admin).await?;
        Ok(Self(AdminId::new(current.subject_id)))
    }
}

/// Store the logged-in identity, replacing the session id first so a
/// pre-login cookie cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_session(
    session: &Session,
    current: &CurrentSession,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_SESSION, current).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot be updated.
pub async fn clear_current_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_are_unauthorized() {
        assert_eq!(
            AuthRejection::NotLoggedIn.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::WrongRole(Role::Admin).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_blocked_account_is_forbidden() {
        assert_eq!(
            AuthRejection::Blocked.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthRejection::Unavailable.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
