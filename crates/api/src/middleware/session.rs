//! Session middleware configuration.
//!
//! Sessions live in `PostgreSQL` (`tower_sessions.session`, created by
//! `festiv migrate`) and the cookie is signed with `FESTIV_SESSION_SECRET`.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ApiConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "festiv_session";

/// Sessions expire after a week without requests.
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// The session secret cannot be used as a signing key.
#[derive(Debug, thiserror::Error)]
#[error("invalid session secret: {0}")]
pub struct SessionKeyError(String);

/// Create the session layer with a `PostgreSQL` store.
///
/// # Errors
///
/// Returns `SessionKeyError` if the secret is too short for a signing key.
pub fn create_session_layer(
    pool: &PgPool,
    config: &ApiConfig,
) -> Result<SessionManagerLayer<PostgresStore, SignedCookie>, SessionKeyError> {
    let key = Key::try_from(config.session_secret.expose_secret().as_bytes())
        .map_err(|e| SessionKeyError(e.to_string()))?;

    let store = PostgresStore::new(pool.clone());

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
