//! HTTP middleware for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with a `request_id` field)
//! 3. Request ID (reuse or mint `x-request-id`)
//! 4. Session layer (signed cookie, `PostgreSQL` store)
//!
//! Authorization is not a layer: handlers opt in with the [`RequireUser`] and
//! [`RequireAdmin`] extractors.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    AuthRejection, RequireAdmin, RequireUser, clear_current_session, set_current_session,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, SessionKeyError, create_session_layer};
