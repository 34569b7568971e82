//! Festiv API library.
//!
//! The REST backend for the ticket and apparel marketplace, exposed as a
//! library so the router can be exercised from integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request};
use tower_http::trace::TraceLayer;

use crate::middleware::{SessionKeyError, create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Build the full application router with its middleware stack.
///
/// # Errors
///
/// Returns `SessionKeyError` if the session secret cannot sign cookies.
pub fn app(state: AppState) -> Result<Router, SessionKeyError> {
    let session_layer = create_session_layer(state.pool(), state.config())?;

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    Ok(routes::routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}
