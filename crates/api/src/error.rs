//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Responses carry a JSON body
//! `{"error": "<message>"}`; server-side failures are captured to Sentry and
//! their details are replaced with a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, GatewayError, OtpError, ServiceError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Shopping or administration workflow failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Authentication operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Database operation failed outside a service.
    #[error(transparent)]
    Database(#[from] RepositoryError),

    /// Session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => service_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Database(err) => repository_status(err),
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn client_message(&self, status: StatusCode) -> String {
        if status == StatusCode::BAD_GATEWAY {
            return "External service error".to_owned();
        }
        if status.is_server_error() {
            return "Internal server error".to_owned();
        }
        match self {
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_owned(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let message = self.client_message(status);
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Pricing(_) | ServiceError::Transition(_) | ServiceError::Invalid(_) => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::Gateway(GatewayError::InvalidSignature | GatewayError::InvalidAmount(_)) => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::Gateway(GatewayError::Http(_) | GatewayError::Api { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        ServiceError::Repository(err) => repository_status(err),
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::PaymentCredited(_) => StatusCode::CONFLICT,
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidEmail(_)
        | AuthError::InvalidPhone(_)
        | AuthError::WeakPassword(_)
        | AuthError::NoPendingSignup => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials
        | AuthError::Otp(OtpError::Rejected | OtpError::UnknownKey | OtpError::Expired) => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::Blocked => StatusCode::FORBIDDEN,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::Otp(OtpError::Http(_) | OtpError::Api { .. }) => StatusCode::BAD_GATEWAY,
        AuthError::Repository(err) => repository_status(err),
        AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with the logged-in subject.
pub fn set_sentry_user(subject_id: &impl ToString, role: festiv_core::Role) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(subject_id.to_string()),
            ..Default::default()
        }));
        scope.set_tag("role", role.as_str());
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use festiv_core::{OrderStatus, PaymentStatus, PricingError, TransitionError};

    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_business_rule_violations_are_bad_requests() {
        assert_eq!(
            get_status(ServiceError::from(PricingError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ServiceError::from(TransitionError::CancelWindowExceeded(
                OrderStatus::Delivered
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ServiceError::from(GatewayError::InvalidSignature)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ServiceError::from(TransitionError::Unpaid(PaymentStatus::Pending))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_credited_payment_is_conflict() {
        let err = AppError::from(ServiceError::PaymentCredited("order is canceled".to_owned()));
        let status = err.status();
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(err.client_message(status).contains("credited to your wallet"));
    }

    #[test]
    fn test_repository_errors() {
        assert_eq!(get_status(RepositoryError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(RepositoryError::Conflict("duplicate".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ServiceError::from(RepositoryError::DataCorruption(
                "bad row".to_owned()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(get_status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::Blocked), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AuthError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(
            get_status(AuthError::from(OtpError::Expired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::from(OtpError::Api {
                status: 503,
                message: "down".to_owned()
            })),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_plain_variants() {
        assert_eq!(
            get_status(AppError::NotFound("order".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("login required".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Internal("connection string leaked".to_owned());
        let status = err.status();
        assert_eq!(err.client_message(status), "Internal server error");

        let err = AppError::BadRequest("limit must be a number".to_owned());
        let status = err.status();
        assert_eq!(err.client_message(status), "limit must be a number");
    }
}
