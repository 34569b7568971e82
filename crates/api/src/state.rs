//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::{GatewayError, OtpClient, OtpError, RazorpayClient};

/// Error building the outbound clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment gateway client: {0}")]
    Gateway(#[from] GatewayError),
    #[error("OTP client: {0}")]
    Otp(#[from] OtpError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable; configuration is passed in explicitly rather than read
/// from globals.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    razorpay: RazorpayClient,
    otp: OtpClient,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let razorpay = RazorpayClient::new(&config.razorpay)?;
        let otp = OtpClient::new(&config.otp)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                razorpay,
                otp,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Razorpay client used by checkout.
    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    /// Twilio Verify client used by the OTP flows.
    #[must_use]
    pub fn otp(&self) -> &OtpClient {
        &self.inner.otp
    }
}
