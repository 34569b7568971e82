//! Razorpay payment gateway client.
//!
//! Checkout creates a gateway order; the browser collects the payment and
//! posts back `(order_id, payment_id, signature)`. The signature is
//! `hex(HMAC-SHA256(key_secret, "{order_id}|{payment_id}"))` and is checked
//! locally.
//!
//! # API Reference
//!
//! - Base URL: `https://api.razorpay.com/v1`
//! - Authentication: HTTP basic auth with the key id and key secret
//! - `POST /orders` with `{amount, currency, receipt}` (amount in paise)

use std::sync::Arc;

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::RazorpayConfig;

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("payment gateway error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Amount cannot be expressed in minor units.
    #[error("invalid payment amount: {0}")]
    InvalidAmount(Decimal),

    /// Payment signature did not verify.
    #[error("payment signature verification failed")]
    InvalidSignature,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// A gateway order awaiting payment.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    description: Option<String>,
}

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    inner: Arc<RazorpayClientInner>,
}

struct RazorpayClientInner {
    client: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
    currency: String,
    orders_url: String,
}

impl RazorpayClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RazorpayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            inner: Arc::new(RazorpayClientInner {
                client,
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
                currency: config.currency.clone(),
                orders_url: format!("{}/orders", config.api_base.as_str().trim_end_matches('/')),
            }),
        })
    }

    /// Public key id, handed to the browser checkout.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.inner.key_id
    }

    #[must_use]
    pub fn currency(&self) -> &str {
        &self.inner.currency
    }

    /// Create a gateway order for `amount` (major units).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Api` if the gateway refuses the order.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        amount: Decimal,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let request = CreateOrderRequest {
            amount: to_minor_units(amount)?,
            currency: &self.inner.currency,
            receipt,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.orders_url)
            .basic_auth(&self.inner.key_id, Some(self.inner.key_secret.expose_secret()))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let order: GatewayOrder = response.json().await?;
            debug!(gateway_order_id = %order.id, "Gateway order created");
            return Ok(order);
        }

        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|e| e.error.description)
            .unwrap_or_else(|| status.to_string());
        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Check the signature the browser posts back after payment.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidSignature` on mismatch.
    #[instrument(skip(self, signature))]
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError> {
        let expected = sign(
            self.inner.key_secret.expose_secret(),
            gateway_order_id,
            payment_id,
        )?;

        if !constant_time_compare(&expected, signature) {
            return Err(GatewayError::InvalidSignature);
        }

        debug!("Payment signature verified");
        Ok(())
    }
}

fn sign(secret: &str, gateway_order_id: &str, payment_id: &str) -> Result<String, GatewayError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| GatewayError::InvalidSignature)?;
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Convert rupees to paise.
fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .filter(|paise| *paise > 0)
        .ok_or(GatewayError::InvalidAmount(amount))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    fn client() -> RazorpayClient {
        RazorpayClient::new(&RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: SecretString::from("test-key-secret".to_string()),
            currency: "INR".to_string(),
            api_base: Url::parse("https://api.razorpay.com/v1").unwrap(),
        })
        .unwrap()
    }

    #[test]
    fn test_signature_verification_valid() {
        let signature = sign("test-key-secret", "order_abc", "pay_123").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(client().verify_signature("order_abc", "pay_123", &signature).is_ok());
    }

    #[test]
    fn test_signature_verification_wrong_payment() {
        let signature = sign("test-key-secret", "order_abc", "pay_123").unwrap();
        assert!(matches!(
            client().verify_signature("order_abc", "pay_999", &signature),
            Err(GatewayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_signature_verification_wrong_secret() {
        let signature = sign("another-secret", "order_abc", "pay_123").unwrap();
        assert!(client().verify_signature("order_abc", "pay_123", &signature).is_err());
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(18050, 2)).unwrap(), 18050);
        assert_eq!(to_minor_units(Decimal::from(180)).unwrap(), 18000);
        assert!(to_minor_units(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }
}
