//! Twilio Verify client for SMS one-time passwords.
//!
//! Twilio generates and checks the code; we only keep the verification sid
//! it returns (the "OTP key") so a later request can be tied back to the
//! phone number the code was sent to.
//!
//! # API Reference
//!
//! - Base URL: `https://verify.twilio.com/v2`
//! - Authentication: HTTP basic auth with the account sid and auth token
//! - `POST /Services/{sid}/Verifications` sends a code
//! - `POST /Services/{sid}/VerificationCheck` checks a code

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use festiv_core::Phone;

use crate::config::OtpConfig;

/// How long an issued OTP key stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Errors from the OTP provider.
#[derive(Debug, Error)]
pub enum OtpError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("OTP provider error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The code did not match.
    #[error("incorrect OTP")]
    Rejected,

    /// Key unknown or already used.
    #[error("OTP key not found or already used")]
    UnknownKey,

    /// Key older than the validity window.
    #[error("OTP key has expired")]
    Expired,
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    sid: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
}

/// Twilio Verify API client.
#[derive(Clone)]
pub struct OtpClient {
    inner: Arc<OtpClientInner>,
}

struct OtpClientInner {
    client: reqwest::Client,
    account_sid: String,
    auth_token: SecretString,
    service_url: String,
    country_code: String,
}

impl OtpClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &OtpConfig) -> Result<Self, OtpError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        let service_url = format!(
            "{}/Services/{}",
            config.api_base.as_str().trim_end_matches('/'),
            config.service_sid
        );

        Ok(Self {
            inner: Arc::new(OtpClientInner {
                client,
                account_sid: config.account_sid.clone(),
                auth_token: config.auth_token.clone(),
                service_url,
                country_code: config.country_code.clone(),
            }),
        })
    }

    /// Send a code to `phone` and return the verification sid.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::Api` if the provider refuses the request.
    #[tracing::instrument(skip(self), fields(phone = %phone))]
    pub async fn send(&self, phone: &Phone) -> Result<String, OtpError> {
        let to = phone.to_e164(&self.inner.country_code);
        let verification: VerificationResponse = self
            .post("Verifications", &[("To", to.as_str()), ("Channel", "sms")])
            .await?;

        tracing::info!(status = %verification.status, "OTP sent");
        Ok(verification.sid)
    }

    /// Check `code` against the last code sent to `phone`.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::Rejected` unless the provider approves the code.
    #[tracing::instrument(skip(self, code), fields(phone = %phone))]
    pub async fn check(&self, phone: &Phone, code: &str) -> Result<(), OtpError> {
        let to = phone.to_e164(&self.inner.country_code);
        let verification: VerificationResponse = self
            .post("VerificationCheck", &[("To", to.as_str()), ("Code", code)])
            .await
            .map_err(|e| match e {
                // Twilio answers 404 once a verification is approved, expired, or used up.
                OtpError::Api { status: 404, .. } => OtpError::Rejected,
                other => other,
            })?;

        if verification.status == "approved" {
            Ok(())
        } else {
            Err(OtpError::Rejected)
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, OtpError> {
        let url = format!("{}/{path}", self.inner.service_url);
        let response = self
            .inner
            .client
            .post(&url)
            .basic_auth(
                &self.inner.account_sid,
                Some(self.inner.auth_token.expose_secret()),
            )
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<ProviderError>()
            .await
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| status.to_string());
        Err(OtpError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Whether a key issued at `issued_at` is still usable at `now`.
#[must_use]
pub fn is_fresh(issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - issued_at <= Duration::minutes(OTP_TTL_MINUTES)
}

/// Keys issued before this instant are past their TTL.
#[must_use]
pub fn expiry_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(OTP_TTL_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_fresh_within_ttl() {
        let issued = Utc::now();
        assert!(is_fresh(issued, issued + Duration::minutes(9)));
        assert!(is_fresh(issued, issued + Duration::minutes(OTP_TTL_MINUTES)));
    }

    #[test]
    fn test_key_expires_after_ttl() {
        let issued = Utc::now();
        assert!(!is_fresh(issued, issued + Duration::minutes(11)));
    }

    #[test]
    fn test_expiry_cutoff_matches_freshness() {
        let now = Utc::now();
        let cutoff = expiry_cutoff(now);
        assert!(is_fresh(cutoff, now));
        assert!(!is_fresh(cutoff - Duration::seconds(1), now));
    }
}
