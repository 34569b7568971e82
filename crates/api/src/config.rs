//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FESTIV_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `FESTIV_BASE_URL` - Public URL of the API
//! - `FESTIV_SESSION_SECRET` - Cookie signing secret (min 64 chars, high entropy)
//! - `RAZORPAY_KEY_ID` - Razorpay API key id
//! - `RAZORPAY_KEY_SECRET` - Razorpay API key secret (also signs payment callbacks)
//! - `TWILIO_ACCOUNT_SID` - Twilio account SID
//! - `TWILIO_AUTH_TOKEN` - Twilio auth token
//! - `TWILIO_VERIFY_SERVICE_SID` - Twilio Verify service SID
//!
//! ## Optional
//! - `FESTIV_HOST` - Bind address (default: 127.0.0.1)
//! - `FESTIV_PORT` - Listen port (default: 8080)
//! - `RAZORPAY_CURRENCY` - ISO currency for gateway orders (default: INR)
//! - `RAZORPAY_API_BASE` - Gateway base URL (default: <https://api.razorpay.com/v1>)
//! - `TWILIO_VERIFY_API_BASE` - Verify base URL (default: <https://verify.twilio.com/v2>)
//! - `OTP_COUNTRY_CODE` - Prefix for national phone numbers (default: +91)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; `https://` enables secure cookies
    pub base_url: Url,
    /// Cookie signing secret
    pub session_secret: SecretString,
    pub razorpay: RazorpayConfig,
    pub otp: OtpConfig,
    pub log_json: bool,
    pub sentry: SentryConfig,
}

/// Razorpay gateway configuration.
///
/// Implements `Debug` manually to redact the key secret.
#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: SecretString,
    pub currency: String,
    pub api_base: Url,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

/// Twilio Verify configuration for OTP delivery.
#[derive(Clone)]
pub struct OtpConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub service_sid: String,
    /// Prefixed to phone numbers stored without a country code.
    pub country_code: String,
    pub api_base: Url,
}

impl std::fmt::Debug for OtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("service_sid", &self.service_sid)
            .field("country_code", &self.country_code)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

/// Sentry error tracking settings. Tracking is off without a DSN.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("FESTIV_DATABASE_URL")?;
        let host = parse_env("FESTIV_HOST", "127.0.0.1")?;
        let port = parse_env("FESTIV_PORT", "8080")?;
        let base_url = get_url("FESTIV_BASE_URL", None)?;
        let session_secret = get_validated_secret("FESTIV_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "FESTIV_SESSION_SECRET")?;

        let log_json = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            razorpay: RazorpayConfig::from_env()?,
            otp: OtpConfig::from_env()?,
            log_json,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

impl RazorpayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            key_id: get_required_env("RAZORPAY_KEY_ID")?,
            key_secret: get_validated_secret("RAZORPAY_KEY_SECRET")?,
            currency: get_env_or_default("RAZORPAY_CURRENCY", "INR"),
            api_base: get_url("RAZORPAY_API_BASE", Some("https://api.razorpay.com/v1"))?,
        })
    }
}

impl OtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            account_sid: get_required_env("TWILIO_ACCOUNT_SID")?,
            auth_token: get_validated_secret("TWILIO_AUTH_TOKEN")?,
            service_sid: get_required_env("TWILIO_VERIFY_SERVICE_SID")?,
            country_code: get_env_or_default("OTP_COUNTRY_CODE", "+91"),
            api_base: get_url("TWILIO_VERIFY_API_BASE", Some("https://verify.twilio.com/v2"))?,
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a URL variable; required when `default` is `None`.
fn get_url(key: &str, default: Option<&str>) -> Result<Url, ConfigError> {
    let raw = match default {
        Some(default) => get_env_or_default(key, default),
        None => get_required_env(key)?,
    };
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // secrets are far below 2^52 chars
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder values and low-entropy secrets.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("rZp_9Kq2!vL7#tX4") > 3.3);
    }

    #[test]
    fn test_placeholder_secrets_rejected() {
        for value in ["your-razorpay-key", "changeme-now", "PLACEHOLDER-123"] {
            assert!(matches!(
                validate_secret_strength(value, "RAZORPAY_KEY_SECRET"),
                Err(ConfigError::InsecureSecret(_, _))
            ));
        }
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        let err = validate_secret_strength(&"ab".repeat(40), "FESTIV_SESSION_SECRET").unwrap_err();
        assert!(err.to_string().contains("entropy too low"));
    }

    #[test]
    fn test_strong_secret_accepted() {
        assert!(validate_secret_strength("rZp_9Kq2!vL7#tX4mW8@nB3$cD6", "RAZORPAY_KEY_SECRET").is_ok());
    }

    #[test]
    fn test_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("q".repeat(63)), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("q".repeat(64)), "S").is_ok());
    }

    #[test]
    fn test_secure_cookies_follow_base_url_scheme() {
        let mut config = test_config();
        assert!(!config.is_secure());
        config.base_url = Url::parse("https://api.festiv.in").unwrap();
        assert!(config.is_secure());
        assert_eq!(config.socket_addr().port(), 8080);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = test_config();
        let output = format!("{:?} {:?}", config.razorpay, config.otp);
        assert!(output.contains("rzp_test_key"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("gateway-signing-value"));
        assert!(!output.contains("twilio-auth-value"));
    }

    fn test_config() -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/festiv"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            base_url: Url::parse("http://localhost:8080").unwrap(),
            session_secret: SecretString::from("k".repeat(64)),
            razorpay: RazorpayConfig {
                key_id: "rzp_test_key".to_string(),
                key_secret: SecretString::from("gateway-signing-value"),
                currency: "INR".to_string(),
                api_base: Url::parse("https://api.razorpay.com/v1").unwrap(),
            },
            otp: OtpConfig {
                account_sid: "AC123".to_string(),
                auth_token: SecretString::from("twilio-auth-value"),
                service_sid: "VA123".to_string(),
                country_code: "+91".to_string(),
                api_base: Url::parse("https://verify.twilio.com/v2").unwrap(),
            },
            log_json: false,
            sentry: SentryConfig::default(),
        }
    }
}
