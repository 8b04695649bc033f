//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STORE_PROJECT_ID` - Project id of the remote document store
//!
//! ## Optional
//! - `STORE_BASE_URL` - Store API origin (default: <https://firestore.googleapis.com>)
//! - `STORE_API_KEY` - Web API key, sent as the `key` query parameter
//! - `STORE_ACCESS_TOKEN` - OAuth bearer token for the store
//! - `STORE_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `IDENTITY_BASE_URL` - Identity API origin (default: <https://identitytoolkit.googleapis.com>)
//! - `STATS_FETCH_LIMIT` - Documents fetched per collection for dashboard stats (default: 20)
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT` - PEM-encoded certificate chain
//! - `ADMIN_TLS_KEY` - PEM-encoded private key
//!
//! Account creation is only enabled when `STORE_API_KEY` is set, since the
//! identity API requires it.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_STORE_BASE_URL: &str = "https://firestore.googleapis.com";
const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
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
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Remote document store
    pub store: StoreConfig,
    /// Identity API for account creation (requires an API key)
    pub identity: Option<IdentityConfig>,
    /// Upper bound on documents fetched per collection for dashboard stats
    pub stats_fetch_limit: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Remote document store configuration.
///
/// Implements `Debug` manually to redact credentials.
#[derive(Clone)]
pub struct StoreConfig {
    pub project_id: String,
    /// API origin; paths are appended under `/v1/projects/...`
    pub base_url: Url,
    pub api_key: Option<SecretString>,
    pub access_token: Option<SecretString>,
    /// Applied to every store request
    pub timeout: Duration,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Identity API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct IdentityConfig {
    pub base_url: Url,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("ADMIN_TLS_CERT");
        let key_pem = get_optional_env("ADMIN_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "ADMIN_TLS_*".to_string(),
                "Both ADMIN_TLS_CERT and ADMIN_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = get_env_or_default("STORE_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STORE_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            project_id: get_required_env("STORE_PROJECT_ID")?,
            base_url: get_url("STORE_BASE_URL", DEFAULT_STORE_BASE_URL)?,
            api_key: get_optional_secret("STORE_API_KEY"),
            access_token: get_optional_secret("STORE_ACCESS_TOKEN"),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl IdentityConfig {
    /// Returns `None` when the store has no API key (account creation disabled).
    fn from_env(store: &StoreConfig) -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = store.api_key.clone() else {
            return Ok(None);
        };
        Ok(Some(Self {
            base_url: get_url("IDENTITY_BASE_URL", DEFAULT_IDENTITY_BASE_URL)?,
            api_key,
            timeout: store.timeout,
        }))
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let store = StoreConfig::from_env()?;
        let identity = IdentityConfig::from_env(&store)?;
        let stats_fetch_limit = get_env_or_default("STATS_FETCH_LIMIT", "20")
            .parse::<usize>()
            .ok()
            .filter(|limit| *limit > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "STATS_FETCH_LIMIT".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            host,
            port,
            store,
            identity,
            stats_fetch_limit,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a URL-valued environment variable with a default.
fn get_url(key: &str, default: &str) -> Result<Url, ConfigError> {
    Url::parse(&get_env_or_default(key, default))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get an optional secret, warning if it looks like a placeholder.
fn get_optional_secret(key: &str) -> Option<SecretString> {
    get_optional_env(key).map(|value| {
        if let Err(reason) = check_secret_strength(&value) {
            tracing::warn!("{key} validation warning: {reason}");
        }
        SecretString::from(value)
    })
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

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholders and low-entropy values.
fn check_secret_strength(secret: &str) -> Result<(), String> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(format!("appears to be a placeholder (contains '{pattern}')"));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!(shannon_entropy("aaaaaaa").abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_check_secret_strength() {
        assert!(check_secret_strength("your-api-key-here").is_err());
        assert!(check_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa").is_err());
        assert!(check_secret_strength("AIzaSyD3x9Kq-7LmNpR2sTuVwXyZ01b4c6e8g").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = AdminConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            store: StoreConfig {
                project_id: "skincare-demo".to_string(),
                base_url: Url::parse(DEFAULT_STORE_BASE_URL).unwrap(),
                api_key: None,
                access_token: None,
                timeout: Duration::from_secs(30),
            },
            identity: None,
            stats_fetch_limit: 20,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
            tls: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_store_config_debug_redacts_secrets() {
        let config = StoreConfig {
            project_id: "skincare-demo".to_string(),
            base_url: Url::parse(DEFAULT_STORE_BASE_URL).unwrap(),
            api_key: Some(SecretString::from("super-secret-api-key")),
            access_token: Some(SecretString::from("ya29.super-secret-token")),
            timeout: Duration::from_secs(30),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("skincare-demo"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-api-key"));
        assert!(!debug_output.contains("super-secret-token"));
    }

    #[test]
    fn test_identity_requires_api_key() {
        let mut store = StoreConfig {
            project_id: "p".to_string(),
            base_url: Url::parse(DEFAULT_STORE_BASE_URL).unwrap(),
            api_key: None,
            access_token: None,
            timeout: Duration::from_secs(5),
        };
        assert!(IdentityConfig::from_env(&store).unwrap().is_none());

        store.api_key = Some(SecretString::from("k"));
        let identity = IdentityConfig::from_env(&store).unwrap().unwrap();
        assert_eq!(identity.timeout, Duration::from_secs(5));
    }
}
