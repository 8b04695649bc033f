//! Admin-initiated account creation.
//!
//! An account is registered with the identity API first, then its profile
//! document is created at `users/{localId}`. Both steps require a native
//! store connection; the check runs before the identity call so a degraded
//! connection never leaves an account without a profile.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use skincare_admin_core::{Email, FieldValue, Fields};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use super::ValidationError;
use crate::config::IdentityConfig;
use crate::data::{DataAccess, USERS};
use crate::store::{CollectionPath, StoreError};

/// Minimum password length accepted by the identity API.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Provider tag written to profiles created here.
const PASSWORD_PROVIDER: &str = "password";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity API rejected the request (e.g. `EMAIL_EXISTS`).
    #[error("Identity API error: {status} - {message}")]
    Identity { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// No identity API key is configured.
    #[error("Account creation is not configured")]
    NotConfigured,
}

/// New account input.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl std::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// A request that passed validation.
#[derive(Clone)]
pub struct ValidAccount {
    pub email: Email,
    password: String,
    pub display_name: String,
}

impl ValidAccount {
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl CreateUserRequest {
    /// Validate without any network access.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a malformed email, a short password,
    /// or an empty display name.
    pub fn validate(self) -> Result<ValidAccount, ValidationError> {
        let email = Email::parse(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        let display_name = self.display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::Required("displayName"));
        }
        Ok(ValidAccount {
            email,
            password: self.password,
            display_name: display_name.to_string(),
        })
    }
}

/// Registers credentials with an identity backend.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Register the account and return its user id.
    async fn sign_up(&self, account: &ValidAccount) -> Result<String, AccountError>;
}

/// Created account, as returned to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAccount {
    pub id: String,
    pub email: Email,
    pub display_name: String,
}

/// Create an account and its profile document.
///
/// # Errors
///
/// Returns [`AccountError::Validation`] before any network call,
/// [`StoreError::Unsupported`] on a degraded connection, or the identity or
/// store error.
#[instrument(skip(data, provider, request))]
pub async fn create_account(
    data: &DataAccess,
    provider: &dyn AccountProvider,
    request: CreateUserRequest,
) -> Result<CreatedAccount, AccountError> {
    let account = request.validate()?;
    if data.connections().connection().await.is_degraded() {
        return Err(StoreError::Unsupported("account creation").into());
    }

    let id = provider.sign_up(&account).await?;
    let profile = CollectionPath::parse(USERS)?.doc(&id)?;
    let fields = Fields::from([
        ("email".to_string(), FieldValue::from(account.email.as_str())),
        (
            "displayName".to_string(),
            FieldValue::from(account.display_name.as_str()),
        ),
        ("provider".to_string(), FieldValue::from(PASSWORD_PROVIDER)),
    ]);
    data.create_at(&profile, fields).await?;

    tracing::info!(user_id = %id, "Account created");
    Ok(CreatedAccount {
        id,
        email: account.email,
        display_name: account.display_name,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    id_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileBody<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
struct IdentityErrorBody {
    error: IdentityErrorDetail,
}

#[derive(Deserialize)]
struct IdentityErrorDetail {
    message: String,
}

/// Identity REST API client.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    config: IdentityConfig,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, AccountError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                config: config.clone(),
            }),
        })
    }

    fn endpoint(&self, method: &str) -> Result<Url, AccountError> {
        let config = &self.inner.config;
        let mut url = config
            .base_url
            .join(&format!("v1/accounts:{method}"))
            .map_err(|e| AccountError::Parse(format!("Invalid identity URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", config.api_key.expose_secret());
        Ok(url)
    }

    async fn post<T: serde::de::DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, AccountError> {
        let url = self.endpoint(method)?;
        let response = self.inner.client.post(url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AccountError::Parse(format!("Failed to parse response: {e}")));
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<IdentityErrorBody>(&text)
            .map_or(text, |body| body.error.message);
        Err(AccountError::Identity {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl AccountProvider for IdentityClient {
    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn sign_up(&self, account: &ValidAccount) -> Result<String, AccountError> {
        let created: SignUpResponse = self
            .post(
                "signUp",
                &SignUpBody {
                    email: account.email.as_str(),
                    password: account.password(),
                    return_secure_token: true,
                },
            )
            .await?;

        let _: serde_json::Value = self
            .post(
                "update",
                &UpdateProfileBody {
                    id_token: &created.id_token,
                    display_name: &account.display_name,
                    return_secure_token: false,
                },
            )
            .await?;
        Ok(created.local_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{ConnectionManager, MemoryConnector, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedId(AtomicUsize);

    #[async_trait]
    impl AccountProvider for FixedId {
        async fn sign_up(&self, _account: &ValidAccount) -> Result<String, AccountError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("uid-1".to_string())
        }
    }

    fn request(email: &str, password: &str, name: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
            display_name: name.to_string(),
        }
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            request("not-an-email", "secret1", "A").validate(),
            Err(ValidationError::Email(_))
        ));
        assert_eq!(
            request("a@b.co", "12345", "A").validate().err(),
            Some(ValidationError::PasswordTooShort { min: 6 })
        );
        assert_eq!(
            request("a@b.co", "123456", "  ").validate().err(),
            Some(ValidationError::Required("displayName"))
        );
        let valid = request(" a@b.co ", "123456", " Aiko ").validate().unwrap();
        assert_eq!(valid.display_name, "Aiko");
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", request("a@b.co", "hunter22", "A"));
        assert!(!debug.contains("hunter22"));
    }

    #[tokio::test]
    async fn test_create_account_writes_profile() {
        let store = Arc::new(MemoryStore::new());
        let manager = ConnectionManager::new(Arc::new(MemoryConnector::new(store.clone())));
        let data = DataAccess::new(Arc::new(manager));
        let provider = FixedId(AtomicUsize::new(0));

        let created = create_account(&data, &provider, request("a@b.co", "123456", "Aiko"))
            .await
            .unwrap();

        assert_eq!(created.id, "uid-1");
        let profile = store.fields("users/uid-1").unwrap();
        assert_eq!(profile["provider"], FieldValue::from("password"));
        assert!(profile.contains_key("createdAt"));
    }

    #[tokio::test]
    async fn test_degraded_connection_skips_identity_call() {
        let store = Arc::new(MemoryStore::new());
        let connector = MemoryConnector::new(store).fail_strategies(&crate::store::ConnectionStrategy::ALL);
        let data = DataAccess::new(Arc::new(ConnectionManager::new(Arc::new(connector))));
        let provider = FixedId(AtomicUsize::new(0));

        let err = create_account(&data, &provider, request("a@b.co", "123456", "Aiko"))
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::Store(StoreError::Unsupported(_))));
        assert_eq!(provider.0.load(Ordering::SeqCst), 0);
    }
}
