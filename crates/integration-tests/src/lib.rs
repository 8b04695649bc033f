//! Integration tests for the skincare admin service.
//!
//! Every test runs against the in-memory store, either through the data
//! layer directly or through the full router with `tower::ServiceExt::oneshot`.
//! No network access or credentials are needed.
//!
//! ```bash
//! cargo test -p skincare-admin-integration-tests
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use skincare_admin::{
    data::DataAccess,
    services::accounts::{AccountError, AccountProvider, ValidAccount},
    state::AppState,
    store::{ConnectionStrategy, MemoryConnector, MemoryStore},
};
use skincare_admin_core::{FieldValue, Fields};
use tower::ServiceExt;

/// Dashboard and list fetch limit used by test state.
pub const TEST_FETCH_LIMIT: usize = 20;

/// Account provider that hands out sequential ids.
#[derive(Default)]
pub struct FakeAccounts {
    issued: std::sync::atomic::AtomicUsize,
}

impl FakeAccounts {
    #[must_use]
    pub fn issued(&self) -> usize {
        self.issued.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountProvider for FakeAccounts {
    async fn sign_up(&self, _account: &ValidAccount) -> Result<String, AccountError> {
        let n = self
            .issued
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(format!("uid-{n}"))
    }
}

/// In-memory store wired into application state.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub connector: Arc<MemoryConnector>,
    pub accounts: Arc<FakeAccounts>,
    pub state: AppState,
}

impl TestContext {
    /// Context whose native connection succeeds on the first strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_failing(&[])
    }

    /// Context where every native strategy fails, forcing the REST path.
    #[must_use]
    pub fn degraded() -> Self {
        Self::with_failing(&ConnectionStrategy::ALL)
    }

    #[must_use]
    pub fn with_failing(strategies: &[ConnectionStrategy]) -> Self {
        let store = Arc::new(MemoryStore::new());
        let connector = Arc::new(MemoryConnector::new(store.clone()).fail_strategies(strategies));
        let accounts = Arc::new(FakeAccounts::default());
        let state = AppState::from_parts(
            connector.clone(),
            Some(accounts.clone() as Arc<dyn AccountProvider>),
            TEST_FETCH_LIMIT,
        );
        Self {
            store,
            connector,
            accounts,
            state,
        }
    }

    #[must_use]
    pub fn data(&self) -> &DataAccess {
        self.state.data()
    }

    #[must_use]
    pub fn router(&self) -> Router {
        skincare_admin::app(self.state.clone())
    }

    /// Insert a document, panicking on a malformed path.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a document path.
    pub fn seed(&self, path: &str, fields: &[(&str, FieldValue)]) {
        let fields: Fields = fields
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect();
        if let Err(e) = self.store.insert(path, fields) {
            panic!("invalid seed path {path}: {e}");
        }
    }

    /// Send a request through the router and return status and body bytes.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = match self.router().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let bytes = match to_bytes(response.into_body(), usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => panic!("failed to read body: {e}"),
        };
        (status, bytes.to_vec())
    }

    /// GET `uri` and parse the body as JSON (`Value::Null` when not JSON).
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.send(request("GET", uri, Body::empty(), None)).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    /// Send a JSON body with `method` and return status and raw body.
    pub async fn send_json(&self, method: &str, uri: &str, body: &Value) -> (StatusCode, Vec<u8>) {
        self.send(request(
            method,
            uri,
            Body::from(body.to_string()),
            Some("application/json"),
        ))
        .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a request.
///
/// # Panics
///
/// Panics if `method` or `uri` is invalid.
#[must_use]
pub fn request(method: &str, uri: &str, body: Body, content_type: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    match builder.body(body) {
        Ok(request) => request,
        Err(e) => panic!("invalid request {method} {uri}: {e}"),
    }
}
