//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AdminConfig;
use crate::data::DataAccess;
use crate::services::{AccountError, AccountProvider, IdentityClient};
use crate::store::{ConnectionManager, Connector, FirestoreConnector, StoreError};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("store client error: {0}")]
    Store(#[from] StoreError),
    #[error("identity client error: {0}")]
    Identity(#[from] AccountError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The store connection is established lazily on
/// first use and cached by the [`ConnectionManager`].
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    data: DataAccess,
    accounts: Option<Arc<dyn AccountProvider>>,
    stats_fetch_limit: usize,
}

impl AppState {
    /// Create state backed by the configured remote store.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn new(config: &AdminConfig) -> Result<Self, StateError> {
        let connector = FirestoreConnector::new(config.store.clone())?;
        let accounts = match &config.identity {
            Some(identity) => {
                Some(Arc::new(IdentityClient::new(identity)?) as Arc<dyn AccountProvider>)
            }
            None => {
                tracing::warn!("STORE_API_KEY not set, account creation disabled");
                None
            }
        };
        Ok(Self::from_parts(
            Arc::new(connector),
            accounts,
            config.stats_fetch_limit,
        ))
    }

    /// Assemble state from an arbitrary connector and account provider.
    #[must_use]
    pub fn from_parts(
        connector: Arc<dyn Connector>,
        accounts: Option<Arc<dyn AccountProvider>>,
        stats_fetch_limit: usize,
    ) -> Self {
        let connections = Arc::new(ConnectionManager::new(connector));
        Self {
            inner: Arc::new(AppStateInner {
                data: DataAccess::new(connections),
                accounts,
                stats_fetch_limit,
            }),
        }
    }

    /// Get a reference to the data access layer.
    #[must_use]
    pub fn data(&self) -> &DataAccess {
        &self.inner.data
    }

    /// Get the account provider, if account creation is enabled.
    #[must_use]
    pub fn accounts(&self) -> Option<&dyn AccountProvider> {
        self.inner.accounts.as_deref()
    }

    /// Documents fetched per collection for dashboard figures and exports.
    #[must_use]
    pub fn stats_fetch_limit(&self) -> usize {
        self.inner.stats_fetch_limit
    }
}
