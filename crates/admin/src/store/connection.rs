//! Connection initializer with degraded fallback.
//!
//! [`initialize`] tries each [`ConnectionStrategy`] in a fixed order and
//! returns the first native store that answers its probe. If none does, it
//! returns the REST store tagged as degraded. Initialization never fails.
//!
//! [`ConnectionManager`] memoizes the result for the life of the process and
//! lets an operator re-run the sequence on demand.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::instrument;

use super::native::FirestoreClient;
use super::rest::RestClient;
use super::{NativeStore, RestStore, StoreResult};
use crate::config::StoreConfig;

/// Native initialization strategies, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStrategy {
    Default,
    ForceLongPolling,
    AutoDetectLongPolling,
}

impl ConnectionStrategy {
    pub const ALL: [Self; 3] = [
        Self::Default,
        Self::ForceLongPolling,
        Self::AutoDetectLongPolling,
    ];
}

impl fmt::Display for ConnectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::ForceLongPolling => "force_long_polling",
            Self::AutoDetectLongPolling => "auto_detect_long_polling",
        })
    }
}

/// Builds store clients for the initializer.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Build a native store with `strategy` and verify it responds.
    async fn connect_native(
        &self,
        strategy: ConnectionStrategy,
    ) -> StoreResult<Arc<dyn NativeStore>>;

    /// The REST store used when every native strategy fails.
    fn degraded(&self) -> Arc<dyn RestStore>;
}

/// The live store handle.
#[derive(Clone)]
pub enum Connection {
    Native {
        store: Arc<dyn NativeStore>,
        strategy: ConnectionStrategy,
    },
    Degraded(Arc<dyn RestStore>),
}

impl Connection {
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// Strategy that produced the native handle, `None` when degraded.
    #[must_use]
    pub const fn strategy(&self) -> Option<ConnectionStrategy> {
        match self {
            Self::Native { strategy, .. } => Some(*strategy),
            Self::Degraded(_) => None,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native { store, strategy } => f
                .debug_struct("Native")
                .field("backend", &store.backend())
                .field("strategy", strategy)
                .finish(),
            Self::Degraded(_) => f.write_str("Degraded"),
        }
    }
}

/// Try each strategy in order; fall back to the degraded REST store.
#[instrument(skip(connector))]
pub async fn initialize(connector: &dyn Connector) -> Connection {
    for strategy in ConnectionStrategy::ALL {
        match connector.connect_native(strategy).await {
            Ok(store) => {
                tracing::info!(%strategy, backend = store.backend(), "Native store connected");
                return Connection::Native { store, strategy };
            }
            Err(e) => {
                tracing::warn!(%strategy, error = %e, "Native store strategy failed");
            }
        }
    }

    tracing::warn!("All native strategies failed, using degraded REST store");
    Connection::Degraded(connector.degraded())
}

/// Reported connection health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Native store is live.
    Native { strategy: ConnectionStrategy },
    /// Degraded REST store answers its probe.
    Degraded,
    /// Degraded and the REST probe fails too. Retryable.
    Unreachable,
}

/// Process-wide owner of the store connection.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    current: RwLock<Option<Connection>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            current: RwLock::new(None),
        }
    }

    /// The memoized connection, initializing on first use.
    pub async fn connection(&self) -> Connection {
        if let Some(connection) = self.current.read().await.as_ref() {
            return connection.clone();
        }

        let mut current = self.current.write().await;
        if let Some(connection) = current.as_ref() {
            return connection.clone();
        }
        let connection = initialize(self.connector.as_ref()).await;
        *current = Some(connection.clone());
        connection
    }

    /// Discard the cached connection and run the whole sequence again.
    pub async fn reconnect(&self) -> Connection {
        let mut current = self.current.write().await;
        let connection = initialize(self.connector.as_ref()).await;
        *current = Some(connection.clone());
        connection
    }

    /// Current status; probes the REST store when degraded.
    pub async fn status(&self) -> ConnectionStatus {
        match self.connection().await {
            Connection::Native { strategy, .. } => ConnectionStatus::Native { strategy },
            Connection::Degraded(rest) => match rest.probe().await {
                Ok(()) => ConnectionStatus::Degraded,
                Err(e) => {
                    tracing::error!(error = %e, "Degraded store probe failed");
                    ConnectionStatus::Unreachable
                }
            },
        }
    }
}

/// Connector for the real store.
pub struct FirestoreConnector {
    config: StoreConfig,
    rest: Arc<RestClient>,
}

impl FirestoreConnector {
    /// Create a connector; the REST client is built eagerly.
    ///
    /// # Errors
    ///
    /// Returns error if the REST HTTP client fails to build.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let rest = Arc::new(RestClient::new(&config)?);
        Ok(Self { config, rest })
    }
}

#[async_trait]
impl Connector for FirestoreConnector {
    async fn connect_native(
        &self,
        strategy: ConnectionStrategy,
    ) -> StoreResult<Arc<dyn NativeStore>> {
        let client = FirestoreClient::new(&self.config, strategy)?;
        client.probe().await?;
        Ok(Arc::new(client))
    }

    fn degraded(&self) -> Arc<dyn RestStore> {
        self.rest.clone()
    }
}
