//! Connection manager and the shared store handle
//!
//! The handle is created once at startup and cloned into every coordinator.
//! Each call made through it is bounded by the configured operation timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::backend::{DocumentCursor, DocumentStore, IndexSpec, InsertOutcome};
use super::config::{BackendKind, StoreConfig};
use super::errors::{StoreError, StoreResult};
use super::memory::MemoryStore;
use crate::document::{Filter, RawDocument};
use crate::observability::{log_event_with_fields, Event};

/// Long-lived handle to one document store session
#[derive(Debug, Clone)]
pub struct StoreHandle {
    store: Arc<dyn DocumentStore>,
    op_timeout: Duration,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn DocumentStore>, op_timeout: Duration) -> Self {
        Self { store, op_timeout }
    }

    /// Handle over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Duration::from_secs(10))
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        bounded(self.op_timeout, operation, fut).await
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.bounded("ping", self.store.ping()).await
    }

    pub async fn insert_one(
        &self,
        collection: &str,
        document: RawDocument,
    ) -> StoreResult<InsertOutcome> {
        self.bounded("insert_one", self.store.insert_one(collection, document))
            .await
    }

    pub async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: RawDocument,
    ) -> StoreResult<u64> {
        self.bounded("replace_one", self.store.replace_one(collection, filter, document))
            .await
    }

    pub async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.bounded("delete_one", self.store.delete_one(collection, filter))
            .await
    }

    /// Open a cursor; every later `next` is bounded by the same timeout
    pub async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        batch_size: u32,
    ) -> StoreResult<Box<dyn DocumentCursor>> {
        let inner = self
            .bounded("find", self.store.find(collection, filter, batch_size))
            .await?;
        Ok(Box::new(TimedCursor {
            inner,
            timeout: self.op_timeout,
        }))
    }

    pub async fn create_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()> {
        self.bounded("create_index", self.store.create_index(collection, index))
            .await
    }

    pub async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.bounded("list_collections", self.store.list_collections())
            .await
    }

    pub async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.bounded("drop_collection", self.store.drop_collection(collection))
            .await
    }
}

async fn bounded<T>(
    timeout: Duration,
    operation: &'static str,
    fut: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

struct TimedCursor {
    inner: Box<dyn DocumentCursor>,
    timeout: Duration,
}

#[async_trait]
impl DocumentCursor for TimedCursor {
    async fn next(&mut self) -> Option<StoreResult<RawDocument>> {
        match tokio::time::timeout(self.timeout, self.inner.next()).await {
            Ok(item) => item,
            Err(_) => Some(Err(StoreError::Timeout {
                operation: "cursor_next",
                timeout_ms: self.timeout.as_millis() as u64,
            })),
        }
    }
}

/// Opens and verifies the store session described by a [`StoreConfig`]
pub struct ConnectionManager;

impl ConnectionManager {
    /// Connect and ping within the connect timeout.
    ///
    /// Any failure is a connection error; the caller must not start serving.
    pub async fn connect(config: &StoreConfig) -> StoreResult<StoreHandle> {
        let uri = config.connection_uri();
        let result = bounded(config.connect_timeout(), "connect", async {
            let store = Self::open(config).await?;
            store
                .ping()
                .await
                .map_err(|e| StoreError::Connection(format!("ping failed: {}", e)))?;
            Ok(store)
        })
        .await
        .map_err(|e| match e {
            StoreError::Connection(_) => e,
            other => StoreError::Connection(other.to_string()),
        });

        match result {
            Ok(store) => {
                log_event_with_fields(
                    Event::StoreConnected,
                    &[
                        ("backend", backend_name(config.backend)),
                        ("database", config.database.as_str()),
                        ("uri", uri.as_str()),
                    ],
                );
                Ok(StoreHandle::new(store, config.operation_timeout()))
            }
            Err(e) => {
                let reason = e.to_string();
                log_event_with_fields(
                    Event::StoreConnectFailed,
                    &[
                        ("backend", backend_name(config.backend)),
                        ("reason", reason.as_str()),
                        ("uri", uri.as_str()),
                    ],
                );
                Err(e)
            }
        }
    }

    async fn open(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
        match config.backend {
            BackendKind::Memory => Ok(Arc::new(MemoryStore::new())),
            #[cfg(feature = "mongo")]
            BackendKind::Mongo => Ok(Arc::new(super::mongo::MongoStore::connect(config).await?)),
            #[cfg(not(feature = "mongo"))]
            BackendKind::Mongo => Err(StoreError::Connection(
                "mongo backend requires building with the `mongo` feature".to_string(),
            )),
        }
    }
}

fn backend_name(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Memory => "memory",
        BackendKind::Mongo => "mongo",
    }
}
