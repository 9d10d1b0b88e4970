//! # Index and chunk store adapter
//!
//! Translates (table, hash, range) coordinates into documents on a shared
//! [`StoreHandle`]:
//!
//! - [`WriteCoordinator`]: insert, replace on conflict
//! - [`QueryPlanner`]: filter construction and paged result streams
//! - [`DeleteCoordinator`]: exact-coordinate deletes
//! - [`TableManager`]: collection and index lifecycle
//!
//! [`IndexStore`] bundles them behind one cloneable value for the RPC layer.

mod config;
mod deleter;
mod errors;
mod fanout;
mod query;
mod stream;
mod tables;
mod writer;

use std::sync::Arc;

pub use config::AdapterConfig;
pub use deleter::DeleteCoordinator;
pub use errors::{AdapterError, AdapterResult};
pub use query::{build_filter, prefix_upper_bound, QueryPlanner, PREFIX_SENTINEL};
pub use stream::PageStream;
pub use tables::{key_index, order_index, TableManager, KEY_INDEX_NAME, ORDER_INDEX_NAME};
pub use writer::WriteCoordinator;

use crate::document::{Chunk, ChunkRef, IndexDelete, IndexEntry, IndexQuery, Row, TableDesc};
use crate::observability::MetricsRegistry;
use crate::store::StoreHandle;

pub(crate) fn require_table(table: &str) -> AdapterResult<()> {
    if table.is_empty() {
        return Err(AdapterError::InvalidRequest("table name is required".to_string()));
    }
    Ok(())
}

/// All coordinators over one store handle and one metrics registry
#[derive(Debug, Clone)]
pub struct IndexStore {
    writer: WriteCoordinator,
    planner: QueryPlanner,
    deleter: DeleteCoordinator,
    tables: TableManager,
    metrics: Arc<MetricsRegistry>,
}

impl IndexStore {
    pub fn new(handle: StoreHandle, config: AdapterConfig) -> Self {
        Self::with_metrics(handle, config, Arc::new(MetricsRegistry::new()))
    }

    pub fn with_metrics(
        handle: StoreHandle,
        config: AdapterConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            writer: WriteCoordinator::new(handle.clone(), metrics.clone(), config.max_in_flight),
            deleter: DeleteCoordinator::new(handle.clone(), metrics.clone(), config.max_in_flight),
            planner: QueryPlanner::new(handle.clone(), metrics.clone(), config),
            tables: TableManager::new(handle),
            metrics,
        }
    }

    /// Store over a fresh in-memory backend with default limits
    pub fn in_memory() -> Self {
        Self::new(StoreHandle::in_memory(), AdapterConfig::default())
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub async fn write_index(&self, entries: Vec<IndexEntry>) -> AdapterResult<()> {
        self.writer.write_index_batch(entries).await
    }

    pub async fn query_index(&self, query: IndexQuery) -> AdapterResult<PageStream<Row>> {
        self.planner.query_index(query).await
    }

    pub async fn delete_index(&self, entries: Vec<IndexDelete>) -> AdapterResult<()> {
        self.deleter.delete_index_batch(entries).await
    }

    pub async fn put_chunks(&self, chunks: Vec<Chunk>) -> AdapterResult<()> {
        self.writer.put_chunks(chunks).await
    }

    pub async fn get_chunks(&self, refs: Vec<ChunkRef>) -> AdapterResult<PageStream<Chunk>> {
        self.planner.get_chunks(refs).await
    }

    /// Always fails with [`AdapterError::NotSupported`]
    pub fn delete_chunks(&self, key: &str) -> AdapterResult<()> {
        self.writer.delete_chunk(key)
    }

    pub async fn list_tables(&self) -> AdapterResult<Vec<String>> {
        self.tables.list_tables().await
    }

    pub async fn create_table(&self, name: &str) -> AdapterResult<()> {
        self.tables.create_table(name).await
    }

    pub async fn delete_table(&self, name: &str) -> AdapterResult<()> {
        self.tables.delete_table(name).await
    }

    pub fn describe_table(&self, name: &str) -> TableDesc {
        self.tables.describe_table(name)
    }

    pub fn update_table(&self, name: &str) {
        self.tables.update_table(name)
    }
}
