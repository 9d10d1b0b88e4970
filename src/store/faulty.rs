//! Fault-injecting store for adapter tests
//!
//! Wraps a [`MemoryStore`] and fails (or misreports) selected calls. Call
//! numbers are 1-based and counted per operation.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::backend::{DocumentCursor, DocumentStore, IndexSpec, InsertOutcome};
use super::errors::{StoreError, StoreResult};
use super::memory::MemoryStore;
use crate::document::{Filter, RawDocument};

#[derive(Debug, Default)]
pub(crate) struct FaultyStore {
    inner: MemoryStore,
    inserts: AtomicUsize,
    replaces: AtomicUsize,
    deletes: AtomicUsize,
    fail_insert_at: Option<usize>,
    fail_replace_at: Option<usize>,
    miss_replace_at: Option<usize>,
    fail_delete_at: Option<usize>,
}

impl FaultyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_insert_at(mut self, call: usize) -> Self {
        self.fail_insert_at = Some(call);
        self
    }

    pub(crate) fn fail_replace_at(mut self, call: usize) -> Self {
        self.fail_replace_at = Some(call);
        self
    }

    /// The replace at `call` reports 0 matched and writes nothing
    pub(crate) fn miss_replace_at(mut self, call: usize) -> Self {
        self.miss_replace_at = Some(call);
        self
    }

    pub(crate) fn fail_delete_at(mut self, call: usize) -> Self {
        self.fail_delete_at = Some(call);
        self
    }

    /// The wrapped store, for seeding and inspection without counting calls
    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub(crate) fn inserts_attempted(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub(crate) fn deletes_attempted(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

fn next_call(counter: &AtomicUsize) -> usize {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

fn injected(operation: &str, call: usize) -> StoreError {
    StoreError::Operation(format!("injected {} failure on call {}", operation, call))
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: RawDocument,
    ) -> StoreResult<InsertOutcome> {
        let call = next_call(&self.inserts);
        if self.fail_insert_at == Some(call) {
            return Err(injected("insert", call));
        }
        self.inner.insert_one(collection, document).await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: RawDocument,
    ) -> StoreResult<u64> {
        let call = next_call(&self.replaces);
        if self.fail_replace_at == Some(call) {
            return Err(injected("replace", call));
        }
        if self.miss_replace_at == Some(call) {
            return Ok(0);
        }
        self.inner.replace_one(collection, filter, document).await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let call = next_call(&self.deletes);
        if self.fail_delete_at == Some(call) {
            return Err(injected("delete", call));
        }
        self.inner.delete_one(collection, filter).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        batch_size: u32,
    ) -> StoreResult<Box<dyn DocumentCursor>> {
        self.inner.find(collection, filter, batch_size).await
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()> {
        self.inner.create_index(collection, index).await
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.inner.list_collections().await
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.inner.drop_collection(collection).await
    }
}
