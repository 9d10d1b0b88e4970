//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase, reset only on process start
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by every coordinator.
///
/// Uses Relaxed ordering; counters are independent of each other.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Index entries stored by a fresh insert
    index_inserts: AtomicU64,
    /// Index entries stored by replacing a conflicting document
    index_overwrites: AtomicU64,
    /// Index entries deleted
    index_deletes: AtomicU64,
    /// Queries completed
    queries_executed: AtomicU64,
    /// Queries aborted
    queries_failed: AtomicU64,
    /// Rows sent on query streams
    rows_streamed: AtomicU64,
    /// Chunks stored by a fresh insert
    chunk_inserts: AtomicU64,
    /// Chunks stored by replacing a conflicting document
    chunk_overwrites: AtomicU64,
    /// Chunks returned by GetChunks
    chunks_fetched: AtomicU64,
    /// Batches aborted by a store failure
    batches_failed: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_index_inserts(&self) {
        self.index_inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_index_overwrites(&self) {
        self.index_overwrites.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_index_deletes(&self) {
        self.index_deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Add rows sent on a stream page
    pub fn add_rows_streamed(&self, rows: u64) {
        self.rows_streamed.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn increment_chunk_inserts(&self) {
        self.chunk_inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunk_overwrites(&self) {
        self.chunk_overwrites.fetch_add(1, Ordering::Relaxed);
    }

    /// Add chunks returned by a fetch
    pub fn add_chunks_fetched(&self, chunks: u64) {
        self.chunks_fetched.fetch_add(chunks, Ordering::Relaxed);
    }

    pub fn increment_batches_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a point-in-time snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            index_inserts: self.index_inserts.load(Ordering::Relaxed),
            index_overwrites: self.index_overwrites.load(Ordering::Relaxed),
            index_deletes: self.index_deletes.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            rows_streamed: self.rows_streamed.load(Ordering::Relaxed),
            chunk_inserts: self.chunk_inserts.load(Ordering::Relaxed),
            chunk_overwrites: self.chunk_overwrites.load(Ordering::Relaxed),
            chunks_fetched: self.chunks_fetched.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub index_inserts: u64,
    pub index_overwrites: u64,
    pub index_deletes: u64,
    pub queries_executed: u64,
    pub queries_failed: u64,
    pub rows_streamed: u64,
    pub chunk_inserts: u64,
    pub chunk_overwrites: u64,
    pub chunks_fetched: u64,
    pub batches_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();

        assert_eq!(snapshot.index_inserts, 0);
        assert_eq!(snapshot.index_overwrites, 0);
        assert_eq!(snapshot.rows_streamed, 0);
    }

    #[test]
    fn test_insert_and_overwrite_counted_separately() {
        let registry = MetricsRegistry::new();

        registry.increment_index_inserts();
        registry.increment_index_inserts();
        registry.increment_index_overwrites();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.index_inserts, 2);
        assert_eq!(snapshot.index_overwrites, 1);
    }

    #[test]
    fn test_rows_streamed_accumulates() {
        let registry = MetricsRegistry::new();

        registry.add_rows_streamed(100);
        registry.add_rows_streamed(24);
        assert_eq!(registry.snapshot().rows_streamed, 124);
    }

    #[test]
    fn test_snapshot_serializes() {
        let registry = MetricsRegistry::new();
        registry.increment_chunk_inserts();

        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["chunk_inserts"], 1);
        assert_eq!(json["batches_failed"], 0);
    }
}
