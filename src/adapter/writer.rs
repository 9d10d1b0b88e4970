//! Write coordinator
//!
//! Every write is an insert first. A `Conflict` outcome means the unique
//! key already exists and is turned into a replace of that document.

use std::sync::Arc;

use super::errors::{AdapterError, AdapterResult};
use super::fanout::{fan_out, last_per_key};
use super::require_table;
use crate::document::mapper::{chunk_document, coordinate_filter, hash_filter, to_document};
use crate::document::{Chunk, Filter, IndexEntry, RawDocument};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{InsertOutcome, StoreHandle};

#[derive(Debug, Clone)]
pub struct WriteCoordinator {
    handle: StoreHandle,
    metrics: Arc<MetricsRegistry>,
    max_in_flight: usize,
}

impl WriteCoordinator {
    pub fn new(handle: StoreHandle, metrics: Arc<MetricsRegistry>, max_in_flight: usize) -> Self {
        Self {
            handle,
            metrics,
            max_in_flight,
        }
    }

    /// Insert-or-replace every entry.
    ///
    /// Entries sharing a (table, hash, range) coordinate collapse to the
    /// last one in the batch. On error, entries already written stay written.
    pub async fn write_index_batch(&self, entries: Vec<IndexEntry>) -> AdapterResult<()> {
        for entry in &entries {
            require_table(&entry.table)?;
        }
        let received = entries.len();
        let entries = last_per_key(entries, |e| {
            (e.table.clone(), e.hash.clone(), e.range.clone())
        });
        log_event_with_fields(
            Event::IndexWriteBegin,
            &[
                ("distinct", entries.len().to_string().as_str()),
                ("entries", received.to_string().as_str()),
            ],
        );

        let result = fan_out(entries, self.max_in_flight, |entry| self.write_entry(entry)).await;
        if let Err(e) = &result {
            self.batch_failed(Event::IndexWriteFailed, e);
        }
        result
    }

    async fn write_entry(&self, entry: IndexEntry) -> AdapterResult<()> {
        let document = to_document(&entry.hash, &entry.range, &entry.value).into_raw();
        let conflict_filter = coordinate_filter(&entry.hash, &entry.range);
        let fields = [("hash", entry.hash.as_str()), ("table", entry.table.as_str())];

        match self
            .upsert(&entry.table, &entry.hash, document, &conflict_filter)
            .await?
        {
            InsertOutcome::Inserted => {
                self.metrics.increment_index_inserts();
                log_event_with_fields(Event::IndexInserted, &fields);
            }
            InsertOutcome::Conflict => {
                self.metrics.increment_index_overwrites();
                log_event_with_fields(Event::IndexOverwritten, &fields);
            }
        }
        Ok(())
    }

    /// Store every chunk under its key, replacing any chunk already there
    pub async fn put_chunks(&self, chunks: Vec<Chunk>) -> AdapterResult<()> {
        for chunk in &chunks {
            require_table(&chunk.table)?;
        }
        let received = chunks.len();
        let chunks = last_per_key(chunks, |c| (c.table.clone(), c.key.clone()));
        log_event_with_fields(
            Event::ChunkPutBegin,
            &[
                ("chunks", received.to_string().as_str()),
                ("distinct", chunks.len().to_string().as_str()),
            ],
        );

        let result = fan_out(chunks, self.max_in_flight, |chunk| self.put_chunk(chunk)).await;
        if let Err(e) = &result {
            self.batch_failed(Event::ChunkPutFailed, e);
        }
        result
    }

    async fn put_chunk(&self, chunk: Chunk) -> AdapterResult<()> {
        let document = chunk_document(&chunk.key, &chunk.encoded).into_raw();
        let conflict_filter = hash_filter(&chunk.key);

        match self
            .upsert(&chunk.table, &chunk.key, document, &conflict_filter)
            .await?
        {
            InsertOutcome::Inserted => self.metrics.increment_chunk_inserts(),
            InsertOutcome::Conflict => {
                self.metrics.increment_chunk_overwrites();
                log_event_with_fields(
                    Event::ChunkOverwritten,
                    &[("key", chunk.key.as_str()), ("table", chunk.table.as_str())],
                );
            }
        }
        Ok(())
    }

    /// Chunk deletion is not offered by this store; the call never reaches it.
    pub fn delete_chunk(&self, key: &str) -> AdapterResult<()> {
        log_event_with_fields(Event::ChunkDeleteRejected, &[("key", key)]);
        Err(AdapterError::NotSupported)
    }

    async fn upsert(
        &self,
        table: &str,
        hash: &str,
        document: RawDocument,
        conflict_filter: &Filter,
    ) -> AdapterResult<InsertOutcome> {
        let outcome = self
            .handle
            .insert_one(table, document.clone())
            .await
            .map_err(|e| AdapterError::store("insert", table, hash, e))?;

        if outcome == InsertOutcome::Conflict {
            let matched = self
                .handle
                .replace_one(table, conflict_filter, document)
                .await
                .map_err(|e| AdapterError::store("replace", table, hash, e))?;
            // The conflicting document was deleted between the two calls
            if matched == 0 {
                return Err(AdapterError::ReplaceMissed {
                    table: table.to_string(),
                    hash: hash.to_string(),
                });
            }
        }
        Ok(outcome)
    }

    fn batch_failed(&self, event: Event, err: &AdapterError) {
        self.metrics.increment_batches_failed();
        let reason = err.to_string();
        log_event_with_fields(event, &[("reason", reason.as_str())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::mapper::{decode, to_document};
    use crate::document::Filter;
    use crate::adapter::key_index;
    use crate::store::{DocumentCursor, DocumentStore, FaultyStore, MemoryStore};
    use std::time::Duration;

    fn coordinator() -> (WriteCoordinator, Arc<MemoryStore>, Arc<MetricsRegistry>) {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let handle = StoreHandle::new(store.clone(), Duration::from_secs(5));
        (WriteCoordinator::new(handle, metrics.clone(), 4), store, metrics)
    }

    /// Sequential writer over `store`, with the key index already on "t"
    async fn faulty_coordinator(
        store: FaultyStore,
    ) -> (WriteCoordinator, Arc<FaultyStore>, Arc<MetricsRegistry>) {
        store.inner().create_index("t", &key_index()).await.unwrap();
        let store = Arc::new(store);
        let metrics = Arc::new(MetricsRegistry::new());
        let handle = StoreHandle::new(store.clone(), Duration::from_secs(5));
        (WriteCoordinator::new(handle, metrics.clone(), 1), store, metrics)
    }

    fn entries(ranges: &[&[u8]]) -> Vec<IndexEntry> {
        ranges
            .iter()
            .map(|r| IndexEntry::new("t", "h", r.to_vec(), b"v".to_vec()))
            .collect()
    }

    async fn stored_value(store: &MemoryStore, range: &[u8]) -> Option<Vec<u8>> {
        let filter = coordinate_filter("h", range);
        let docs = drain(store.find("t", &filter, 16).await.unwrap()).await;
        docs.first().map(|d| decode(d).unwrap().value)
    }

    async fn drain(mut cursor: Box<dyn DocumentCursor>) -> Vec<RawDocument> {
        let mut out = Vec::new();
        while let Some(doc) = cursor.next().await {
            out.push(doc.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_empty_table_name_rejected_before_any_write() {
        let (writer, store, _) = coordinator();
        let err = writer
            .write_index_batch(vec![
                IndexEntry::new("t", "h", b"r".to_vec(), b"v".to_vec()),
                IndexEntry::new("", "h", b"r".to_vec(), b"v".to_vec()),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::InvalidRequest(_)));
        assert_eq!(store.count("t").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_in_batch_collapse_to_last() {
        let (writer, store, metrics) = coordinator();
        writer
            .write_index_batch(vec![
                IndexEntry::new("t", "h", b"r".to_vec(), b"first".to_vec()),
                IndexEntry::new("t", "h", b"r".to_vec(), b"second".to_vec()),
            ])
            .await
            .unwrap();

        let docs = drain(store.find("t", &Filter::new(), 16).await.unwrap()).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(decode(&docs[0]).unwrap().value, b"second".to_vec());
        assert_eq!(metrics.snapshot().index_inserts, 1);
    }

    #[tokio::test]
    async fn test_chunk_put_stores_empty_range() {
        let (writer, store, _) = coordinator();
        writer
            .put_chunks(vec![Chunk::new("chunks", "k1", b"payload".to_vec())])
            .await
            .unwrap();

        let docs = drain(store.find("chunks", &Filter::new(), 16).await.unwrap()).await;
        let doc = decode(&docs[0]).unwrap();
        assert_eq!(doc.hash, "k1");
        assert!(doc.range.is_empty());
        assert_eq!(doc.value, b"payload".to_vec());
    }

    // =========================================================================
    // Store Failure Tests
    // =========================================================================

    #[tokio::test]
    async fn test_insert_failure_aborts_batch() {
        let (writer, store, metrics) =
            faulty_coordinator(FaultyStore::new().fail_insert_at(2)).await;

        let err = writer
            .write_index_batch(entries(&[b"a", b"b", b"c", b"d"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AdapterError::Store { operation: "insert", ref table, .. } if table == "t"
        ));
        // Written before the failure and kept; nothing after it started
        assert_eq!(store.inner().count("t").unwrap(), 1);
        assert_eq!(stored_value(store.inner(), b"a").await, Some(b"v".to_vec()));
        assert_eq!(store.inserts_attempted(), 2);
        assert_eq!(metrics.snapshot().index_inserts, 1);
        assert_eq!(metrics.snapshot().batches_failed, 1);
    }

    #[tokio::test]
    async fn test_replace_failure_aborts_batch() {
        let (writer, store, _) = faulty_coordinator(FaultyStore::new().fail_replace_at(1)).await;
        store
            .inner()
            .insert_one("t", to_document("h", b"b", b"old").into_raw())
            .await
            .unwrap();

        let err = writer
            .write_index_batch(vec![
                IndexEntry::new("t", "h", b"a".to_vec(), b"v".to_vec()),
                IndexEntry::new("t", "h", b"b".to_vec(), b"new".to_vec()),
                IndexEntry::new("t", "h", b"c".to_vec(), b"v".to_vec()),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::Store { operation: "replace", .. }));
        assert_eq!(stored_value(store.inner(), b"a").await, Some(b"v".to_vec()));
        assert_eq!(stored_value(store.inner(), b"b").await, Some(b"old".to_vec()));
        assert_eq!(stored_value(store.inner(), b"c").await, None);
        assert_eq!(store.inserts_attempted(), 2);
    }

    #[tokio::test]
    async fn test_replace_matching_nothing_is_reported() {
        let (writer, store, metrics) =
            faulty_coordinator(FaultyStore::new().miss_replace_at(1)).await;
        store
            .inner()
            .insert_one("t", to_document("h", b"b", b"old").into_raw())
            .await
            .unwrap();

        let err = writer
            .write_index_batch(entries(&[b"b"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AdapterError::ReplaceMissed { ref table, ref hash } if table == "t" && hash == "h"
        ));
        assert_eq!(err.status_code(), 502);
        assert_eq!(metrics.snapshot().index_overwrites, 0);
    }

    #[tokio::test]
    async fn test_chunk_insert_failure_surfaces() {
        let (writer, store, _) = faulty_coordinator(FaultyStore::new().fail_insert_at(1)).await;

        let err = writer
            .put_chunks(vec![
                Chunk::new("chunks", "k1", b"x".to_vec()),
                Chunk::new("chunks", "k2", b"y".to_vec()),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::Store { operation: "insert", .. }));
        assert_eq!(store.inserts_attempted(), 1);
        assert_eq!(store.inner().count("chunks").unwrap(), 0);
    }

    #[test]
    fn test_delete_chunk_not_supported() {
        let (writer, _, _) = coordinator();
        let err = writer.delete_chunk("k1").unwrap_err();
        assert_eq!(err.to_string(), "not supported");
    }
}
