//! Query planner
//!
//! Builds the store filter for an [`IndexQuery`] and streams decoded rows
//! back in pages. Chunk fetches share the same paged producer.
//!
//! Filter shapes, prefix taking precedence over start:
//!
//! | prefix | start | value | filter |
//! |--------|-------|-------|--------|
//! | set    | any   | -     | hash = h, range >= start, range < prefix ++ 0xFF |
//! | set    | any   | set   | as above, value = v |
//! | -      | set   | -     | hash = h, range >= start |
//! | -      | set   | set   | hash = h, range >= start, value = v |
//! | -      | -     | -     | hash = h |
//! | -      | -     | set   | hash = h, value = v |

use std::sync::Arc;

use uuid::Uuid;

use super::config::AdapterConfig;
use super::errors::{AdapterError, AdapterResult};
use super::require_table;
use super::stream::{page_channel, PageSender, PageStream};
use crate::document::mapper::{decode, from_document, hash_filter, HASH_FIELD, RANGE_FIELD, VALUE_FIELD};
use crate::document::{Chunk, ChunkRef, FieldValue, Filter, IndexQuery, Row};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{DocumentCursor, StoreHandle};

/// Byte appended to a prefix to form its exclusive upper bound
pub const PREFIX_SENTINEL: u8 = 0xFF;

/// Exclusive upper bound for ranges starting with `prefix`.
///
/// A range that continues the prefix with a 0xFF byte sorts at or above the
/// bound and is not matched.
pub fn prefix_upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut bound = Vec::with_capacity(prefix.len() + 1);
    bound.extend_from_slice(prefix);
    bound.push(PREFIX_SENTINEL);
    bound
}

/// Store filter for `query`
pub fn build_filter(query: &IndexQuery) -> Filter {
    let mut filter = Filter::new().eq(HASH_FIELD, FieldValue::string(query.hash.as_str()));

    if !query.range_prefix.is_empty() {
        filter = filter
            .gte(RANGE_FIELD, FieldValue::binary(query.range_start.as_slice()))
            .lt(RANGE_FIELD, FieldValue::binary(prefix_upper_bound(&query.range_prefix)));
    } else if !query.range_start.is_empty() {
        filter = filter.gte(RANGE_FIELD, FieldValue::binary(query.range_start.as_slice()));
    }

    if let Some(value) = &query.value_equal {
        filter = filter.eq(VALUE_FIELD, FieldValue::binary(value.as_slice()));
    }
    filter
}

#[derive(Debug, Clone)]
pub struct QueryPlanner {
    handle: StoreHandle,
    metrics: Arc<MetricsRegistry>,
    config: AdapterConfig,
}

impl QueryPlanner {
    pub fn new(handle: StoreHandle, metrics: Arc<MetricsRegistry>, config: AdapterConfig) -> Self {
        Self {
            handle,
            metrics,
            config,
        }
    }

    /// Open a cursor for `query` and stream its rows.
    ///
    /// Failing to open the cursor is returned directly; failures while
    /// reading it end the stream with an error item.
    pub async fn query_index(&self, query: IndexQuery) -> AdapterResult<PageStream<Row>> {
        require_table(&query.table)?;
        let query_id = Uuid::new_v4().to_string();
        log_event_with_fields(
            Event::QueryBegin,
            &[
                ("hash", query.hash.as_str()),
                ("query_id", query_id.as_str()),
                ("table", query.table.as_str()),
            ],
        );

        let filter = build_filter(&query);
        let shape = filter.describe();
        log_event_with_fields(
            Event::QueryPlanned,
            &[("filter", shape.as_str()), ("query_id", query_id.as_str())],
        );

        let cursor = match self
            .handle
            .find(&query.table, &filter, self.config.batch_size())
            .await
        {
            Ok(cursor) => cursor,
            Err(e) => {
                let err = AdapterError::store("find", &query.table, &query.hash, e);
                self.query_failed(&query_id, &err);
                return Err(err);
            }
        };

        let (sender, stream) = page_channel(&self.config);
        let planner = self.clone();
        tokio::spawn(async move {
            planner.pump_rows(query_id, query, cursor, sender).await;
        });
        Ok(stream)
    }

    async fn pump_rows(
        self,
        query_id: String,
        query: IndexQuery,
        mut cursor: Box<dyn DocumentCursor>,
        mut sender: PageSender<Row>,
    ) {
        let mut cancelled = false;
        let failure = loop {
            let raw = match cursor.next().await {
                None => break None,
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    break Some(AdapterError::store("query", &query.table, &query.hash, e))
                }
            };
            let row = match decode(&raw) {
                Ok(document) => from_document(document),
                Err(source) => {
                    break Some(AdapterError::Decode {
                        table: query.table.clone(),
                        source,
                    })
                }
            };
            if sender.push(row).await.is_err() {
                cancelled = true;
                break None;
            }
        };

        let delivered = match failure {
            None => {
                if !cancelled && sender.flush().await.is_err() {
                    cancelled = true;
                }
                self.metrics.increment_queries_executed();
                let rows = sender.sent();
                log_event_with_fields(
                    Event::QueryComplete,
                    &[
                        ("cancelled", if cancelled { "true" } else { "false" }),
                        ("query_id", query_id.as_str()),
                        ("rows", rows.to_string().as_str()),
                    ],
                );
                rows
            }
            Some(err) => {
                self.query_failed(&query_id, &err);
                let rows = sender.sent();
                // A closed channel here means the caller already left
                let _ = sender.fail(err).await;
                rows
            }
        };
        self.metrics.add_rows_streamed(delivered);
    }

    /// Stream every stored chunk for the requested keys, in request order.
    /// Keys with nothing stored are skipped.
    pub async fn get_chunks(&self, refs: Vec<ChunkRef>) -> AdapterResult<PageStream<Chunk>> {
        for chunk_ref in &refs {
            require_table(&chunk_ref.table)?;
        }
        log_event_with_fields(
            Event::ChunkGetBegin,
            &[("keys", refs.len().to_string().as_str())],
        );

        let (sender, stream) = page_channel(&self.config);
        let planner = self.clone();
        tokio::spawn(async move {
            planner.pump_chunks(refs, sender).await;
        });
        Ok(stream)
    }

    async fn pump_chunks(self, refs: Vec<ChunkRef>, mut sender: PageSender<Chunk>) {
        let mut failure = None;
        for chunk_ref in &refs {
            match self.fetch_key(chunk_ref, &mut sender).await {
                Ok(FetchOutcome::Found) => {}
                Ok(FetchOutcome::Missing) => log_event_with_fields(
                    Event::ChunkMissing,
                    &[("key", chunk_ref.key.as_str()), ("table", chunk_ref.table.as_str())],
                ),
                Ok(FetchOutcome::Cancelled) => break,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let fetched = match failure {
            None => {
                let _ = sender.flush().await;
                sender.sent()
            }
            Some(err) => {
                self.metrics.increment_batches_failed();
                let reason = err.to_string();
                log_event_with_fields(Event::ChunkGetFailed, &[("reason", reason.as_str())]);
                let fetched = sender.sent();
                let _ = sender.fail(err).await;
                fetched
            }
        };
        self.metrics.add_chunks_fetched(fetched);
    }

    async fn fetch_key(
        &self,
        chunk_ref: &ChunkRef,
        sender: &mut PageSender<Chunk>,
    ) -> AdapterResult<FetchOutcome> {
        let table = chunk_ref.table.as_str();
        let key = chunk_ref.key.as_str();
        let mut cursor = self
            .handle
            .find(table, &hash_filter(key), self.config.batch_size())
            .await
            .map_err(|e| AdapterError::store("find", table, key, e))?;

        let mut found = false;
        while let Some(item) = cursor.next().await {
            let raw = item.map_err(|e| AdapterError::store("get_chunks", table, key, e))?;
            let document = decode(&raw).map_err(|source| AdapterError::Decode {
                table: table.to_string(),
                source,
            })?;
            found = true;
            if sender
                .push(Chunk::new(table, document.hash, document.value))
                .await
                .is_err()
            {
                return Ok(FetchOutcome::Cancelled);
            }
        }
        Ok(if found {
            FetchOutcome::Found
        } else {
            FetchOutcome::Missing
        })
    }

    fn query_failed(&self, query_id: &str, err: &AdapterError) {
        self.metrics.increment_queries_failed();
        let reason = err.to_string();
        log_event_with_fields(
            Event::QueryFailed,
            &[("query_id", query_id), ("reason", reason.as_str())],
        );
    }
}

enum FetchOutcome {
    Found,
    Missing,
    Cancelled,
}
