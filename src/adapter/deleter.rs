//! Delete coordinator

use std::sync::Arc;

use super::errors::{AdapterError, AdapterResult};
use super::fanout::fan_out;
use super::require_table;
use crate::document::mapper::coordinate_filter;
use crate::document::IndexDelete;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::StoreHandle;

#[derive(Debug, Clone)]
pub struct DeleteCoordinator {
    handle: StoreHandle,
    metrics: Arc<MetricsRegistry>,
    max_in_flight: usize,
}

impl DeleteCoordinator {
    pub fn new(handle: StoreHandle, metrics: Arc<MetricsRegistry>, max_in_flight: usize) -> Self {
        Self {
            handle,
            metrics,
            max_in_flight,
        }
    }

    /// Remove the document at each exact coordinate.
    ///
    /// A coordinate with nothing stored is skipped. The first store failure
    /// aborts the batch; deletes already applied stay applied.
    pub async fn delete_index_batch(&self, entries: Vec<IndexDelete>) -> AdapterResult<()> {
        for entry in &entries {
            require_table(&entry.table)?;
        }
        log_event_with_fields(
            Event::IndexDeleteBegin,
            &[("entries", entries.len().to_string().as_str())],
        );

        let result = fan_out(entries, self.max_in_flight, |entry| self.delete_entry(entry)).await;
        if let Err(e) = &result {
            self.metrics.increment_batches_failed();
            let reason = e.to_string();
            log_event_with_fields(Event::IndexDeleteFailed, &[("reason", reason.as_str())]);
        }
        result
    }

    async fn delete_entry(&self, entry: IndexDelete) -> AdapterResult<()> {
        let deleted = self
            .handle
            .delete_one(&entry.table, &coordinate_filter(&entry.hash, &entry.range))
            .await
            .map_err(|e| AdapterError::store("delete", &entry.table, &entry.hash, e))?;
        if deleted > 0 {
            self.metrics.increment_index_deletes();
        }
        Ok(())
    }
}
