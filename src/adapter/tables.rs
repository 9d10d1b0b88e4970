//! Table lifecycle
//!
//! A table is one collection. Creating it installs the unique key index on
//! (hash, range), which is what turns a second write at the same coordinate
//! into a conflict, and a non-unique (hash, range, value desc) ordering index.

use super::errors::{AdapterError, AdapterResult};
use super::require_table;
use crate::document::mapper::{HASH_FIELD, RANGE_FIELD, VALUE_FIELD};
use crate::document::TableDesc;
use crate::observability::{log_event_with_fields, Event};
use crate::store::{IndexSpec, StoreError, StoreHandle};

pub const KEY_INDEX_NAME: &str = "hash_range";
pub const ORDER_INDEX_NAME: &str = "hash_range_value";

/// Unique (hash asc, range asc)
pub fn key_index() -> IndexSpec {
    IndexSpec::new(KEY_INDEX_NAME)
        .ascending(HASH_FIELD)
        .ascending(RANGE_FIELD)
        .unique()
}

/// Non-unique (hash asc, range asc, value desc)
pub fn order_index() -> IndexSpec {
    IndexSpec::new(ORDER_INDEX_NAME)
        .ascending(HASH_FIELD)
        .ascending(RANGE_FIELD)
        .descending(VALUE_FIELD)
}

#[derive(Debug, Clone)]
pub struct TableManager {
    handle: StoreHandle,
}

impl TableManager {
    pub fn new(handle: StoreHandle) -> Self {
        Self { handle }
    }

    /// Create the table's indexes. Creating an existing table again succeeds.
    pub async fn create_table(&self, name: &str) -> AdapterResult<()> {
        require_table(name)?;
        for index in [key_index(), order_index()] {
            self.handle
                .create_index(name, &index)
                .await
                .map_err(|e| self.failed("create_table", name, e))?;
        }
        log_event_with_fields(Event::TableCreated, &[("table", name)]);
        Ok(())
    }

    pub async fn list_tables(&self) -> AdapterResult<Vec<String>> {
        let tables = self
            .handle
            .list_collections()
            .await
            .map_err(|e| self.failed("list_tables", "", e))?;
        log_event_with_fields(
            Event::TablesListed,
            &[("count", tables.len().to_string().as_str())],
        );
        Ok(tables)
    }

    /// Drop the table and everything in it
    pub async fn delete_table(&self, name: &str) -> AdapterResult<()> {
        require_table(name)?;
        self.handle
            .drop_collection(name)
            .await
            .map_err(|e| self.failed("delete_table", name, e))?;
        log_event_with_fields(Event::TableDropped, &[("table", name)]);
        Ok(())
    }

    /// Every table reports active; existence is not checked.
    pub fn describe_table(&self, name: &str) -> TableDesc {
        TableDesc {
            name: name.to_string(),
            is_active: true,
        }
    }

    /// Accepted and ignored
    pub fn update_table(&self, _name: &str) {}

    fn failed(&self, operation: &'static str, table: &str, source: StoreError) -> AdapterError {
        let err = AdapterError::table_op(operation, table, source);
        let reason = err.to_string();
        log_event_with_fields(
            Event::TableOpFailed,
            &[("reason", reason.as_str()), ("table", table)],
        );
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_definitions() {
        let key = key_index();
        assert!(key.unique);
        assert_eq!(key.fields().collect::<Vec<_>>(), vec!["hash", "range"]);

        let order = order_index();
        assert!(!order.unique);
        assert_eq!(order.fields().collect::<Vec<_>>(), vec!["hash", "range", "value"]);
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let tables = TableManager::new(StoreHandle::in_memory());
        tables.create_table("index_1").await.unwrap();
        tables.create_table("index_1").await.unwrap();
        tables.create_table("chunks_1").await.unwrap();

        assert_eq!(tables.list_tables().await.unwrap(), vec!["chunks_1", "index_1"]);

        tables.delete_table("index_1").await.unwrap();
        assert_eq!(tables.list_tables().await.unwrap(), vec!["chunks_1"]);
    }

    #[tokio::test]
    async fn test_describe_always_active() {
        let tables = TableManager::new(StoreHandle::in_memory());
        let desc = tables.describe_table("never_created");
        assert_eq!(desc.name, "never_created");
        assert!(desc.is_active);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let tables = TableManager::new(StoreHandle::in_memory());
        assert!(matches!(
            tables.create_table("").await,
            Err(AdapterError::InvalidRequest(_))
        ));
    }
}
