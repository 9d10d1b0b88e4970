//! # Document Store Trait

use std::fmt;

use async_trait::async_trait;

use super::errors::StoreResult;
use crate::document::{Filter, RawDocument};

/// Result of an insert that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The document was stored
    Inserted,
    /// A unique index already holds a document with the same key; nothing was written
    Conflict,
}

/// Index key direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    Ascending,
    Descending,
}

impl IndexDirection {
    /// Numeric form used by document stores (1 / -1)
    pub fn as_i32(&self) -> i32 {
        match self {
            IndexDirection::Ascending => 1,
            IndexDirection::Descending => -1,
        }
    }
}

/// A secondary index definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<(String, IndexDirection)>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            unique: false,
        }
    }

    pub fn ascending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), IndexDirection::Ascending));
        self
    }

    pub fn descending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), IndexDirection::Descending));
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Field names in key order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(field, _)| field.as_str())
    }
}

/// Forward-only, non-restartable sequence of documents produced by a find
#[async_trait]
pub trait DocumentCursor: Send {
    /// Next document, `None` once exhausted
    async fn next(&mut self) -> Option<StoreResult<RawDocument>>;
}

/// The capabilities the adapter needs from a document store.
///
/// Collections are created implicitly by the first insert or index
/// creation. Implementations must be safe for concurrent use; the adapter
/// shares one instance across every request without locking.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Round-trip check used at startup
    async fn ping(&self) -> StoreResult<()>;

    /// Insert a document, reporting a unique-index collision as `Conflict`
    async fn insert_one(&self, collection: &str, document: RawDocument)
        -> StoreResult<InsertOutcome>;

    /// Replace the first document matching `filter`. Returns the number matched (0 or 1).
    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: RawDocument,
    ) -> StoreResult<u64>;

    /// Delete the first document matching `filter`. Returns the number deleted (0 or 1).
    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Open a cursor over every document matching `filter`, in store order.
    ///
    /// `batch_size` is a hint for how many documents to fetch per round trip.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        batch_size: u32,
    ) -> StoreResult<Box<dyn DocumentCursor>>;

    /// Create a secondary index. Creating an identical index again succeeds.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()>;

    /// Names of existing collections
    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// Drop a collection and its indexes
    async fn drop_collection(&self, collection: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_spec_builder() {
        let spec = IndexSpec::new("key")
            .ascending("hash")
            .ascending("range")
            .descending("value")
            .unique();

        assert!(spec.unique);
        assert_eq!(spec.fields().collect::<Vec<_>>(), vec!["hash", "range", "value"]);
        assert_eq!(spec.keys[2].1.as_i32(), -1);
    }
}
