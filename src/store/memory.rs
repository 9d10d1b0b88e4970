//! In-process document store
//!
//! Collections hold documents keyed by an insertion sequence number, so
//! "store order" is insertion order. Unique indexes are kept as
//! `BTreeMap<IndexKey, DocId>` and checked on every insert and replace.

use std::collections::{BTreeMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;

use super::backend::{DocumentCursor, DocumentStore, IndexSpec, InsertOutcome};
use super::errors::{StoreError, StoreResult};
use crate::document::{FieldValue, Filter, RawDocument};

type DocId = u64;

/// Index key: one slot per indexed field, `None` when the field is absent
type IndexKey = Vec<Option<FieldValue>>;

#[derive(Debug)]
struct IndexState {
    spec: IndexSpec,
    /// Populated only for unique indexes
    entries: BTreeMap<IndexKey, DocId>,
}

impl IndexState {
    fn key_for(&self, document: &RawDocument) -> IndexKey {
        self.spec.fields().map(|f| document.get(f).cloned()).collect()
    }

    /// Returns true if `document` would collide with a document other than `except`
    fn collides(&self, document: &RawDocument, except: Option<DocId>) -> bool {
        if !self.spec.unique {
            return false;
        }
        match self.entries.get(&self.key_for(document)) {
            Some(existing) => Some(*existing) != except,
            None => false,
        }
    }

    fn add(&mut self, document: &RawDocument, id: DocId) {
        if self.spec.unique {
            let key = self.key_for(document);
            self.entries.insert(key, id);
        }
    }

    fn remove(&mut self, document: &RawDocument) {
        if self.spec.unique {
            let key = self.key_for(document);
            self.entries.remove(&key);
        }
    }
}

#[derive(Debug, Default)]
struct Collection {
    next_id: DocId,
    documents: BTreeMap<DocId, RawDocument>,
    indexes: Vec<IndexState>,
}

impl Collection {
    fn first_match(&self, filter: &Filter) -> Option<DocId> {
        self.documents
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| *id)
    }

    fn insert(&mut self, document: RawDocument) -> InsertOutcome {
        if self.indexes.iter().any(|ix| ix.collides(&document, None)) {
            return InsertOutcome::Conflict;
        }
        let id = self.next_id;
        self.next_id += 1;
        for index in &mut self.indexes {
            index.add(&document, id);
        }
        self.documents.insert(id, document);
        InsertOutcome::Inserted
    }

    fn replace(&mut self, collection: &str, filter: &Filter, document: RawDocument) -> StoreResult<u64> {
        let id = match self.first_match(filter) {
            Some(id) => id,
            None => return Ok(0),
        };
        if self.indexes.iter().any(|ix| ix.collides(&document, Some(id))) {
            return Err(StoreError::Operation(format!(
                "replacement collides with another document in {}",
                collection
            )));
        }
        if let Some(old) = self.documents.remove(&id) {
            for index in &mut self.indexes {
                index.remove(&old);
            }
        }
        for index in &mut self.indexes {
            index.add(&document, id);
        }
        self.documents.insert(id, document);
        Ok(1)
    }

    fn delete(&mut self, filter: &Filter) -> u64 {
        let id = match self.first_match(filter) {
            Some(id) => id,
            None => return 0,
        };
        if let Some(old) = self.documents.remove(&id) {
            for index in &mut self.indexes {
                index.remove(&old);
            }
        }
        1
    }

    fn create_index(&mut self, collection: &str, spec: &IndexSpec) -> StoreResult<()> {
        if let Some(existing) = self.indexes.iter().find(|ix| ix.spec.name == spec.name) {
            if existing.spec == *spec {
                return Ok(());
            }
            return Err(StoreError::IndexConflict {
                collection: collection.to_string(),
                name: spec.name.clone(),
            });
        }

        let mut state = IndexState {
            spec: spec.clone(),
            entries: BTreeMap::new(),
        };
        for (id, document) in &self.documents {
            if state.collides(document, None) {
                return Err(StoreError::Operation(format!(
                    "cannot build unique index {} on {}: duplicate key",
                    spec.name, collection
                )));
            }
            state.add(document, *id);
        }
        self.indexes.push(state);
        Ok(())
    }
}

/// Document store held entirely in process memory.
///
/// Data lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&BTreeMap<String, Collection>) -> T) -> StoreResult<T> {
        let guard = self
            .collections
            .read()
            .map_err(|_| StoreError::Operation("memory store lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Collection>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| StoreError::Operation("memory store lock poisoned".to_string()))?;
        f(&mut guard)
    }

    /// Number of documents in a collection (0 if it does not exist)
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        self.read(|c| c.get(collection).map(|c| c.documents.len()).unwrap_or(0))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.read(|_| ())
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: RawDocument,
    ) -> StoreResult<InsertOutcome> {
        self.write(|c| Ok(c.entry(collection.to_string()).or_default().insert(document)))
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: RawDocument,
    ) -> StoreResult<u64> {
        self.write(|c| match c.get_mut(collection) {
            Some(coll) => coll.replace(collection, filter, document),
            None => Ok(0),
        })
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.write(|c| Ok(c.get_mut(collection).map(|coll| coll.delete(filter)).unwrap_or(0)))
    }

    /// Copies the full matching result set when the find is issued.
    ///
    /// Memory use is bounded by the result size, not by `batch_size`, which
    /// this backend ignores; page size only bounds what the adapter buffers
    /// downstream. Writes after the find are not visible to the cursor.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        _batch_size: u32,
    ) -> StoreResult<Box<dyn DocumentCursor>> {
        let documents = self.read(|c| match c.get(collection) {
            Some(coll) => coll
                .documents
                .values()
                .filter(|doc| filter.matches(doc))
                .cloned()
                .collect(),
            None => VecDeque::new(),
        })?;
        Ok(Box::new(MemoryCursor { documents }))
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()> {
        self.write(|c| {
            c.entry(collection.to_string())
                .or_default()
                .create_index(collection, index)
        })
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.read(|c| c.keys().cloned().collect())
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.write(|c| {
            c.remove(collection);
            Ok(())
        })
    }
}

/// Cursor over the full result set copied when the find was issued
struct MemoryCursor {
    documents: VecDeque<RawDocument>,
}

#[async_trait]
impl DocumentCursor for MemoryCursor {
    async fn next(&mut self) -> Option<StoreResult<RawDocument>> {
        self.documents.pop_front().map(Ok)
    }
}
