//! MongoDB-backed document store (`mongo` feature)
//!
//! Duplicate-key detection inspects write error code 11000; everything else
//! in the adapter only sees [`InsertOutcome`].
//!
//! MongoDB orders BinData by length before content, so `range` is stored and
//! compared as a lowercase hex string. Strings compare byte-wise without a
//! collation, which keeps range and prefix bounds lexicographic.

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::{doc, spec::BinarySubtype, Binary, Bson, Document as BsonDocument};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, Credential, FindOptions, IndexOptions};
use mongodb::{Client, Collection, Cursor, Database, IndexModel};

use super::backend::{DocumentCursor, DocumentStore, IndexSpec, InsertOutcome};
use super::config::StoreConfig;
use super::errors::{StoreError, StoreResult};
use crate::document::mapper::RANGE_FIELD;
use crate::document::{Condition, FieldValue, Filter, RawDocument};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Builds a client for `config`. The driver connects lazily; the
    /// connection manager pings before handing the store out.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(config.connection_uri())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        options.connect_timeout = Some(config.connect_timeout());
        options.server_selection_timeout = Some(config.connect_timeout());
        if let Some((username, password)) = config.credentials() {
            options.credential = Some(
                Credential::builder()
                    .username(username.to_string())
                    .password(password.to_string())
                    .build(),
            );
        }

        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            database: client.database(&config.database),
        })
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection::<BsonDocument>(name)
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

fn op_err(err: MongoError) -> StoreError {
    StoreError::Operation(err.to_string())
}

fn to_bson(field: &str, value: &FieldValue) -> Bson {
    match value {
        FieldValue::String(s) => Bson::String(s.clone()),
        FieldValue::Binary(b) if field == RANGE_FIELD => Bson::String(hex::encode(b)),
        FieldValue::Binary(b) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: b.clone(),
        }),
    }
}

fn to_bson_document(document: &RawDocument) -> BsonDocument {
    let mut out = BsonDocument::new();
    for (field, value) in document.iter() {
        out.insert(field.clone(), to_bson(field, value));
    }
    out
}

/// Fields of kinds the adapter never writes (including `_id`) are dropped;
/// decoding then reports them as missing. A `range` that is not valid hex
/// stays a string and fails decoding as the wrong kind.
fn from_bson_document(document: BsonDocument) -> RawDocument {
    let mut out = RawDocument::new();
    for (field, value) in document {
        match value {
            Bson::String(s) if field == RANGE_FIELD => {
                let value = match hex::decode(&s) {
                    Ok(bytes) => FieldValue::Binary(bytes),
                    Err(_) => FieldValue::String(s),
                };
                out.insert(field, value);
            }
            Bson::String(s) => {
                out.insert(field, FieldValue::String(s));
            }
            Bson::Binary(b) => {
                out.insert(field, FieldValue::Binary(b.bytes));
            }
            _ => {}
        }
    }
    out
}

/// `{"$and": [{field: {"$op": value}}, ...]}`, or `{}` for the match-all filter
fn to_bson_filter(filter: &Filter) -> BsonDocument {
    if filter.is_empty() {
        return BsonDocument::new();
    }
    let clauses: Vec<Bson> = filter
        .clauses()
        .iter()
        .map(|clause| {
            let op = match clause.condition {
                Condition::Eq(_) => "$eq",
                Condition::Gte(_) => "$gte",
                Condition::Lt(_) => "$lt",
            };
            let mut inner = BsonDocument::new();
            inner.insert(op, to_bson(&clause.field, clause.condition.operand()));
            let mut outer = BsonDocument::new();
            outer.insert(clause.field.clone(), inner);
            Bson::Document(outer)
        })
        .collect();
    doc! { "$and": clauses }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> StoreResult<()> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: RawDocument,
    ) -> StoreResult<InsertOutcome> {
        match self
            .collection(collection)
            .insert_one(to_bson_document(&document), None)
            .await
        {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_duplicate_key(&e) => Ok(InsertOutcome::Conflict),
            Err(e) => Err(op_err(e)),
        }
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: RawDocument,
    ) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .replace_one(to_bson_filter(filter), to_bson_document(&document), None)
            .await
            .map_err(op_err)?;
        Ok(result.matched_count)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .delete_one(to_bson_filter(filter), None)
            .await
            .map_err(op_err)?;
        Ok(result.deleted_count)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        batch_size: u32,
    ) -> StoreResult<Box<dyn DocumentCursor>> {
        let options = FindOptions::builder().batch_size(batch_size).build();
        let cursor = self
            .collection(collection)
            .find(to_bson_filter(filter), options)
            .await
            .map_err(op_err)?;
        Ok(Box::new(MongoCursor { cursor }))
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()> {
        let mut keys = BsonDocument::new();
        for (field, direction) in &index.keys {
            keys.insert(field.clone(), direction.as_i32());
        }
        let model = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(index.name.clone())
                    .unique(index.unique)
                    .build(),
            )
            .build();
        self.collection(collection)
            .create_index(model, None)
            .await
            .map(|_| ())
            .map_err(op_err)
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.database
            .list_collection_names(None)
            .await
            .map_err(op_err)
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.collection(collection).drop(None).await.map_err(op_err)
    }
}

struct MongoCursor {
    cursor: Cursor<BsonDocument>,
}

#[async_trait]
impl DocumentCursor for MongoCursor {
    async fn next(&mut self) -> Option<StoreResult<RawDocument>> {
        self.cursor.next().await.map(|item| {
            item.map(from_bson_document)
                .map_err(|e| StoreError::Cursor(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::build_filter;
    use crate::document::mapper::{coordinate_filter, to_document};
    use crate::document::IndexQuery;

    fn stored_range(range: &[u8]) -> String {
        let raw = to_document("h", range, b"v").into_raw();
        to_bson_document(&raw).get_str(RANGE_FIELD).unwrap().to_string()
    }

    fn bound(filter: &BsonDocument, index: usize, op: &str) -> String {
        let clauses = filter.get_array("$and").unwrap();
        clauses[index]
            .as_document()
            .unwrap()
            .get_document(RANGE_FIELD)
            .unwrap()
            .get_str(op)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_document_round_trip_drops_object_id() {
        let raw = to_document("h", b"r", b"v").into_raw();
        let mut bson = to_bson_document(&raw);
        bson.insert("_id", mongodb::bson::oid::ObjectId::new());

        assert_eq!(from_bson_document(bson), raw);
    }

    #[test]
    fn test_filter_shape() {
        let filter = to_bson_filter(&coordinate_filter("h", b"r"));
        let clauses = filter.get_array("$and").unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(
            clauses[0].as_document().unwrap().get_document("hash").unwrap().get_str("$eq").unwrap(),
            "h"
        );
    }

    #[test]
    fn test_range_stored_in_byte_order() {
        // length-first BinData ordering would put "c" below "b\xFF" and "ba"
        assert!(stored_range(b"c") > stored_range(b"b\xFF"));
        assert!(stored_range(b"c") > stored_range(b"ba"));
        assert!(stored_range(b"ba") > stored_range(b"b"));
        assert!(stored_range(b"") < stored_range(b"\x00"));
        assert_eq!(stored_range(b"b\xFF"), "62ff");
    }

    #[test]
    fn test_prefix_bounds_exclude_next_letter() {
        let query = IndexQuery::new("t", "h").with_range_prefix(b"b".to_vec());
        let filter = to_bson_filter(&build_filter(&query));
        let lower = bound(&filter, 1, "$gte");
        let upper = bound(&filter, 2, "$lt");

        for inside in [&b"b"[..], &b"ba"[..], &b"bb"[..]] {
            let stored = stored_range(inside);
            assert!(stored >= lower && stored < upper, "{:?}", inside);
        }
        assert!(stored_range(b"c") >= upper);
    }

    #[test]
    fn test_range_start_keeps_shorter_later_ranges() {
        let query = IndexQuery::new("t", "h").with_range_start(b"ba".to_vec());
        let filter = to_bson_filter(&build_filter(&query));
        let lower = bound(&filter, 1, "$gte");

        for kept in [&b"ba"[..], &b"bb"[..], &b"c"[..]] {
            assert!(stored_range(kept) >= lower, "{:?}", kept);
        }
        assert!(stored_range(b"b") < lower);
    }

    #[test]
    fn test_range_round_trips_through_hex() {
        let raw = to_document("h", b"b\xFF\x00", b"v").into_raw();
        let bson = to_bson_document(&raw);
        assert!(bson.get_binary_generic("value").is_ok());
        assert_eq!(from_bson_document(bson), raw);
    }

    #[test]
    fn test_non_hex_range_stays_string() {
        let bson = doc! { "hash": "h", "range": "zz", "value": Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: b"v".to_vec(),
        }) };
        let raw = from_bson_document(bson);
        assert_eq!(raw.get(RANGE_FIELD), Some(&FieldValue::string("zz")));
    }

    #[test]
    fn test_empty_filter() {
        assert!(to_bson_filter(&Filter::new()).is_empty());
    }
}
