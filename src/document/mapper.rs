//! Key/document mapping
//!
//! Canonical stored shape: `{hash: string, range: binary, value: binary}`.
//! Chunks use the same shape with `range` forced to the empty byte string.

use super::errors::DecodeError;
use super::filter::Filter;
use super::model::Row;
use super::value::{FieldValue, RawDocument};

pub const HASH_FIELD: &str = "hash";
pub const RANGE_FIELD: &str = "range";
pub const VALUE_FIELD: &str = "value";

/// Range sentinel for entries without a caller-supplied range key
pub const EMPTY_RANGE: &[u8] = b"";

/// The typed form of a stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub hash: String,
    pub range: Vec<u8>,
    pub value: Vec<u8>,
}

impl Document {
    /// Converts to the generic form written to the store
    pub fn into_raw(self) -> RawDocument {
        RawDocument::new()
            .with(HASH_FIELD, FieldValue::String(self.hash))
            .with(RANGE_FIELD, FieldValue::Binary(self.range))
            .with(VALUE_FIELD, FieldValue::Binary(self.value))
    }
}

pub fn to_document(hash: &str, range: &[u8], value: &[u8]) -> Document {
    Document {
        hash: hash.to_string(),
        range: range.to_vec(),
        value: value.to_vec(),
    }
}

pub fn chunk_document(key: &str, encoded: &[u8]) -> Document {
    to_document(key, EMPTY_RANGE, encoded)
}

/// Drops the hash, which the caller already knows
pub fn from_document(document: Document) -> Row {
    Row {
        range: document.range,
        value: document.value,
    }
}

/// Decodes a stored document. Extra fields (e.g. a store-assigned id) are ignored.
pub fn decode(raw: &RawDocument) -> Result<Document, DecodeError> {
    let hash = match raw.get(HASH_FIELD) {
        Some(FieldValue::String(s)) => s.clone(),
        Some(other) => return Err(wrong_kind(HASH_FIELD, "string", other)),
        None => return Err(DecodeError::MissingField(HASH_FIELD)),
    };
    let range = binary_field(raw, RANGE_FIELD)?;
    let value = binary_field(raw, VALUE_FIELD)?;

    Ok(Document { hash, range, value })
}

fn binary_field(raw: &RawDocument, field: &'static str) -> Result<Vec<u8>, DecodeError> {
    match raw.get(field) {
        Some(FieldValue::Binary(b)) => Ok(b.clone()),
        Some(other) => Err(wrong_kind(field, "binary", other)),
        None => Err(DecodeError::MissingField(field)),
    }
}

fn wrong_kind(field: &'static str, expected: &'static str, found: &FieldValue) -> DecodeError {
    DecodeError::WrongKind {
        field,
        expected,
        found: found.kind(),
    }
}

/// Matches exactly one entry under the (hash, range) uniqueness constraint
pub fn coordinate_filter(hash: &str, range: &[u8]) -> Filter {
    Filter::new()
        .eq(HASH_FIELD, FieldValue::string(hash))
        .eq(RANGE_FIELD, FieldValue::binary(range))
}

/// Matches every entry under a hash
pub fn hash_filter(hash: &str) -> Filter {
    Filter::new().eq(HASH_FIELD, FieldValue::string(hash))
}
