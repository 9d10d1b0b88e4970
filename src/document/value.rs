//! Generic document representation exchanged with the store.
//!
//! A stored document is a flat map of field name to typed value. Only the
//! two kinds the adapter writes are modelled.

use std::collections::BTreeMap;

/// A single typed field value.
///
/// Ordering is total and deterministic: every `String` sorts before every
/// `Binary`; within a kind, values compare lexicographically (bytes for
/// `Binary`, UTF-8 bytes for `String`). Comparison filters only ever match
/// values of the same kind as their bound.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    /// UTF-8 string
    String(String),
    /// Opaque byte string
    Binary(Vec<u8>),
}

impl FieldValue {
    /// Create a string value
    pub fn string(v: impl Into<String>) -> Self {
        FieldValue::String(v.into())
    }

    /// Create a binary value
    pub fn binary(v: impl Into<Vec<u8>>) -> Self {
        FieldValue::Binary(v.into())
    }

    /// Returns true if both values are of the same kind
    pub fn same_kind(&self, other: &FieldValue) -> bool {
        matches!(
            (self, other),
            (FieldValue::String(_), FieldValue::String(_))
                | (FieldValue::Binary(_), FieldValue::Binary(_))
        )
    }

    /// Returns the kind name used in decode errors
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Binary(_) => "binary",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            FieldValue::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Binary(b) => Some(b),
            FieldValue::String(_) => None,
        }
    }
}

/// A schemaless stored document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    fields: BTreeMap<String, FieldValue>,
}

impl RawDocument {
    /// Creates an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style
    pub fn with(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Sets a field, returning the previous value
    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(field.into(), value)
    }

    /// Gets a field
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Removes a field
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    /// Iterates fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
