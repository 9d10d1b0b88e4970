//! Logical request and response units.

/// A logical index write: insert-or-replace at (table, hash, range)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub table: String,
    pub hash: String,
    pub range: Vec<u8>,
    pub value: Vec<u8>,
}

impl IndexEntry {
    pub fn new(
        table: impl Into<String>,
        hash: impl Into<String>,
        range: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            table: table.into(),
            hash: hash.into(),
            range: range.into(),
            value: value.into(),
        }
    }

    /// The (table, hash, range) coordinate of this entry
    pub fn coordinate(&self) -> (&str, &str, &[u8]) {
        (&self.table, &self.hash, &self.range)
    }
}

/// A logical index delete at an exact (table, hash, range)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDelete {
    pub table: String,
    pub hash: String,
    pub range: Vec<u8>,
}

impl IndexDelete {
    pub fn new(
        table: impl Into<String>,
        hash: impl Into<String>,
        range: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            table: table.into(),
            hash: hash.into(),
            range: range.into(),
        }
    }
}

/// An index query. Empty `range_start`/`range_prefix` mean "not set";
/// `value_equal` is set whenever it is `Some`, even if empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexQuery {
    pub table: String,
    pub hash: String,
    pub range_start: Vec<u8>,
    pub range_prefix: Vec<u8>,
    pub value_equal: Option<Vec<u8>>,
}

impl IndexQuery {
    /// Query every entry under a hash
    pub fn new(table: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            hash: hash.into(),
            ..Default::default()
        }
    }

    pub fn with_range_start(mut self, start: impl Into<Vec<u8>>) -> Self {
        self.range_start = start.into();
        self
    }

    pub fn with_range_prefix(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.range_prefix = prefix.into();
        self
    }

    pub fn with_value_equal(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value_equal = Some(value.into());
        self
    }
}

/// One query result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub range: Vec<u8>,
    pub value: Vec<u8>,
}

/// A blob addressed by key alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub table: String,
    pub key: String,
    pub encoded: Vec<u8>,
}

impl Chunk {
    pub fn new(
        table: impl Into<String>,
        key: impl Into<String>,
        encoded: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            encoded: encoded.into(),
        }
    }
}

/// A chunk lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRef {
    pub table: String,
    pub key: String,
}

impl ChunkRef {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }
}

/// Table metadata returned by DescribeTable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDesc {
    pub name: String,
    pub is_active: bool,
}
