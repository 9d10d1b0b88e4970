//! Document filters
//!
//! A filter is a conjunction of clauses, each comparing one field against a
//! bound. No type coercion: a comparison only matches values of the same
//! kind as its bound, and a missing field never matches.

use super::value::{FieldValue, RawDocument};

/// Comparison applied by a clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// field = value
    Eq(FieldValue),
    /// field >= value
    Gte(FieldValue),
    /// field < value
    Lt(FieldValue),
}

impl Condition {
    /// Returns the operation name for log output
    pub fn op_name(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "eq",
            Condition::Gte(_) => "gte",
            Condition::Lt(_) => "lt",
        }
    }

    /// Returns the bound this condition compares against
    pub fn operand(&self) -> &FieldValue {
        match self {
            Condition::Eq(v) | Condition::Gte(v) | Condition::Lt(v) => v,
        }
    }

    fn matches(&self, actual: &FieldValue) -> bool {
        match self {
            Condition::Eq(expected) => actual == expected,
            Condition::Gte(bound) => actual.same_kind(bound) && actual >= bound,
            Condition::Lt(bound) => actual.same_kind(bound) && actual < bound,
        }
    }
}

/// A single field condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Field name
    pub field: String,
    /// Comparison
    pub condition: Condition,
}

/// A conjunction of clauses; the empty filter matches every document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Creates the match-all filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality clause
    pub fn eq(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with_clause(field, Condition::Eq(value))
    }

    /// Adds an inclusive lower bound
    pub fn gte(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with_clause(field, Condition::Gte(value))
    }

    /// Adds an exclusive upper bound
    pub fn lt(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with_clause(field, Condition::Lt(value))
    }

    fn with_clause(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            condition,
        });
        self
    }

    /// Clauses in insertion order
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Checks if a document satisfies every clause
    pub fn matches(&self, document: &RawDocument) -> bool {
        self.clauses.iter().all(|clause| match document.get(&clause.field) {
            Some(actual) => clause.condition.matches(actual),
            None => false,
        })
    }

    /// Compact description used in log fields, e.g. `hash:eq,range:gte`
    pub fn describe(&self) -> String {
        self.clauses
            .iter()
            .map(|c| format!("{}:{}", c.field, c.condition.op_name()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(hash: &str, range: &[u8]) -> RawDocument {
        RawDocument::new()
            .with("hash", FieldValue::string(hash))
            .with("range", FieldValue::binary(range.to_vec()))
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(Filter::new().matches(&doc("h", b"r")));
    }

    #[test]
    fn test_equality_match() {
        let filter = Filter::new().eq("hash", FieldValue::string("h"));
        assert!(filter.matches(&doc("h", b"r")));
        assert!(!filter.matches(&doc("other", b"r")));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let filter = Filter::new().eq("value", FieldValue::binary(b"v".to_vec()));
        assert!(!filter.matches(&doc("h", b"r")));
    }

    #[test]
    fn test_half_open_range() {
        let filter = Filter::new()
            .gte("range", FieldValue::binary(b"b".to_vec()))
            .lt("range", FieldValue::binary(b"b\xff".to_vec()));

        assert!(filter.matches(&doc("h", b"b")));
        assert!(filter.matches(&doc("h", b"bb")));
        assert!(!filter.matches(&doc("h", b"b\xff")));
        assert!(!filter.matches(&doc("h", b"c")));
        assert!(!filter.matches(&doc("h", b"a")));
    }

    #[test]
    fn test_no_cross_kind_comparison() {
        // A string range is never >= a binary bound, even though strings sort first
        let stored = RawDocument::new().with("range", FieldValue::string("zzz"));
        let filter = Filter::new().lt("range", FieldValue::binary(b"a".to_vec()));
        assert!(!filter.matches(&stored));
    }

    #[test]
    fn test_describe() {
        let filter = Filter::new()
            .eq("hash", FieldValue::string("h"))
            .gte("range", FieldValue::binary(Vec::new()));
        assert_eq!(filter.describe(), "hash:eq,range:gte");
    }
}
