//! # Document Decode Errors

use thiserror::Error;

/// A stored document that does not have the `{hash, range, value}` shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("document has no `{0}` field")]
    MissingField(&'static str),

    #[error("document field `{field}` is {found}, expected {expected}")]
    WrongKind {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}
