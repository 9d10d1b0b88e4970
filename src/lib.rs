//! docindex - composite-key index and chunk store over a document database
//!
//! Callers address entries by (table, hash, range). The adapter maps them to
//! `{hash, range, value}` documents, resolves duplicate keys by replacing,
//! and streams query results in pages.

pub mod adapter;
pub mod cli;
pub mod document;
pub mod http_server;
pub mod observability;
pub mod store;
