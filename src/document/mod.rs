//! Document model
//!
//! The stored document shape, the filters run against it, and the request
//! and response units the coordinators work with.

pub mod errors;
pub mod filter;
pub mod mapper;
pub mod model;
pub mod value;

pub use errors::DecodeError;
pub use filter::{Clause, Condition, Filter};
pub use mapper::Document;
pub use model::{Chunk, ChunkRef, IndexDelete, IndexEntry, IndexQuery, Row, TableDesc};
pub use value::{FieldValue, RawDocument};
