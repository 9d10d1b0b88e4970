//! Document store access
//!
//! A [`DocumentStore`] is the only thing the adapter talks to. The
//! [`ConnectionManager`] opens one at startup and wraps it in a
//! [`StoreHandle`] that bounds every call by the operation timeout.

mod backend;
mod config;
mod connection;
mod errors;
#[cfg(test)]
mod faulty;
mod memory;
#[cfg(feature = "mongo")]
mod mongo;

pub use backend::{DocumentCursor, DocumentStore, IndexDirection, IndexSpec, InsertOutcome};
pub use config::{BackendKind, StoreConfig};
pub use connection::{ConnectionManager, StoreHandle};
pub use errors::{StoreError, StoreResult};
#[cfg(test)]
pub(crate) use faulty::FaultyStore;
pub use memory::MemoryStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;
