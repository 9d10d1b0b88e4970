//! Observable events
//!
//! Every log line the adapter emits names one of these events.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & lifecycle
    /// Startup begins
    BootStart,
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Store session opened and pinged
    StoreConnected,
    /// Store session could not be established (FATAL)
    StoreConnectFailed,
    /// Listener bound, serving requests
    Serving,
    /// Stop call received
    StopRequested,
    /// Listener closed
    ShutdownComplete,

    // Index writes
    /// Write batch received
    IndexWriteBegin,
    /// Entry stored by a fresh insert
    IndexInserted,
    /// Entry stored by replacing a conflicting document
    IndexOverwritten,
    /// Write batch aborted
    IndexWriteFailed,

    // Queries
    /// Query received
    QueryBegin,
    /// Filter built for a query
    QueryPlanned,
    /// Query stream finished
    QueryComplete,
    /// Query aborted by a cursor or decode error
    QueryFailed,

    // Deletes
    /// Delete batch received
    IndexDeleteBegin,
    /// Delete batch aborted
    IndexDeleteFailed,

    // Chunks
    /// Chunk put batch received
    ChunkPutBegin,
    /// Chunk stored by replacing a conflicting document
    ChunkOverwritten,
    /// Chunk put aborted
    ChunkPutFailed,
    /// Chunk fetch received
    ChunkGetBegin,
    /// Requested chunk is not stored
    ChunkMissing,
    /// Chunk fetch aborted
    ChunkGetFailed,
    /// Unsupported chunk delete rejected
    ChunkDeleteRejected,

    // Tables
    /// Table created
    TableCreated,
    /// Table dropped
    TableDropped,
    /// Tables listed
    TablesListed,
    /// Table lifecycle call failed
    TableOpFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "DOCINDEX_STARTUP_BEGIN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreConnected => "STORE_CONNECTED",
            Event::StoreConnectFailed => "STORE_CONNECT_FAILED",
            Event::Serving => "DOCINDEX_SERVING",
            Event::StopRequested => "STOP_REQUESTED",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::IndexWriteBegin => "INDEX_WRITE_BEGIN",
            Event::IndexInserted => "INDEX_INSERTED",
            Event::IndexOverwritten => "INDEX_OVERWRITTEN",
            Event::IndexWriteFailed => "INDEX_WRITE_FAILED",

            Event::QueryBegin => "QUERY_BEGIN",
            Event::QueryPlanned => "QUERY_PLANNED",
            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryFailed => "QUERY_FAILED",

            Event::IndexDeleteBegin => "INDEX_DELETE_BEGIN",
            Event::IndexDeleteFailed => "INDEX_DELETE_FAILED",

            Event::ChunkPutBegin => "CHUNK_PUT_BEGIN",
            Event::ChunkOverwritten => "CHUNK_OVERWRITTEN",
            Event::ChunkPutFailed => "CHUNK_PUT_FAILED",
            Event::ChunkGetBegin => "CHUNK_GET_BEGIN",
            Event::ChunkMissing => "CHUNK_MISSING",
            Event::ChunkGetFailed => "CHUNK_GET_FAILED",
            Event::ChunkDeleteRejected => "CHUNK_DELETE_REJECTED",

            Event::TableCreated => "TABLE_CREATED",
            Event::TableDropped => "TABLE_DROPPED",
            Event::TablesListed => "TABLES_LISTED",
            Event::TableOpFailed => "TABLE_OP_FAILED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StoreConnectFailed)
    }

    /// Returns true if this event reports a failure surfaced to a caller
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::IndexWriteFailed
                | Event::QueryFailed
                | Event::IndexDeleteFailed
                | Event::ChunkPutFailed
                | Event::ChunkGetFailed
                | Event::ChunkDeleteRejected
                | Event::TableOpFailed
        )
    }

    /// Returns true for per-entry events that are only useful when tracing
    pub fn is_per_entry(&self) -> bool {
        matches!(
            self,
            Event::IndexInserted | Event::IndexOverwritten | Event::ChunkOverwritten
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
