//! # HTTP Server Module
//!
//! JSON over HTTP transport for the adapter's RPC calls.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/metrics` - Counter snapshot
//! - `/rpc/*` - One POST route per call

pub mod config;
pub mod observability_routes;
pub mod rpc_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
