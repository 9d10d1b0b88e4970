//! # HTTP Server
//!
//! Binds the RPC and observability routers to one listener.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

use super::config::HttpServerConfig;
use super::observability_routes::observability_routes;
use super::rpc_routes::{rpc_routes, RpcState};
use crate::adapter::IndexStore;
use crate::observability::{log_event_with_fields, Event};

/// RPC server over one [`IndexStore`]
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(store: IndexStore, config: HttpServerConfig) -> Self {
        let router = Self::build_router(store, &config);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(store: IndexStore, config: &HttpServerConfig) -> Router {
        let metrics = store.metrics().clone();
        let rpc_state = Arc::new(RpcState::new(store));

        Router::new()
            // Health check and metrics at root level
            .merge(observability_routes(metrics))
            // One POST route per call
            .nest("/rpc", rpc_routes(rpc_state))
            // Replace axum's fixed 2 MiB cap with the configured one
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.max_request_bytes))
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the listener fails
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid listen address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        let bound = listener.local_addr()?.to_string();
        log_event_with_fields(Event::Serving, &[("addr", bound.as_str())]);

        let result = axum::serve(listener, self.router).await;
        log_event_with_fields(Event::ShutdownComplete, &[("addr", bound.as_str())]);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_with_custom_port() {
        let server = HttpServer::new(IndexStore::in_memory(), HttpServerConfig::with_port(8080));
        assert_eq!(server.socket_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_router_builds() {
        let server = HttpServer::new(IndexStore::in_memory(), HttpServerConfig::default());
        let _router = server.router();
        // If we get here, router construction succeeded
    }

    #[tokio::test]
    async fn test_invalid_host_rejected() {
        let config = HttpServerConfig {
            host: "not an address".to_string(),
            ..Default::default()
        };
        let err = HttpServer::new(IndexStore::in_memory(), config)
            .start()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
