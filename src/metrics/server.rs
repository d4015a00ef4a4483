//! HTTP server for the Prometheus metrics endpoint.

use crate::metrics::SessionMetrics;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listener could not bind.
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    /// Server stopped with an error.
    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 9090).into(),
        }
    }
}

impl MetricsServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], port).into(),
        }
    }
}

/// HTTP server exposing a [`SessionMetrics`] registry.
pub struct MetricsServer {
    config: MetricsServerConfig,
    metrics: Arc<SessionMetrics>,
}

impl MetricsServer {
    /// Creates a server for `metrics`.
    pub fn new(config: MetricsServerConfig, metrics: Arc<SessionMetrics>) -> Self {
        Self { config, metrics }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.metrics))
    }

    /// Starts the HTTP server.
    ///
    /// This method runs the server until it is shut down.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(addr = %self.config.bind_addr, "Metrics server listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

async fn metrics_handler(State(metrics): State<Arc<SessionMetrics>>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
