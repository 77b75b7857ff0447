//! The HTTP API. Every handler reads from the shared `Coordinator`: data endpoints serve the
//! latest snapshot, `POST /api/sync` replaces it.

mod handlers;

use crate::sync::Coordinator;
use crate::Result;
use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use handlers::ApiError;

/// Where the server listens.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: crate::config::DEFAULT_HOST.to_string(),
            port: crate::config::DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

/// Builds the router with CORS open to any origin and request tracing.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/auth/status", get(handlers::auth_status))
        .route("/api/auth/connect", post(handlers::auth_connect))
        .route("/api/sync", post(handlers::sync))
        .route("/api/sync/status", get(handlers::sync_status))
        .route("/api/sheets", get(handlers::sheets))
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/comparison/:kind", get(handlers::comparison))
        .route("/api/outstanding/:month", get(handlers::monthly_outstanding))
        .route("/api/settings", get(handlers::settings))
        .route("/api/reports/salesman/:name", get(handlers::salesman_report))
        .with_state(coordinator)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serves the API until Ctrl-C or SIGTERM.
pub async fn run_server(coordinator: Arc<Coordinator>, config: ServerConfig) -> Result<()> {
    let addr = config.addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to listen on {addr}"))?;
    info!("Finance Reports API listening on http://{addr}");

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("The HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
