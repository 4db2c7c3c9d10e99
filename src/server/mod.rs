//! HTTP API over the event store.
//!
//! Routes:
//! - `POST /api/github/sync` trigger a run (bearer-token protected)
//! - `GET /api/github/events` filtered, paginated events
//! - `GET /api/github/filters` facet values
//! - `GET /api/github/contributions` live contribution calendar
//! - `GET /api/github/status` rate-limit snapshot and last sync
//! - `GET /metrics`, `GET /health`

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::signal;
use tokio::sync::Mutex;

use crate::github::GitHubApi;
use crate::storage::Database;
use crate::sync::SyncSettings;

pub use error::ApiError;
use middleware::TracingLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// `None` when no token is configured; upstream routes then answer 500.
    pub github: Option<Arc<dyn GitHubApi>>,
    pub username: Option<String>,
    pub sync_secret: Option<String>,
    pub settings: SyncSettings,
    /// Serializes sync runs within this process.
    pub sync_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: Database, settings: SyncSettings) -> Self {
        Self {
            db,
            github: None,
            username: None,
            sync_secret: None,
            settings,
            sync_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_github(mut self, github: Arc<dyn GitHubApi>, username: impl Into<String>) -> Self {
        self.github = Some(github);
        self.username = Some(username.into());
        self
    }

    pub fn with_sync_secret(mut self, secret: impl Into<String>) -> Self {
        self.sync_secret = Some(secret.into());
        self
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/github/sync", post(handlers::handle_sync))
        .route("/api/github/events", get(handlers::handle_events))
        .route("/api/github/filters", get(handlers::handle_filters))
        .route("/api/github/contributions", get(handlers::handle_contributions))
        .route("/api/github/status", get(handlers::handle_status))
        .route("/metrics", get(handlers::handle_metrics))
        .route("/health", get(handlers::handle_health))
        .layer(TracingLayer::new())
        .with_state(state)
}

/// Bind `0.0.0.0:port` and serve until SIGINT or SIGTERM.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "activity-sync server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Listen for SIGTERM and SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
