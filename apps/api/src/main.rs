//! # Mizhiwu API server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          API Server                                     │
//! │                                                                         │
//! │  Portal ───► HTTP (8000) ───► Handlers ───► Ledger ───► SQLite (WAL)   │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                             JWT (HS256)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use mizhiwu_api::{router, AppState, PortalConfig};
use mizhiwu_db::Database;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mizhiwu_api=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Mizhiwu API server...");

    // Load configuration
    let config = PortalConfig::load().context("loading configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set, using the development secret");
    }

    // Connect to database (runs migrations)
    let db = Database::new(config.db_config())
        .await
        .context("opening database")?;
    info!("Database ready");

    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::new(db.clone(), config));
    let app = router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
