// Expense Ledger - Web Server
// REST API with Axum over the SQLite expense store

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use expense_ledger::{init_logging, router, AppState, ServerConfig, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;
    init_logging(&config.log_level);

    // Never fatal: requests fail with a storage error until the database opens
    let store = SqliteStore::connect(&config.database_url);

    let state = AppState::new(Arc::new(store));
    let app = router(state, &config);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running at http://localhost:{}", config.port);
    info!(origins = ?config.origins(), "CORS origins");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received");
}
