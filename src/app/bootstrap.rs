use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::app::{app_state::AppState, clock::SystemClock, config::Config, db};

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Loads `.env` into the process environment when present.
pub fn init_env() {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            tracing::warn!("Failed to load .env file: {}", err);
        }
    }
}

/// Connects to the database and serves `app` until Ctrl-C.
pub async fn bootstrap(service_name: &str, app: Router<AppState>, config: &Config) -> Result<()> {
    let db_pool = db::create_pool(&config.database).await?;
    let state = AppState::new(db_pool, Arc::new(SystemClock));

    let app = app
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("{} listening on {}", service_name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    tracing::info!("{} stopped", service_name);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
