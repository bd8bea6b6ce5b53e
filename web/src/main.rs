//! Marketplace backend server.

use anyhow::Context;
use marketplace_core::{
    GroupRegistry, LoggingPushGateway, NotificationService, SystemClock, TransitionEngine,
    transitions,
};
use marketplace_postgres::PostgresStore;
use marketplace_web::{AppConfig, AppState, router};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Refuse to boot on a malformed transition table.
    transitions::validate().map_err(|e| anyhow::anyhow!(e))?;

    let config = AppConfig::from_env()?;
    let store = Arc::new(
        PostgresStore::connect(&config.database_url, config.max_connections)
            .await
            .context("failed to connect to the database")?,
    );
    store.migrate().await.context("migrations failed")?;

    let registry = GroupRegistry::new();
    let notifications = NotificationService::new(
        store.clone(),
        registry.clone(),
        Arc::new(LoggingPushGateway),
    );
    let engine = Arc::new(TransitionEngine::new(
        store.clone(),
        notifications.clone(),
        store.clone(),
        Arc::new(SystemClock),
    ));
    let state = AppState {
        engine,
        notifications,
        registry,
        sessions: store,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
