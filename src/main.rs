//! crowdsync server entry point.
//!
//! Loads configuration, opens the document store and serves the REST API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crowdsync::app_state::AppState;
use crowdsync::build_app;
use crowdsync::config::{AppConfig, LogFormat};
use crowdsync::persistence::PostgresPersistence;
use crowdsync::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, ?config, "starting crowdsync");

    // Build persistence and document store
    let persistence = if config.persistence_enabled {
        let db = PostgresPersistence::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        db.migrate().await.context("running migrations")?;
        Some(db)
    } else {
        tracing::warn!("persistence disabled; documents live in memory only");
        None
    };
    let store = Arc::new(Store::new(persistence));
    store.load().await.context("loading documents")?;

    // Build application state
    let state = AppState::new(&config, store);
    state
        .activation_service
        .seed(&config.activation_serials)
        .await
        .context("seeding activation serials")?;

    // Start server
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
