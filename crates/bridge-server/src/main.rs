//! Stripe → Salesforce bridge HTTP server
//!
//! Axum-based server that receives Stripe webhooks and creates Salesforce
//! Opportunities, plus the one-time Salesforce OAuth handshake.

mod app;
mod handlers;
mod logging;
mod state;

use std::sync::Arc;

use bridge_core::ConfigStore;
use bridge_salesforce::{SalesforceClient, SalesforceConfig};

use crate::logging::DailyFileWriter;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Load config before logging: it names the log directory
    let config_path = std::env::var("BRIDGE_CONFIG").unwrap_or_else(|_| "config.json".into());
    let store = Arc::new(ConfigStore::load(&config_path)?);
    let config = store.snapshot().await;

    // Initialize tracing
    let log_files = DailyFileWriter::new(config.log_dir(), config.log_retention_days())?;
    let log_dir = log_files.dir().display().to_string();
    logging::init(log_files);

    tracing::info!(config = %config_path, log_dir = %log_dir, "Loaded configuration");

    if config.access_token().is_some() {
        tracing::info!("✓ Salesforce authorized");
    } else {
        tracing::warn!("⚠ Salesforce not authorized - webhooks will fail until it is");
        tracing::warn!("  Open {} in a browser to connect Salesforce", config.auth_slug());
    }
    tracing::warn!(
        "⚠ Stripe webhook signatures are not verified - keep {} private",
        config.webhook_slug()
    );

    // Salesforce adapter backs both capabilities
    let salesforce = Arc::new(SalesforceClient::new(
        SalesforceConfig::from_config(&config),
        store.clone(),
    )?);

    // Build application state and router
    let state = AppState::new(store, salesforce.clone(), salesforce);
    let app = app::router(&config, state)?;

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| config.bind_addr().into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 bridge running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /        - Landing page");
    tracing::info!("  GET  /health  - Health check");
    tracing::info!("  GET  {} - Salesforce authorization", config.auth_slug());
    tracing::info!("  POST {} - Stripe webhook", config.webhook_slug());
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
