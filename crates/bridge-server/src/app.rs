//! Router

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use bridge_core::{BridgeError, Config, Result};

use crate::handlers::{health_check, index, salesforce_authorization, stripe_webhook};
use crate::state::AppState;

const RESERVED_PATHS: &[&str] = &["/", "/health"];

/// Mount the handlers on the configured slugs
pub fn router(config: &Config, state: AppState) -> Result<Router> {
    let auth_slug = config.auth_slug();
    let webhook_slug = config.webhook_slug();

    for slug in [&auth_slug, &webhook_slug] {
        if RESERVED_PATHS.contains(&slug.as_str()) {
            return Err(BridgeError::Config(format!("slug {slug} is reserved")));
        }
    }
    if auth_slug == webhook_slug {
        return Err(BridgeError::Config(format!(
            "sf_auth_slug and sf_webhook_slug are both {auth_slug}"
        )));
    }

    Ok(Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route(&auth_slug, get(salesforce_authorization))
        .route(&webhook_slug, post(stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
