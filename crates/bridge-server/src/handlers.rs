//! HTTP Handlers

use axum::{
    extract::{rejection::FormRejection, Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;

use bridge_core::{AuthorizationCallback, AuthorizationOutcome, BridgeError, WebhookOutcome};

use crate::state::AppState;

const INDEX_PAGE: &str = r#"<!doctype html>
<html>
  <head><title>Stripe to Salesforce bridge</title></head>
  <body>
    <h1>Stripe to Salesforce bridge</h1>
    <p>Forwards successful Stripe charges to Salesforce as Opportunities.</p>
  </body>
</html>
"#;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub authorized: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn status_for(err: &BridgeError) -> (StatusCode, &'static str) {
    match err {
        BridgeError::WebhookParse(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
        BridgeError::AuthorizationDenied(_) => (StatusCode::BAD_REQUEST, "AUTHORIZATION_DENIED"),
        BridgeError::TokenExchange(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TOKEN_EXCHANGE_FAILED"),
        BridgeError::NotAuthorized => (StatusCode::SERVICE_UNAVAILABLE, "NOT_AUTHORIZED"),
        BridgeError::Crm(_) => (StatusCode::BAD_GATEWAY, "CRM_ERROR"),
        BridgeError::Config(_) | BridgeError::Io(_) | BridgeError::Json(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    }
}

fn api_error(err: &BridgeError) -> ApiError {
    let (status, code) = status_for(err);
    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Static landing page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        authorized: state.config.access_token().await.is_some(),
    })
}

/// Stripe webhook handler (form-encoded events)
pub async fn stripe_webhook(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Form(fields) = form.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Rejected webhook payload");
        (
            rejection.status(),
            Json(ErrorResponse {
                error: "Invalid payload".into(),
                code: "INVALID_PAYLOAD".into(),
            }),
        )
    })?;

    let event = state.webhooks.parse_event(&fields).map_err(|e| {
        tracing::warn!(error = %e, "Invalid webhook payload");
        api_error(&e)
    })?;

    let outcome = state.webhooks.handle(event).await.map_err(|e| {
        tracing::error!(error = %e, retryable = e.is_retryable(), "Webhook processing failed");
        api_error(&e)
    })?;

    let response = match outcome {
        WebhookOutcome::OpportunityCreated { record_id, .. } => WebhookResponse {
            received: true,
            action: "opportunity_created",
            record_id: Some(record_id),
        },
        WebhookOutcome::Ignored { .. } => WebhookResponse {
            received: true,
            action: "ignored",
            record_id: None,
        },
    };

    Ok(Json(response))
}

/// Salesforce OAuth handshake
pub async fn salesforce_authorization(
    State(state): State<AppState>,
    Query(callback): Query<AuthorizationCallback>,
) -> Response {
    match state.authorization.authorize(&callback).await {
        Ok(AuthorizationOutcome::Redirect(url)) => Redirect::to(&url).into_response(),
        Ok(outcome) => outcome.message().into_response(),
        Err(e) => {
            let (status, _) = status_for(&e);
            tracing::error!(error = %e, status = %status, "Salesforce authorization failed");
            (status, e.user_message()).into_response()
        }
    }
}
