//! Salesforce Client
//!
//! Implementation of `TokenExchanger` and `CrmClient` over the Salesforce
//! OAuth token endpoint and the sObject REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_core::{
    config::{Config, DEFAULT_API_VERSION, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOGIN_URL},
    crm::{CreatedRecord, CrmClient},
    error::{BridgeError, Result},
    oauth::{TokenExchanger, TokenGrant, TokenRequest},
    ConfigStore,
};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Salesforce client configuration
#[derive(Clone, Debug)]
pub struct SalesforceConfig {
    /// Login host, e.g. `https://login.salesforce.com` or `https://test.salesforce.com`
    pub login_url: String,

    /// REST API version, e.g. `v59.0`
    pub api_version: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.into(),
            api_version: DEFAULT_API_VERSION.into(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl SalesforceConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login_url: config.login_url().into(),
            api_version: config.api_version().into(),
            timeout: config.http_timeout(),
        }
    }
}

/// Salesforce client
///
/// The access token and instance URL are read from the [`ConfigStore`] on
/// every call, so a token obtained after startup is picked up without a
/// restart.
pub struct SalesforceClient {
    http: reqwest::Client,
    config: SalesforceConfig,
    store: Arc<ConfigStore>,
}

impl SalesforceClient {
    pub fn new(config: SalesforceConfig, store: Arc<ConfigStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("stripe-salesforce-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { http, config, store })
    }

    pub fn token_url(&self) -> String {
        format!("{}/services/oauth2/token", self.config.login_url.trim_end_matches('/'))
    }

    fn sobject_url(&self, instance_url: &str, sobject: &str) -> String {
        format!(
            "{}/services/data/{}/sobjects/{}/",
            instance_url.trim_end_matches('/'),
            self.config.api_version,
            sobject
        )
    }
}

#[async_trait]
impl TokenExchanger for SalesforceClient {
    async fn exchange_code(&self, request: &TokenRequest) -> Result<TokenGrant> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", request.code.as_str()),
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.as_str()),
            ("redirect_uri", request.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| BridgeError::TokenExchange(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::TokenExchange(e.to_string()))?;

        if status.is_success() {
            if let Ok(grant) = serde_json::from_str::<TokenGrant>(&body) {
                return Ok(grant);
            }
        }

        tracing::error!(status = %status, body = %body, "Salesforce token endpoint returned no token");
        Err(BridgeError::TokenExchange(oauth_error_text(&body)))
    }
}

#[async_trait]
impl CrmClient for SalesforceClient {
    async fn create_record(&self, sobject: &str, fields: &Map<String, Value>) -> Result<CreatedRecord> {
        let config = self.store.snapshot().await;
        let token = config.access_token().ok_or(BridgeError::NotAuthorized)?;
        let url = self.sobject_url(config.instance_url()?, sobject);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(fields)
            .send()
            .await
            .map_err(|e| BridgeError::Crm(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::Crm(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = %status, sobject, body = %body, "Salesforce rejected record");
            return Err(BridgeError::Crm(api_error_text(&body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| BridgeError::Crm(format!("unexpected create response: {e}")))
    }
}

/// `{"error": "...", "error_description": "..."}` from the OAuth endpoints
#[derive(Deserialize)]
struct OAuthError {
    error: Option<String>,
    error_description: Option<String>,
}

/// `[{"message": "...", "errorCode": "..."}]` from the REST API
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    message: String,
    error_code: Option<String>,
}

fn oauth_error_text(body: &str) -> String {
    match serde_json::from_str::<OAuthError>(body) {
        Ok(OAuthError { error: Some(code), error_description: Some(description) }) => {
            format!("{code}: {description}")
        }
        Ok(OAuthError { error: Some(text), .. } | OAuthError { error_description: Some(text), .. }) => text,
        _ => raw_text(body),
    }
}

fn api_error_text(body: &str) -> String {
    match serde_json::from_str::<Vec<ApiError>>(body) {
        Ok(errors) if !errors.is_empty() => errors
            .into_iter()
            .map(|e| match e.error_code {
                Some(code) => format!("{code}: {}", e.message),
                None => e.message,
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => raw_text(body),
    }
}

fn raw_text(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        "empty response".into()
    } else {
        body.to_string()
    }
}
