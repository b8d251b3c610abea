//! Salesforce OAuth Handshake
//!
//! Implements the web-server (authorization code) flow:
//!
//! ```text
//! ┌──────────┐  no code   ┌──────────────────┐  ?code=...  ┌──────────┐
//! │  Bridge  │───────────▶│ Salesforce login │────────────▶│  Bridge  │
//! │ auth url │  redirect  │   + consent      │  redirect   │ auth url │
//! └──────────┘            └──────────────────┘             └────┬─────┘
//!                                                               │ POST /token
//!                                                               ▼
//!                                                        token saved to config
//! ```
//!
//! Once a token is stored the route only reports that the app is already
//! authorized. Tokens are never refreshed.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::config::{Config, ConfigStore};
use crate::error::{BridgeError, Result};

/// Code-for-token capability (Strategy pattern)
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange an authorization code for an access token
    async fn exchange_code(&self, request: &TokenRequest) -> Result<TokenGrant>;
}

/// Parameters of the token endpoint call
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TokenRequest {
    pub code: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Successful token response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,

    /// Instance the token is valid for, when the provider reports it
    #[serde(default)]
    pub instance_url: Option<String>,
}

/// Query parameters Salesforce sends back to the redirect URI
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuthorizationCallback {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub error_description: Option<String>,
}

impl AuthorizationCallback {
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Default::default()
        }
    }
}

/// What the authorization route should answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// A token was already stored; nothing happened
    AlreadyAuthorized,

    /// A code was exchanged and the token saved
    Authorized,

    /// Send the caller to Salesforce to log in
    Redirect(String),
}

impl AuthorizationOutcome {
    pub const fn message(&self) -> &'static str {
        match self {
            Self::AlreadyAuthorized => "The app is already authorized",
            Self::Authorized => "The app is authorized.",
            Self::Redirect(_) => "Redirecting to Salesforce",
        }
    }
}

/// Build the Salesforce authorize URL; every parameter is percent-encoded
pub fn authorization_url(config: &Config) -> Result<String> {
    let base = format!("{}/services/oauth2/authorize", config.login_url());
    let redirect_uri = config.redirect_uri()?;

    let url = Url::parse_with_params(
        &base,
        &[
            ("response_type", "code"),
            ("client_id", config.consumer_key()?),
            ("redirect_uri", redirect_uri.as_str()),
            ("scope", config.scope()),
        ],
    )
    .map_err(|e| BridgeError::Config(format!("invalid sf_login_url: {e}")))?;

    Ok(url.into())
}

/// Drives the handshake against a [`TokenExchanger`]
pub struct AuthorizationFlow<T: TokenExchanger + ?Sized> {
    store: Arc<ConfigStore>,
    exchanger: Arc<T>,
    exchange_lock: Mutex<()>,
}

impl<T: TokenExchanger + ?Sized> AuthorizationFlow<T> {
    pub fn new(store: Arc<ConfigStore>, exchanger: Arc<T>) -> Self {
        Self {
            store,
            exchanger,
            exchange_lock: Mutex::new(()),
        }
    }

    /// Handle one request to the authorization route
    pub async fn authorize(&self, callback: &AuthorizationCallback) -> Result<AuthorizationOutcome> {
        if self.store.access_token().await.is_some() {
            tracing::info!("Authorization url called but the app is already authorized");
            return Ok(AuthorizationOutcome::AlreadyAuthorized);
        }

        if let Some(error) = non_blank(callback.error.as_deref()) {
            let reason = non_blank(callback.error_description.as_deref()).unwrap_or(error);
            tracing::warn!(error = %error, reason = %reason, "Salesforce denied the authorization request");
            return Err(BridgeError::AuthorizationDenied(reason.to_string()));
        }

        let Some(code) = non_blank(callback.code.as_deref()) else {
            let url = authorization_url(&self.store.snapshot().await)?;
            tracing::info!(redirect = %url, "No token found, redirecting to Salesforce");
            return Ok(AuthorizationOutcome::Redirect(url));
        };

        // One exchange at a time; a callback that waited here finds the token
        let _guard = self.exchange_lock.lock().await;
        if self.store.access_token().await.is_some() {
            return Ok(AuthorizationOutcome::AlreadyAuthorized);
        }

        let config = self.store.snapshot().await;
        let request = TokenRequest {
            code: code.to_string(),
            client_id: config.consumer_key()?.to_string(),
            client_secret: config.consumer_secret()?.to_string(),
            redirect_uri: config.redirect_uri()?,
        };

        let grant = self
            .exchanger
            .exchange_code(&request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error getting the token from the response"))?;

        self.store.store_token(&grant).await?;
        tracing::info!(instance_url = ?grant.instance_url, "The app got authorized");

        Ok(AuthorizationOutcome::Authorized)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
