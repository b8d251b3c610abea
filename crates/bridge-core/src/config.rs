//! Config Store
//!
//! The bridge is configured by a flat JSON file holding Salesforce
//! credentials, route slugs and (once the OAuth handshake has run) the access
//! token. The file is read once at startup and rewritten wholesale when a
//! token is obtained; that is the only mutation it ever sees.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::{BridgeError, Result};
use crate::oauth::TokenGrant;

pub const DEFAULT_WEBHOOK_SLUG: &str = "/webhook/stripe";
pub const DEFAULT_AUTH_SLUG: &str = "/salesforce/auth";
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";
pub const DEFAULT_API_VERSION: &str = "v59.0";
pub const DEFAULT_SCOPE: &str = "full";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Contents of the config file.
///
/// Every key is optional at load time. Keys the bridge does not know about
/// (`stripe_api_key`, notes, ...) are kept in `extra` so a rewrite never
/// drops them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connected App consumer key (OAuth client id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_consumer_key: Option<String>,

    /// Connected App consumer secret (OAuth client secret)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_consumer_secret: Option<String>,

    /// Public base address of this service, e.g. `https://bridge.example.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_address: Option<String>,

    /// Salesforce instance, e.g. `https://acme.my.salesforce.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_instance_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_auth_slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_webhook_slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_login_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_scope: Option<String>,

    /// Set by the OAuth handshake; absent until then
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_retention_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,

    /// Unknown keys, written back untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    /// Path the Stripe webhook route is mounted on
    pub fn webhook_slug(&self) -> String {
        normalize_slug(self.sf_webhook_slug.as_deref().unwrap_or(DEFAULT_WEBHOOK_SLUG))
    }

    /// Path the OAuth handshake route is mounted on
    pub fn auth_slug(&self) -> String {
        normalize_slug(self.sf_auth_slug.as_deref().unwrap_or(DEFAULT_AUTH_SLUG))
    }

    pub fn login_url(&self) -> &str {
        non_blank(self.sf_login_url.as_deref())
            .unwrap_or(DEFAULT_LOGIN_URL)
            .trim_end_matches('/')
    }

    pub fn api_version(&self) -> &str {
        non_blank(self.sf_api_version.as_deref()).unwrap_or(DEFAULT_API_VERSION)
    }

    pub fn scope(&self) -> &str {
        non_blank(self.sf_scope.as_deref()).unwrap_or(DEFAULT_SCOPE)
    }

    pub fn bind_addr(&self) -> &str {
        non_blank(self.bind_addr.as_deref()).unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    pub fn log_retention_days(&self) -> u32 {
        self.log_retention_days.unwrap_or(DEFAULT_LOG_RETENTION_DAYS)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    pub fn consumer_key(&self) -> Result<&str> {
        required(self.sf_consumer_key.as_deref(), "sf_consumer_key")
    }

    pub fn consumer_secret(&self) -> Result<&str> {
        required(self.sf_consumer_secret.as_deref(), "sf_consumer_secret")
    }

    pub fn instance_url(&self) -> Result<&str> {
        required(self.sf_instance_url.as_deref(), "sf_instance_url")
            .map(|url| url.trim_end_matches('/'))
    }

    /// Callback address registered on the Connected App
    pub fn redirect_uri(&self) -> Result<String> {
        let address = required(self.app_address.as_deref(), "app_address")?;
        Ok(format!("{}{}", address.trim_end_matches('/'), self.auth_slug()))
    }

    /// Stored access token; an empty string counts as no token
    pub fn access_token(&self) -> Option<&str> {
        non_blank(self.access_token.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    non_blank(value).ok_or_else(|| BridgeError::Config(format!("missing {key}")))
}

fn normalize_slug(slug: &str) -> String {
    let slug = slug.trim();
    if slug.starts_with('/') {
        slug.to_string()
    } else {
        format!("/{slug}")
    }
}

/// Shared handle on the config file.
///
/// Passed around as `Arc<ConfigStore>`. Reads clone a snapshot;
/// [`ConfigStore::store_token`] is the single write path.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: RwLock<Config>,
}

impl ConfigStore {
    /// Wrap an already-parsed config that lives at `path`
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            config: RwLock::new(config),
        }
    }

    /// Read and parse the config file
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            BridgeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Config = serde_json::from_str(&raw)?;

        Ok(Self::new(path, config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.config.read().await.access_token().map(str::to_string)
    }

    /// Persist a freshly obtained token.
    ///
    /// The file is rewritten first (temp file + rename); the in-memory copy
    /// only changes once the write succeeded. The write lock is held across
    /// both, so concurrent callers are serialized.
    pub async fn store_token(&self, grant: &TokenGrant) -> Result<()> {
        let mut current = self.config.write().await;

        let mut updated = current.clone();
        updated.access_token = Some(grant.access_token.clone());
        if let Some(instance_url) = &grant.instance_url {
            updated.sf_instance_url = Some(instance_url.clone());
        }

        write_atomic(&self.path, &updated).await?;
        *current = updated;

        tracing::info!(path = %self.path.display(), "Saved Salesforce access token");
        Ok(())
    }
}

async fn write_atomic(path: &Path, config: &Config) -> Result<()> {
    let body = serde_json::to_vec_pretty(config)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_config(dir: &tempfile::TempDir, value: &Value) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.webhook_slug(), DEFAULT_WEBHOOK_SLUG);
        assert_eq!(config.auth_slug(), DEFAULT_AUTH_SLUG);
        assert_eq!(config.login_url(), "https://login.salesforce.com");
        assert_eq!(config.api_version(), "v59.0");
        assert_eq!(config.scope(), "full");
        assert_eq!(config.log_retention_days(), 30);
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert!(config.access_token().is_none());
    }

    #[test]
    fn test_slug_gets_leading_slash() {
        let config = Config {
            sf_webhook_slug: Some("hooks/stripe".into()),
            ..Default::default()
        };
        assert_eq!(config.webhook_slug(), "/hooks/stripe");
    }

    #[test]
    fn test_redirect_uri() {
        let config = Config {
            app_address: Some("https://bridge.example.com/".into()),
            sf_auth_slug: Some("/sf/auth".into()),
            ..Default::default()
        };
        assert_eq!(config.redirect_uri().unwrap(), "https://bridge.example.com/sf/auth");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = Config::default().consumer_key().unwrap_err();
        assert!(matches!(err, BridgeError::Config(ref msg) if msg == "missing sf_consumer_key"));
    }

    #[test]
    fn test_empty_token_is_no_token() {
        let config = Config {
            access_token: Some(String::new()),
            ..Default::default()
        };
        assert!(config.access_token().is_none());
    }

    #[test]
    fn test_load_keeps_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, &json!({
            "stripe_api_key": "sk_test_123",
            "sf_consumer_key": "3MVG9",
            "log_retention_days": 7
        }));

        let store = ConfigStore::load(&path).unwrap();
        let config = store.config.try_read().unwrap().clone();

        assert_eq!(config.sf_consumer_key.as_deref(), Some("3MVG9"));
        assert_eq!(config.log_retention_days(), 7);
        assert_eq!(config.extra.get("stripe_api_key"), Some(&json!("sk_test_123")));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigStore::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[tokio::test]
    async fn test_store_token_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, &json!({
            "stripe_api_key": "sk_test_123",
            "sf_instance_url": "https://old.my.salesforce.com"
        }));
        let store = ConfigStore::load(&path).unwrap();

        store
            .store_token(&TokenGrant {
                access_token: "00Dxx!token".into(),
                instance_url: Some("https://acme.my.salesforce.com".into()),
            })
            .await
            .unwrap();

        assert_eq!(store.access_token().await.as_deref(), Some("00Dxx!token"));

        let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["access_token"], "00Dxx!token");
        assert_eq!(on_disk["sf_instance_url"], "https://acme.my.salesforce.com");
        assert_eq!(on_disk["stripe_api_key"], "sk_test_123");
        assert!(!dir.path().join("config.json.tmp").exists());
    }
}
