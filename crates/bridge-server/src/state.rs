//! Application State

use std::sync::Arc;

use bridge_core::{AuthorizationFlow, ConfigStore, CrmClient, TokenExchanger, WebhookHandler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Config file (credentials, slugs, access token)
    pub config: Arc<ConfigStore>,

    /// Stripe event processing
    pub webhooks: Arc<WebhookHandler<dyn CrmClient>>,

    /// Salesforce OAuth handshake
    pub authorization: Arc<AuthorizationFlow<dyn TokenExchanger>>,
}

impl AppState {
    pub fn new(
        config: Arc<ConfigStore>,
        crm: Arc<dyn CrmClient>,
        exchanger: Arc<dyn TokenExchanger>,
    ) -> Self {
        Self {
            webhooks: Arc::new(WebhookHandler::new(crm)),
            authorization: Arc::new(AuthorizationFlow::new(config.clone(), exchanger)),
            config,
        }
    }
}
