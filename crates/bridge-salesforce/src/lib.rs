//! # bridge-salesforce
//!
//! Salesforce adapter for the webhook bridge.
//!
//! ## Capabilities
//!
//! - **`TokenExchanger`**: OAuth web-server flow, `POST /services/oauth2/token`
//! - **`CrmClient`**: sObject create, `POST /services/data/<version>/sobjects/<type>/`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_salesforce::{SalesforceClient, SalesforceConfig};
//!
//! let config = store.snapshot().await;
//! let salesforce = Arc::new(SalesforceClient::new(
//!     SalesforceConfig::from_config(&config),
//!     store.clone(),
//! )?);
//!
//! let webhooks = WebhookHandler::new(salesforce.clone());
//! let authorization = AuthorizationFlow::new(store, salesforce);
//! ```

pub mod client;

pub use client::{SalesforceClient, SalesforceConfig};

// Re-export core types for convenience
pub use bridge_core::{BridgeError, ConfigStore, CrmClient, Result, TokenExchanger};
