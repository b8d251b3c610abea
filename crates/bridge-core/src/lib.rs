//! # bridge-core
//!
//! Domain side of the Stripe → Salesforce webhook bridge.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐ form POST ┌────────────────┐ create_record ┌─────────────┐
//! │  Stripe  │──────────▶│ WebhookHandler │──────────────▶│  CrmClient  │
//! └──────────┘           └────────────────┘               └─────────────┘
//!
//! ┌──────────┐  ?code=   ┌───────────────────┐ exchange_code ┌────────────────┐
//! │ Browser  │──────────▶│ AuthorizationFlow │──────────────▶│ TokenExchanger │
//! └──────────┘           └─────────┬─────────┘               └────────────────┘
//!                                  │ store_token
//!                                  ▼
//!                           ┌─────────────┐
//!                           │ ConfigStore │ (config.json)
//!                           └─────────────┘
//! ```
//!
//! `CrmClient` and `TokenExchanger` are the only ways out to the network.
//! `bridge-salesforce` implements both; tests swap in fakes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_core::{ConfigStore, WebhookHandler};
//!
//! let store = Arc::new(ConfigStore::load("config.json")?);
//! let handler = WebhookHandler::new(crm);
//!
//! let event = handler.parse_event(&form_fields)?;
//! let outcome = handler.handle(event).await?;
//! ```

pub mod config;
pub mod crm;
pub mod error;
pub mod event;
pub mod oauth;
pub mod webhook;

pub use config::{Config, ConfigStore};
pub use crm::{CreatedRecord, CrmClient, Opportunity};
pub use error::{BridgeError, Result};
pub use event::{Charge, Event, EventKind};
pub use oauth::{
    AuthorizationCallback, AuthorizationFlow, AuthorizationOutcome, TokenExchanger, TokenGrant,
    TokenRequest,
};
pub use webhook::{WebhookHandler, WebhookOutcome};
