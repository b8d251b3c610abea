//! Bridge Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors raised while bridging Stripe events into Salesforce
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Webhook payload could not be turned into an event
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// The user declined (or Salesforce refused) the authorization request
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Token endpoint rejected the authorization code
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// No access token has been obtained yet
    #[error("Salesforce is not authorized yet")]
    NotAuthorized,

    /// Salesforce rejected a record create call
    #[error("CRM error: {0}")]
    Crm(String),

    /// Missing or unusable configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file (de)serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Check if retrying the same call could succeed.
    ///
    /// Nothing in the bridge retries; this only classifies the failure for logs.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Crm(_) | Self::Io(_))
    }

    /// Get a message that is safe to hand back to the caller
    pub fn user_message(&self) -> String {
        match self {
            Self::WebhookParse(_) => "Invalid payload".into(),
            Self::AuthorizationDenied(reason) => format!("Authorization was denied: {reason}"),
            Self::TokenExchange(text) => text.clone(),
            Self::NotAuthorized => "The app is not authorized with Salesforce yet".into(),
            Self::Crm(_) => "Salesforce rejected the record".into(),
            Self::Config(_) => "Service configuration error.".into(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_exchange_message_is_provider_text() {
        let err = BridgeError::TokenExchange("invalid_grant: expired authorization code".into());
        assert_eq!(err.user_message(), "invalid_grant: expired authorization code");
    }

    #[test]
    fn test_retryable() {
        assert!(BridgeError::Crm("UNABLE_TO_LOCK_ROW".into()).is_retryable());
        assert!(!BridgeError::WebhookParse("empty".into()).is_retryable());
        assert!(!BridgeError::NotAuthorized.is_retryable());
    }
}
