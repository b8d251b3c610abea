//! Stripe Webhook Handling
//!
//! Turns Stripe payment events into Salesforce Opportunities.
//!
//! Webhook signatures are not verified: anyone who can reach the webhook
//! route can create Opportunities. Keep the route private or behind a
//! gateway that checks `Stripe-Signature`.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::crm::{CrmClient, Opportunity};
use crate::error::Result;
use crate::event::{Event, EventKind};

/// What a handled webhook did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// `charge.succeeded` - one Opportunity created
    OpportunityCreated {
        record_id: String,
        charge_id: Option<String>,
        amount: Decimal,
    },

    /// Any other event type; no CRM call
    Ignored {
        event_type: String,
    },
}

/// Webhook handler
pub struct WebhookHandler<C: CrmClient + ?Sized> {
    crm: Arc<C>,
}

impl<C: CrmClient + ?Sized> WebhookHandler<C> {
    pub fn new(crm: Arc<C>) -> Self {
        Self { crm }
    }

    /// Build an event from the decoded form payload
    pub fn parse_event(&self, fields: &[(String, String)]) -> Result<Event> {
        Event::from_form(fields)
    }

    /// Process a webhook event
    pub async fn handle(&self, event: Event) -> Result<WebhookOutcome> {
        tracing::info!(event_id = ?event.id, event_type = %event.event_type, "Processing Stripe webhook");

        match event.kind() {
            EventKind::ChargeSucceeded => {
                // A new subscription also emits charge.succeeded, so this
                // covers subscription payments too.
                let charge = event.charge()?;
                let opportunity = Opportunity::from_charge(&charge);

                let created = self
                    .crm
                    .create_record(Opportunity::SOBJECT, &opportunity.fields()?)
                    .await?;

                tracing::info!(
                    record_id = %created.id,
                    charge_id = ?charge.id,
                    amount = %opportunity.amount,
                    "Created Salesforce opportunity"
                );

                Ok(WebhookOutcome::OpportunityCreated {
                    record_id: created.id,
                    charge_id: charge.id,
                    amount: opportunity.amount,
                })
            }

            EventKind::Other(event_type) => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(WebhookOutcome::Ignored { event_type })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::CreatedRecord;
    use crate::error::BridgeError;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use serde_json::{Map, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCrm {
        calls: Mutex<Vec<(String, Map<String, Value>)>>,
        fail: bool,
    }

    impl RecordingCrm {
        fn calls(&self) -> Vec<(String, Map<String, Value>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CrmClient for RecordingCrm {
        async fn create_record(&self, sobject: &str, fields: &Map<String, Value>) -> Result<CreatedRecord> {
            self.calls.lock().unwrap().push((sobject.to_string(), fields.clone()));
            if self.fail {
                return Err(BridgeError::Crm("REQUIRED_FIELD_MISSING".into()));
            }
            Ok(CreatedRecord { id: "006xx0000001".into() })
        }
    }

    fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn charge_succeeded() -> Vec<(String, String)> {
        form(&[
            ("type", "charge.succeeded"),
            ("data[object][id]", "ch_1"),
            ("data[object][amount]", "1500"),
            ("data[object][currency]", "usd"),
            ("data[object][billing_details][name]", "Jenny Rosen"),
        ])
    }

    #[tokio::test]
    async fn test_charge_succeeded_creates_one_opportunity() {
        let crm = Arc::new(RecordingCrm::default());
        let handler = WebhookHandler::new(crm.clone());

        let event = handler.parse_event(&charge_succeeded()).unwrap();
        let outcome = handler.handle(event).await.unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::OpportunityCreated {
                record_id: "006xx0000001".into(),
                charge_id: Some("ch_1".into()),
                amount: dec!(15.00),
            }
        );

        let calls = crm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Opportunity");
        assert_eq!(calls[0].1["Description"], "Payment from Jenny Rosen");
    }

    #[tokio::test]
    async fn test_other_events_make_no_calls() {
        let crm = Arc::new(RecordingCrm::default());
        let handler = WebhookHandler::new(crm.clone());

        for event_type in ["charge.failed", "customer.subscription.created", "invoice.paid"] {
            let event = handler.parse_event(&form(&[("type", event_type)])).unwrap();
            let outcome = handler.handle(event).await.unwrap();
            assert_eq!(outcome, WebhookOutcome::Ignored { event_type: event_type.into() });
        }

        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_charge_without_amount_is_parse_error() {
        let crm = Arc::new(RecordingCrm::default());
        let handler = WebhookHandler::new(crm.clone());

        let event = handler
            .parse_event(&form(&[("type", "charge.succeeded"), ("data[object][id]", "ch_1")]))
            .unwrap();
        let err = handler.handle(event).await.unwrap_err();

        assert!(matches!(err, BridgeError::WebhookParse(_)));
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_crm_failure_is_surfaced() {
        let crm = Arc::new(RecordingCrm { fail: true, ..Default::default() });
        let handler = WebhookHandler::new(crm.clone());

        let event = handler.parse_event(&charge_succeeded()).unwrap();
        let err = handler.handle(event).await.unwrap_err();

        assert!(matches!(err, BridgeError::Crm(_)));
        assert_eq!(crm.calls().len(), 1);
    }
}
