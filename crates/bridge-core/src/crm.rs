//! CRM Records
//!
//! The bridge only ever creates records. [`CrmClient`] is the seam the
//! Salesforce adapter implements and tests replace with a fake.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};
use crate::event::Charge;

/// Create-record capability (Strategy pattern)
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Create one record of type `sobject` with the given fields
    async fn create_record(&self, sobject: &str, fields: &Map<String, Value>) -> Result<CreatedRecord>;
}

/// Outcome of a create call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
}

/// Opportunity record sent for each successful charge.
///
/// Only `Description` and `Amount` are derived from the charge. The other
/// fields stay blank and are left out of the request body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Opportunity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub description: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<Decimal>,

    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub opportunity_type: Option<String>,
}

impl Opportunity {
    pub const SOBJECT: &'static str = "Opportunity";

    pub fn from_charge(charge: &Charge) -> Self {
        Self {
            description: format!("Payment from {}", charge.payer().unwrap_or("unknown payer")),
            amount: charge.amount_decimal(),
            ..Default::default()
        }
    }

    /// Field map for [`CrmClient::create_record`]
    pub fn fields(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(BridgeError::Crm(format!("opportunity serialized to {other}"))),
        }
    }
}
