//! Stripe Event Envelope
//!
//! Stripe events arrive as form fields using bracket notation for nesting
//! (`data[object][billing_details][name]=...`). They are expanded into a JSON
//! tree and deserialized into the few fields the bridge reads.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

pub const CHARGE_SUCCEEDED: &str = "charge.succeeded";

/// Currencies Stripe reports in whole units rather than cents
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

/// Event envelope
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub data: EventData,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventData {
    /// The embedded API object; its shape depends on the event type
    #[serde(default)]
    pub object: Value,
}

/// Event types the bridge acts on
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    ChargeSucceeded,
    Other(String),
}

impl Event {
    /// Build an event from decoded form fields.
    ///
    /// Fails when the payload is empty, has no `type`, or has keys that
    /// cannot be nested consistently.
    pub fn from_form(fields: &[(String, String)]) -> Result<Self> {
        if fields.is_empty() {
            return Err(BridgeError::WebhookParse("empty payload".into()));
        }

        let mut root = Map::new();
        for (key, value) in fields {
            let path = parse_key(key)?;
            insert_path(&mut root, &path, value)?;
        }

        let event: Self = serde_json::from_value(Value::Object(root))
            .map_err(|e| BridgeError::WebhookParse(e.to_string()))?;

        if event.event_type.trim().is_empty() {
            return Err(BridgeError::WebhookParse("event type is blank".into()));
        }

        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            CHARGE_SUCCEEDED => EventKind::ChargeSucceeded,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Read the embedded object as a charge
    pub fn charge(&self) -> Result<Charge> {
        Charge::deserialize(&self.data.object)
            .map_err(|e| BridgeError::WebhookParse(format!("invalid charge object: {e}")))
    }
}

/// The charge fields the bridge forwards
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Charge {
    #[serde(default)]
    pub id: Option<String>,

    /// Amount in the currency's smallest unit
    #[serde(deserialize_with = "int_or_string")]
    pub amount: i64,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub billing_details: BillingDetails,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BillingDetails {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

impl Charge {
    /// Amount in major currency units (2000 usd cents -> 20.00)
    pub fn amount_decimal(&self) -> Decimal {
        let zero_decimal = self.currency.as_deref().is_some_and(|c| {
            ZERO_DECIMAL_CURRENCIES.contains(&c.to_ascii_lowercase().as_str())
        });
        Decimal::new(self.amount, if zero_decimal { 0 } else { 2 })
    }

    /// Who paid: billing name, else billing email
    pub fn payer(&self) -> Option<&str> {
        let details = &self.billing_details;
        [details.name.as_deref(), details.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

fn int_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => Ok(v),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Split `a[b][c]` into `["a", "b", "c"]`
fn parse_key(key: &str) -> Result<Vec<&str>> {
    let invalid = || BridgeError::WebhookParse(format!("malformed field name: {key:?}"));

    let (head, mut rest) = key.find('[').map_or((key, ""), |i| key.split_at(i));
    if head.is_empty() {
        return Err(invalid());
    }

    let mut path = vec![head];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
        let end = inner.find(']').ok_or_else(invalid)?;
        let segment = &inner[..end];
        if segment.is_empty() || segment.contains('[') {
            return Err(invalid());
        }
        path.push(segment);
        rest = &inner[end + 1..];
    }

    Ok(path)
}

fn insert_path(root: &mut Map<String, Value>, path: &[&str], value: &str) -> Result<()> {
    let conflict = || {
        BridgeError::WebhookParse(format!("field {:?} is both a value and an object", path.join(".")))
    };

    let (leaf, parents) = path.split_last().ok_or_else(conflict)?;

    let mut node = root;
    for segment in parents {
        let child = node
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        node = child.as_object_mut().ok_or_else(conflict)?;
    }

    if node.get(*leaf).is_some_and(Value::is_object) {
        return Err(conflict());
    }
    node.insert((*leaf).to_string(), Value::String(value.to_string()));

    Ok(())
}
