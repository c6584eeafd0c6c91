//! Business context, order records, and the result of processing a message.
//!
//! The order payload is the wire contract between the model and the rest of
//! the pipeline: the five business fields plus `notes`, followed by the
//! `timestamp` and `status` stamped on extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Literal token the assistant emits before the order JSON.
pub const ORDER_COMPLETE_MARKER: &str = "ORDER_COMPLETE_JSON:";

/// Status every freshly extracted order starts with.
pub const NEW_ORDER_STATUS: &str = "New Order";

pub const DEFAULT_BUSINESS_NAME: &str = "Our Business";
pub const DEFAULT_BUSINESS_TYPE: &str = "restaurant";

/// The business the assistant is taking orders for.
///
/// Supplied per request. Absent or blank fields fall back to
/// [`DEFAULT_BUSINESS_NAME`] / [`DEFAULT_BUSINESS_TYPE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl BusinessContext {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: Some(kind.into()),
        }
    }

    /// Business name with the default applied.
    pub fn name(&self) -> &str {
        non_blank(self.name.as_deref()).unwrap_or(DEFAULT_BUSINESS_NAME)
    }

    /// Business type with the default applied.
    pub fn kind(&self) -> &str {
        non_blank(self.kind.as_deref()).unwrap_or(DEFAULT_BUSINESS_TYPE)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// A finalized customer order extracted from an assistant reply.
///
/// Business fields are carried as the model produced them; any of them may
/// be absent. Keys the model added beyond the known fields are kept in
/// `extra` so nothing is dropped on the way to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderRecord {
    /// Build a record from the JSON object the model emitted.
    ///
    /// `timestamp` and `status` are always overwritten. Non-string values for
    /// the known fields are kept as their JSON text (a numeric `total` stays
    /// `"12.5"`); `null` counts as absent.
    pub fn from_model_object(mut object: Map<String, Value>, timestamp: DateTime<Utc>) -> Self {
        object.remove("timestamp");
        object.remove("status");

        Self {
            name: take_text(&mut object, "name"),
            phone: take_text(&mut object, "phone"),
            items: take_text(&mut object, "items"),
            total: take_text(&mut object, "total"),
            address: take_text(&mut object, "address"),
            notes: take_text(&mut object, "notes"),
            timestamp,
            status: NEW_ORDER_STATUS.to_string(),
            extra: object,
        }
    }
}

fn take_text(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    match object.remove(key)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Outcome of processing one inbound message.
///
/// `is_order_complete` is true exactly when `order` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    pub response_text: String,
    pub order: Option<OrderRecord>,
    pub is_order_complete: bool,
}

impl ProcessResult {
    /// A reply from the assistant, possibly carrying a completed order.
    pub fn reply(response_text: impl Into<String>, order: Option<OrderRecord>) -> Self {
        let is_order_complete = order.is_some();
        Self {
            response_text: response_text.into(),
            order,
            is_order_complete,
        }
    }

    /// A user-safe message produced when the chat backend failed.
    pub fn failure(response_text: impl Into<String>) -> Self {
        Self::reply(response_text, None)
    }
}
