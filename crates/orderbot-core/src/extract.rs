//! Order extraction from assistant replies.
//!
//! Scans reply text for [`ORDER_COMPLETE_MARKER`] and parses the JSON object
//! that follows it. The payload runs from the first `{` after the marker to
//! the last `}` in the text, so multi-line objects, nested braces, and
//! trailing prose or code fences after the object are all accepted.
//!
//! A missing marker is the normal case while an order is being collected.
//! A marker with an unparseable payload is logged and treated the same way:
//! nothing here ever fails the request.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use orderbot_types::order::{ORDER_COMPLETE_MARKER, OrderRecord};

/// Why a marker was present but no order came out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// Marker present but no `{ ... }` span after it.
    MissingObject,
    /// The span did not parse as a JSON object.
    Malformed(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderExtractor;

impl OrderExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract an order from an assistant reply, stamped with the current time.
    pub fn extract(&self, text: &str) -> Option<OrderRecord> {
        self.extract_at(text, Utc::now())
    }

    /// Extract an order, stamping it with `now`.
    pub fn extract_at(&self, text: &str, now: DateTime<Utc>) -> Option<OrderRecord> {
        match self.try_extract(text, now) {
            Ok(Some(order)) => Some(order),
            Ok(None) => {
                debug!("No order marker in assistant reply");
                None
            }
            Err(failure) => {
                warn!(?failure, "Order marker present but payload could not be parsed");
                None
            }
        }
    }

    /// Like [`Self::extract_at`], but reports why a marked payload was rejected.
    pub fn try_extract(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OrderRecord>, ExtractionFailure> {
        let Some(marker_at) = text.find(ORDER_COMPLETE_MARKER) else {
            return Ok(None);
        };

        let payload = &text[marker_at + ORDER_COMPLETE_MARKER.len()..];
        let (Some(start), Some(end)) = (payload.find('{'), payload.rfind('}')) else {
            return Err(ExtractionFailure::MissingObject);
        };
        if end < start {
            return Err(ExtractionFailure::MissingObject);
        }

        // The span starts with `{`, so a successful parse is always an object.
        let object: Map<String, Value> = serde_json::from_str(&payload[start..=end])
            .map_err(|e| ExtractionFailure::Malformed(e.to_string()))?;

        Ok(Some(OrderRecord::from_model_object(object, now)))
    }
}
