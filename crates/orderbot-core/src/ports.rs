//! Outbound capabilities the pipeline depends on.
//!
//! Concrete clients (Messenger Graph API, Google Sheets) live in
//! orderbot-infra; tests use in-memory implementations.

use std::future::Future;

use orderbot_types::error::{DeliveryError, SinkError};
use orderbot_types::order::OrderRecord;

/// Sends replies back to the user on the messaging platform.
///
/// Failures are reported but never stop message processing.
pub trait MessageDelivery: Send + Sync {
    fn send_text(
        &self,
        recipient: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    /// Show a typing indicator while the reply is generated.
    fn send_typing(
        &self,
        recipient: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Persists a completed order.
pub trait OrderSink: Send + Sync {
    fn append_order(
        &self,
        order: &OrderRecord,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}
