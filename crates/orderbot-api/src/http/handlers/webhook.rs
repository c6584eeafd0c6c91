//! Messenger webhook handlers.
//!
//! - GET  /webhook - Subscription handshake (`hub.*` query parameters)
//! - POST /webhook - Inbound message events
//!
//! Events are processed inline and in delivery order, so the platform only
//! sees `EVENT_RECEIVED` once every reply has been sent.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use orderbot_core::orchestrator::ConversationOrchestrator;
use orderbot_core::ports::{MessageDelivery, OrderSink};
use orderbot_infra::webhook::{
    SIGNATURE_HEADER, SubscriptionQuery, WebhookPayload, verify_signature, verify_subscription,
};
use orderbot_types::order::BusinessContext;

use crate::http::error::AppError;
use crate::state::AppState;

pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

/// Sent after a completed order reached the sink.
pub const ORDER_CONFIRMATION_MESSAGE: &str = "✅ Perfect! Your order has been received and is being processed. You'll receive updates on your order status. Thank you!";

/// Sent when a completed order could not be persisted.
pub const ORDER_FALLBACK_MESSAGE: &str =
    "Your order details have been recorded. Our team will contact you shortly to confirm!";

/// GET /webhook - Echo `hub.challenge` when the verify token matches.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<SubscriptionQuery>,
) -> Response {
    match verify_subscription(&query, state.secrets.verify_token.expose_secret()) {
        Some(challenge) => {
            info!("Webhook subscription verified");
            (StatusCode::OK, challenge.to_string()).into_response()
        }
        None => {
            warn!(mode = ?query.mode, "Webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST /webhook - Process every text message in the batch.
///
/// When `APP_SECRET` is set the `X-Hub-Signature-256` header must match the
/// raw body before anything is parsed.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, AppError> {
    if let Some(secret) = state.secrets.app_secret.as_ref() {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        verify_signature(secret.expose_secret().as_bytes(), &body, signature).inspect_err(|e| {
            warn!(error = %e, "Rejected webhook with bad signature");
        })?;
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("invalid webhook payload: {e}")))?;

    if !payload.is_page() {
        return Err(AppError::NotFound(format!(
            "unsupported webhook object '{}'",
            payload.object
        )));
    }

    for (sender_id, text) in payload.text_events() {
        info!(sender_id, "Received message");
        handle_user_message(
            &state.orchestrator,
            state.messenger.as_ref(),
            state.sheets.as_ref(),
            state.business(),
            sender_id,
            text,
        )
        .await;
    }

    Ok(EVENT_RECEIVED)
}

/// Run one inbound message through the pipeline and deliver the results.
///
/// Delivery failures are logged and never abort the sequence. A completed
/// order is committed to `sink` and followed by a confirmation, or by the
/// fallback message when persisting failed.
pub(crate) async fn handle_user_message<D, S>(
    orchestrator: &ConversationOrchestrator,
    delivery: &D,
    sink: &S,
    business: &BusinessContext,
    sender_id: &str,
    text: &str,
) where
    D: MessageDelivery,
    S: OrderSink,
{
    if let Err(e) = delivery.send_typing(sender_id).await {
        warn!(sender_id, error = %e, "Failed to send typing indicator");
    }

    let result = orchestrator.handle(sender_id, text, business).await;
    deliver(delivery, sender_id, &result.response_text).await;

    if !result.is_order_complete {
        return;
    }

    let follow_up = match orchestrator.commit(sender_id, sink).await {
        Ok(Some(order)) => {
            info!(
                sender_id,
                items = order.items.as_deref().unwrap_or_default(),
                "Order saved"
            );
            ORDER_CONFIRMATION_MESSAGE
        }
        // Cleared between extraction and commit.
        Ok(None) => ORDER_FALLBACK_MESSAGE,
        Err(_) => ORDER_FALLBACK_MESSAGE,
    };
    deliver(delivery, sender_id, follow_up).await;
}

async fn deliver<D: MessageDelivery>(delivery: &D, recipient: &str, text: &str) {
    if let Err(e) = delivery.send_text(recipient, text).await {
        warn!(recipient, error = %e, "Failed to deliver message");
    }
}
