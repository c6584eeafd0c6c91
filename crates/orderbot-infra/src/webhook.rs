//! Messenger webhook support: subscription handshake, payload signature
//! verification, and the inbound event payload.
//!
//! Provides:
//! - `verify_subscription()` -- the `hub.mode=subscribe` verification handshake
//! - `verify_signature()` -- HMAC-SHA256 check of `X-Hub-Signature-256`
//! - `WebhookPayload` -- the `{object, entry: [{messaging: [...]}]}` body

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("HMAC signature verification failed")]
    SignatureMismatch,

    #[error("invalid HMAC key: {0}")]
    InvalidKey(String),
}

// ---------------------------------------------------------------------------
// Subscription handshake
// ---------------------------------------------------------------------------

/// Query parameters of `GET /webhook`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Return the challenge to echo when the handshake is valid.
pub fn verify_subscription<'a>(
    query: &'a SubscriptionQuery,
    expected_token: &str,
) -> Option<&'a str> {
    let subscribing = query.mode.as_deref() == Some("subscribe");
    let token_ok = query
        .verify_token
        .as_deref()
        .is_some_and(|t| constant_time_eq(t.as_bytes(), expected_token.as_bytes()));

    if subscribing && token_ok {
        Some(query.challenge.as_deref().unwrap_or_default())
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// HMAC-SHA256 verification
// ---------------------------------------------------------------------------

/// Verify the `X-Hub-Signature-256` header against the raw request body.
///
/// The header is `sha256=<hex>`; a bare hex digest is accepted too. The
/// comparison is constant-time (via the hmac crate's `verify_slice`).
pub fn verify_signature(
    secret: &[u8],
    body: &[u8],
    header: Option<&str>,
) -> Result<(), WebhookError> {
    let header = header.ok_or(WebhookError::MissingSignature)?;
    let hex_sig = header.strip_prefix("sha256=").unwrap_or(header);
    let expected = hex_decode(hex_sig).map_err(|_| WebhookError::SignatureMismatch)?;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| WebhookError::InvalidKey(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| WebhookError::SignatureMismatch)
}

/// Compute the `sha256=<hex>` header value for a body.
pub fn signature_header(secret: &[u8], body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| WebhookError::InvalidKey(e.to_string()))?;
    mac.update(body);
    Ok(format!("sha256={}", hex_encode(&mac.finalize().into_bytes())))
}

fn hex_decode(hex: &str) -> Result<Vec<u8>, ()> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Constant-time byte comparison (XOR-based).
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingEvent {
    pub sender: Participant,
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub text: Option<String>,
    /// Set on copies of messages the page itself sent.
    #[serde(default)]
    pub is_echo: bool,
}

impl WebhookPayload {
    pub fn is_page(&self) -> bool {
        self.object == "page"
    }

    /// `(sender_id, text)` for every user text message, in delivery order.
    /// Echoes, attachments, and delivery/read receipts are skipped.
    pub fn text_events(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entry
            .iter()
            .flat_map(|entry| entry.messaging.iter())
            .filter_map(|event| {
                let message = event.message.as_ref().filter(|m| !m.is_echo)?;
                let text = message.text.as_deref().filter(|t| !t.trim().is_empty())?;
                Some((event.sender.id.as_str(), text))
            })
    }
}
