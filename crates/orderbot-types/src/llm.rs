//! LLM request/response types for orderbot.
//!
//! These types model the provider-agnostic data shapes for chat completions
//! and the error taxonomy every backend maps into.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Request to an LLM provider for a completion.
///
/// `messages` is the full, ordered message list sent to the backend,
/// including the leading system message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier. Empty means "use the provider's configured model".
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stream: bool,
}

/// Response from an LLM provider for a non-streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

/// Token usage for a completion request/response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Coarse classification of a provider failure.
///
/// This is what the conversation layer keys its user-facing fallback
/// messages on; the finer-grained [`LlmError`] variants are kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Unauthorized,
    RateLimited,
    Transient,
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The provider was never configured (missing credentials at startup).
    /// Raised without attempting any network call.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    /// Classify this error for user-facing handling.
    ///
    /// Missing and rejected credentials both surface as `Unauthorized`;
    /// every other failure is treated as transient.
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            LlmError::NotConfigured(_) | LlmError::AuthenticationFailed => {
                ProviderErrorKind::Unauthorized
            }
            LlmError::RateLimited { .. } => ProviderErrorKind::RateLimited,
            _ => ProviderErrorKind::Transient,
        }
    }

    /// Map an HTTP status code returned by a backend into an error.
    ///
    /// Only 401 means the key was rejected. A 403 (region or permission
    /// block) stays a provider error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => LlmError::AuthenticationFailed,
            429 => LlmError::RateLimited {
                retry_after_ms: None,
            },
            503 | 529 => LlmError::Overloaded(body),
            _ => LlmError::Provider {
                message: format!("HTTP {status}: {body}"),
            },
        }
    }
}

/// Which chat backend serves completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderBackend {
    Groq,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderBackend {
    /// Model used when the configuration does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderBackend::Groq => "llama-3.3-70b-versatile",
            ProviderBackend::OpenAi => "gpt-4o-mini",
        }
    }

    /// Environment variable holding this backend's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderBackend::Groq => "GROQ_API_KEY",
            ProviderBackend::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderBackend::Groq => write!(f, "groq"),
            ProviderBackend::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(ProviderBackend::Groq),
            "openai" => Ok(ProviderBackend::OpenAi),
            other => Err(format!("invalid provider backend: '{other}'")),
        }
    }
}
