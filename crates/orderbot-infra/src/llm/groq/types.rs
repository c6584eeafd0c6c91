//! Groq chat completions API types.
//!
//! Groq speaks the OpenAI chat completions wire format. These are the
//! Groq-side request/response structures, NOT the provider-agnostic types
//! from orderbot-types.

use serde::{Deserialize, Serialize};

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct GroqRequest {
    pub model: String,
    pub messages: Vec<GroqMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Non-streaming response body.
#[derive(Debug, Clone, Deserialize)]
pub struct GroqResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<GroqChoice>,
    pub usage: Option<GroqUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroqChoice {
    pub message: GroqMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroqUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct GroqErrorBody {
    pub error: GroqErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroqErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
}
