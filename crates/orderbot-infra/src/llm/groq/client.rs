//! GroqProvider -- [`LlmProvider`] for the Groq chat completions API.
//!
//! Hand-rolled JSON over `reqwest` against `{base_url}/chat/completions`
//! with a bearer API key. The key is wrapped in [`SecretString`] and only
//! exposed when building the `Authorization` header.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use secrecy::{ExposeSecret, SecretString};

use orderbot_core::llm::provider::LlmProvider;
use orderbot_observe::genai_attrs::PROVIDER_GROQ;
use orderbot_types::error::ConfigError;
use orderbot_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

use super::types::{GroqErrorBody, GroqMessage, GroqRequest, GroqResponse};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq LLM provider.
///
/// Does NOT derive Debug so the API key can never end up in output.
pub struct GroqProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl GroqProvider {
    pub fn new(
        api_key: SecretString,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: GROQ_BASE_URL.to_string(),
            model,
            timeout,
        })
    }

    /// Override the base URL (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn to_groq_request(&self, request: &CompletionRequest) -> GroqRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| GroqMessage {
                role: m.role.to_string(),
                content: Some(m.content.clone()),
            })
            .collect();

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        GroqRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stream: false,
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            LlmError::Provider {
                message: format!("HTTP request failed: {err}"),
            }
        }
    }
}

/// Map a non-2xx response to an [`LlmError`], preferring the API's own message.
fn map_status_error(status: StatusCode, retry_after: Option<u64>, body: String) -> LlmError {
    let message = serde_json::from_str::<GroqErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);

    match LlmError::from_status(status.as_u16(), message) {
        LlmError::RateLimited { .. } => LlmError::RateLimited {
            retry_after_ms: retry_after.map(|secs| secs * 1000),
        },
        other => other,
    }
}

impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        PROVIDER_GROQ
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_groq_request(request);

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let error_body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, "Groq returned an error status");
            return Err(map_status_error(status, retry_after, error_body));
        }

        let groq_resp: GroqResponse = response.json().await.map_err(|e| {
            LlmError::Deserialization(format!("failed to parse response: {e}"))
        })?;

        let choice = groq_resp.choices.into_iter().next();
        let finish_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());
        let content = choice.and_then(|c| c.message.content).ok_or_else(|| {
            LlmError::Deserialization("response contained no message content".into())
        })?;

        let usage = groq_resp
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: groq_resp.id,
            content,
            model: groq_resp.model,
            finish_reason,
            usage,
        })
    }
}
