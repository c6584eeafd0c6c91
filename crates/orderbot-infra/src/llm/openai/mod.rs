//! OpenAI chat backend.
//!
//! Uses [`async_openai`] for type-safe request/response handling against
//! `https://api.openai.com/v1` (or a configured compatible base URL).
//!
//! The client is built with a zero-length retry window: rate limits and 5xx
//! responses come back on the first attempt so the caller can classify them.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, FinishReason,
};
use secrecy::{ExposeSecret, SecretString};

use orderbot_core::llm::provider::LlmProvider;
use orderbot_observe::genai_attrs::PROVIDER_OPENAI;
use orderbot_types::error::ConfigError;
use orderbot_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, Usage,
};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI LLM provider.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &SecretString,
        model: String,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(base_url.unwrap_or(OPENAI_BASE_URL).trim_end_matches('/'));

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        let no_retry = backoff::ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Ok(Self {
            client: Client::build(http_client, openai_config, no_retry),
            model,
            timeout,
        })
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(&self, request: &CompletionRequest) -> CreateChatCompletionRequest {
        let messages = request.messages.iter().map(to_openai_message).collect();

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            top_p: request.top_p.map(|p| p as f32),
            ..Default::default()
        }
    }
}

fn to_openai_message(msg: &Message) -> ChatCompletionRequestMessage {
    match msg.role {
        MessageRole::System => {
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                name: None,
            })
        }
        MessageRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
            name: None,
        }),
        MessageRole::Assistant => {
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    msg.content.clone(),
                )),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
    }
}

fn finish_reason_name(reason: &FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
        FinishReason::ToolCalls => "tool_calls",
        FinishReason::ContentFilter => "content_filter",
        FinishReason::FunctionCall => "function_call",
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_OPENAI
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request);

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(|e| self.map_error(e))?;

        let first = response.choices.first();
        let content = first
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| {
                LlmError::Deserialization("response contained no message content".into())
            })?;
        let finish_reason = first
            .and_then(|c| c.finish_reason.as_ref())
            .map(|fr| finish_reason_name(fr).to_string());

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            finish_reason,
            usage,
        })
    }
}

impl OpenAiProvider {
    fn map_error(&self, err: async_openai::error::OpenAIError) -> LlmError {
        use async_openai::error::OpenAIError;

        if matches!(&err, OpenAIError::Reqwest(e) if e.is_timeout()) {
            LlmError::Timeout {
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            map_openai_error(err)
        }
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded"
                || code == "insufficient_quota"
                || error_type == "rate_limit_error"
            {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "server_error" || error_type == "overloaded_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status() {
            Some(status) => LlmError::from_status(status.as_u16(), err.to_string()),
            None => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use orderbot_types::llm::ProviderErrorKind;
    use serde_json::json;

    use crate::test_support::spawn_stub;

    fn provider_at(base_url: Option<&str>) -> OpenAiProvider {
        OpenAiProvider::new(
            &SecretString::from("sk-test"),
            "gpt-4o-mini".to_string(),
            base_url,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn provider() -> OpenAiProvider {
        provider_at(None)
    }

    fn request(model: &str) -> CompletionRequest {
        CompletionRequest {
            model: model.to_string(),
            messages: vec![
                Message {
                    role: MessageRole::System,
                    content: "Be helpful".to_string(),
                },
                Message {
                    role: MessageRole::User,
                    content: "Hello".to_string(),
                },
                Message {
                    role: MessageRole::Assistant,
                    content: "Hi there!".to_string(),
                },
            ],
            max_tokens: 500,
            temperature: Some(0.7),
            top_p: Some(1.0),
            stream: false,
        }
    }

    #[test]
    fn test_provider_name_and_model() {
        let provider = provider();
        assert_eq!(provider.name(), "openai");
        assert_eq!(LlmProvider::model(&provider), "gpt-4o-mini");
    }

    #[test]
    fn test_build_request_messages() {
        let oai_req = provider().build_request(&request("gpt-4o"));
        assert_eq!(oai_req.model, "gpt-4o");
        assert_eq!(oai_req.messages.len(), 3);
        assert!(matches!(
            oai_req.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            oai_req.messages[2],
            ChatCompletionRequestMessage::Assistant(_)
        ));
        assert_eq!(oai_req.max_completion_tokens, Some(500));
        assert_eq!(oai_req.temperature, Some(0.7));
        assert_eq!(oai_req.top_p, Some(1.0));
        assert!(oai_req.stream.is_none());
    }

    #[test]
    fn test_build_request_empty_model_uses_default() {
        let oai_req = provider().build_request(&request(""));
        assert_eq!(oai_req.model, "gpt-4o-mini");
    }

    #[test]
    fn test_finish_reason_names() {
        assert_eq!(finish_reason_name(&FinishReason::Stop), "stop");
        assert_eq!(finish_reason_name(&FinishReason::Length), "length");
    }

    #[test]
    fn test_map_openai_error_api_auth() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: Some("invalid_api_key".to_string()),
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, LlmError::AuthenticationFailed));
        assert_eq!(err.kind(), ProviderErrorKind::Unauthorized);
    }

    #[test]
    fn test_map_openai_error_rate_limit() {
        use async_openai::error::{ApiError, OpenAIError};
        for code in ["rate_limit_exceeded", "insufficient_quota"] {
            let api_err = ApiError {
                message: "Slow down".to_string(),
                r#type: None,
                param: None,
                code: Some(code.to_string()),
            };
            let err = map_openai_error(OpenAIError::ApiError(api_err));
            assert_eq!(err.kind(), ProviderErrorKind::RateLimited);
        }
    }

    #[test]
    fn test_map_openai_error_other_is_transient() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "The model does not exist".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: Some("model_not_found".to_string()),
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert_eq!(err.kind(), ProviderErrorKind::Transient);

        let err = map_openai_error(OpenAIError::InvalidArgument("bad arg".to_string()));
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_complete_success() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                axum::Json(json!({
                    "id": "chatcmpl-9",
                    "object": "chat.completion",
                    "created": 1_700_000_000,
                    "model": "gpt-4o-mini",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "One pepperoni, coming up."},
                        "finish_reason": "stop"
                    }],
                    "usage": {"prompt_tokens": 30, "completion_tokens": 6, "total_tokens": 36}
                }))
            }),
        );
        let base = spawn_stub(router).await;

        let response = provider_at(Some(&base)).complete(&request("")).await.unwrap();
        assert_eq!(response.id, "chatcmpl-9");
        assert_eq!(response.content, "One pepperoni, coming up.");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.input_tokens, 30);
        assert_eq!(response.usage.output_tokens, 6);
    }

    #[tokio::test]
    async fn test_rate_limit_is_returned_without_retrying() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        axum::Json(json!({"error": {
                            "message": "Rate limit reached for gpt-4o-mini",
                            "type": "requests",
                            "param": null,
                            "code": "rate_limit_exceeded"
                        }})),
                    )
                }
            }),
        );
        let base = spawn_stub(router).await;

        let err = tokio::time::timeout(
            Duration::from_secs(3),
            provider_at(Some(&base)).complete(&request("")),
        )
        .await
        .expect("rate limit should surface without backoff")
        .unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_returned_without_retrying() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::BAD_GATEWAY, "upstream unavailable")
                }
            }),
        );
        let base = spawn_stub(router).await;

        let err = tokio::time::timeout(
            Duration::from_secs(3),
            provider_at(Some(&base)).complete(&request("")),
        )
        .await
        .expect("server error should surface without backoff")
        .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Transient);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_choices_is_deserialization_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                axum::Json(json!({
                    "id": "chatcmpl-0",
                    "object": "chat.completion",
                    "created": 1_700_000_000,
                    "model": "gpt-4o-mini",
                    "choices": []
                }))
            }),
        );
        let base = spawn_stub(router).await;

        let err = provider_at(Some(&base)).complete(&request("")).await.unwrap_err();
        assert!(matches!(err, LlmError::Deserialization(_)));
        assert!(err.to_string().contains("no message content"));
        assert_eq!(err.kind(), ProviderErrorKind::Transient);
    }
}
