//! Chat backend implementations.
//!
//! Contains the concrete [`LlmProvider`](orderbot_core::llm::provider::LlmProvider)
//! implementations and the factory ([`create_provider`]) that picks one from
//! [`ProviderSettings`] at startup.

pub mod groq;
pub mod openai;

use std::time::Duration;

use orderbot_core::llm::box_provider::BoxLlmProvider;
use orderbot_core::llm::unavailable::UnavailableProvider;
use orderbot_types::config::ProviderSettings;
use orderbot_types::error::ConfigError;
use orderbot_types::llm::{CompletionRequest, LlmError, Message, MessageRole, ProviderBackend};

use crate::secret::Secrets;

use self::groq::GroqProvider;
use self::openai::OpenAiProvider;

/// Create a [`BoxLlmProvider`] for the configured backend.
///
/// # Errors
///
/// [`ConfigError::MissingEnvVar`] when the backend's API key is not set,
/// [`ConfigError::HttpClient`] when the HTTP client cannot be built.
pub fn create_provider(
    settings: &ProviderSettings,
    secrets: &Secrets,
) -> Result<BoxLlmProvider, ConfigError> {
    let backend = settings.backend;
    let api_key = secrets
        .api_key(backend)
        .ok_or_else(|| ConfigError::MissingEnvVar(backend.api_key_env().to_string()))?;
    let model = settings.resolved_model();
    let timeout = Duration::from_secs(settings.request_timeout_secs);

    match backend {
        ProviderBackend::Groq => {
            let mut provider = GroqProvider::new(api_key.clone(), model, timeout)?;
            if let Some(base_url) = settings.base_url.as_deref() {
                provider = provider.with_base_url(base_url);
            }
            Ok(BoxLlmProvider::new(provider))
        }
        ProviderBackend::OpenAi => {
            let provider =
                OpenAiProvider::new(api_key, model, settings.base_url.as_deref(), timeout)?;
            Ok(BoxLlmProvider::new(provider))
        }
    }
}

/// Like [`create_provider`], but never fails: a configuration error yields a
/// provider whose every call fails fast with [`LlmError::NotConfigured`].
pub fn provider_or_unavailable(settings: &ProviderSettings, secrets: &Secrets) -> BoxLlmProvider {
    match create_provider(settings, secrets) {
        Ok(provider) => {
            tracing::info!(
                provider = provider.name(),
                model = provider.model(),
                "Chat backend configured"
            );
            provider
        }
        Err(err) => {
            tracing::warn!(
                backend = %settings.backend,
                error = %err,
                "Chat backend unavailable; replies will report a configuration error"
            );
            BoxLlmProvider::new(UnavailableProvider::new(
                settings.backend.to_string(),
                err.to_string(),
            ))
        }
    }
}

/// Test provider connectivity by sending a minimal completion request.
///
/// Used by `orderbot check --ping` to verify the API key and endpoint. The
/// whole call is bounded by `timeout`.
pub async fn test_provider_connection(
    provider: &BoxLlmProvider,
    timeout: Duration,
) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(),
        messages: vec![Message {
            role: MessageRole::User,
            content: "Hello".to_string(),
        }],
        max_tokens: 10,
        temperature: Some(0.0),
        top_p: None,
        stream: false,
    };
    tokio::time::timeout(timeout, provider.complete(&request))
        .await
        .map_err(|_| LlmError::Timeout {
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })??;
    Ok(())
}
