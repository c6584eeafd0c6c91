//! LlmProvider trait definition.
//!
//! This is the core abstraction that both chat backends implement.
//! Uses RPITIT for `complete`; [`super::box_provider::BoxLlmProvider`]
//! provides dynamic dispatch on top of it.

use orderbot_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for chat completion backends (Groq, OpenAI).
///
/// Implementations live in orderbot-infra. A provider only performs the
/// network call: it never reads or writes conversation state.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "groq", "openai").
    fn name(&self) -> &str;

    /// Model identifier used when a request leaves `model` empty.
    fn model(&self) -> &str;

    /// Send a non-streaming completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
