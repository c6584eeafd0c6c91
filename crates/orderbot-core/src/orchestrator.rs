//! ConversationOrchestrator -- the single entry point for an inbound message.
//!
//! For each message, with the user's conversation lock held throughout:
//! 1. Append the user turn and move the conversation to `Collecting`
//! 2. Build the system prompt for the business
//! 3. Call the provider with `[system] + last HISTORY_WINDOW turns`, under a timeout
//! 4. Append the assistant turn
//! 5. Run extraction; a completed order parks the conversation in `Completed`
//!
//! Provider failures are turned into a user-safe reply; `handle` never fails.
//! Completed orders are persisted in a second phase through [`ConversationOrchestrator::commit`].

use std::time::Duration;

use tracing::{Instrument, debug, info, info_span, warn};

use orderbot_observe::genai_attrs::{
    GEN_AI_RESPONSE_FINISH_REASONS, GEN_AI_RESPONSE_ID, GEN_AI_USAGE_INPUT_TOKENS,
    GEN_AI_USAGE_OUTPUT_TOKENS, OP_CHAT,
};

use orderbot_types::config::ProviderSettings;
use orderbot_types::conversation::{ConversationSnapshot, Turn};
use orderbot_types::error::SinkError;
use orderbot_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, ProviderErrorKind,
};
use orderbot_types::order::{BusinessContext, OrderRecord, ProcessResult};

use crate::conversation::{Conversation, ConversationStore, HISTORY_WINDOW};
use crate::extract::OrderExtractor;
use crate::llm::box_provider::BoxLlmProvider;
use crate::ports::OrderSink;
use crate::prompt::build_system_prompt;

/// Reply when the backend rejects or lacks credentials.
pub const UNAUTHORIZED_MESSAGE: &str =
    "Configuration error: Invalid API key. Please contact support.";

/// Reply when the backend is rate limiting us.
pub const RATE_LIMITED_MESSAGE: &str =
    "I'm currently at capacity. Please try again in a few minutes.";

/// User-facing reply for a failed completion.
pub fn failure_message(error: &LlmError) -> String {
    match error.kind() {
        ProviderErrorKind::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
        ProviderErrorKind::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
        ProviderErrorKind::Transient => format!(
            "I'm experiencing technical difficulties: {error}. Please try again or contact us directly."
        ),
    }
}

/// Sampling parameters and limits for every provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Empty means the provider's own default model.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub request_timeout: Duration,
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            model: settings.resolved_model(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            top_p: 1.0,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_settings(&ProviderSettings::default())
    }
}

#[derive(Clone)]
pub struct ConversationOrchestrator {
    provider: BoxLlmProvider,
    store: ConversationStore,
    extractor: OrderExtractor,
    config: OrchestratorConfig,
}

impl ConversationOrchestrator {
    pub fn new(
        provider: BoxLlmProvider,
        store: ConversationStore,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            store,
            extractor: OrderExtractor::new(),
            config,
        }
    }

    pub fn provider(&self) -> &BoxLlmProvider {
        &self.provider
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Process one inbound message and produce the reply.
    pub async fn handle(
        &self,
        user_id: &str,
        text: &str,
        business: &BusinessContext,
    ) -> ProcessResult {
        let mut conversation = self.store.lock(user_id).await;
        conversation.push(Turn::user(text));
        conversation.begin_collecting();

        let request = self.build_request(&conversation, business);
        debug!(
            user_id,
            messages = request.messages.len(),
            state = %conversation.state(),
            "Sending conversation to provider"
        );

        let response = match self.complete(&request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    user_id,
                    provider = self.provider.name(),
                    kind = ?error.kind(),
                    error = %error,
                    "Chat completion failed"
                );
                return ProcessResult::failure(failure_message(&error));
            }
        };

        conversation.push(Turn::assistant(response.content.as_str()));

        let order = self.extractor.extract(&response.content);
        if let Some(order) = &order {
            let replaced = conversation.pending_order().is_some();
            conversation.complete(order.clone());
            info!(
                user_id,
                items = order.items.as_deref().unwrap_or_default(),
                total = order.total.as_deref().unwrap_or_default(),
                replaced,
                "Order completed"
            );
        }

        ProcessResult::reply(response.content, order)
    }

    /// The order extracted for this user and not yet persisted.
    pub async fn pending_order(&self, user_id: &str) -> Option<OrderRecord> {
        self.store.snapshot(user_id).await?.pending_order
    }

    /// Hand the pending order to `sink`, clearing the conversation on success.
    ///
    /// Returns `Ok(None)` when there is nothing to persist. On failure the
    /// conversation stays `Completed` so the same order can be retried.
    pub async fn commit<S: OrderSink>(
        &self,
        user_id: &str,
        sink: &S,
    ) -> Result<Option<OrderRecord>, SinkError> {
        if !self.store.contains(user_id) {
            return Ok(None);
        }

        let mut conversation = self.store.lock(user_id).await;
        let Some(order) = conversation.pending_order().cloned() else {
            return Ok(None);
        };

        if let Err(error) = sink.append_order(&order).await {
            warn!(user_id, error = %error, "Failed to persist order; keeping it pending");
            return Err(error);
        }

        conversation.reset();
        info!(user_id, "Order persisted; conversation cleared");
        Ok(Some(order))
    }

    /// Reset the user's conversation unconditionally.
    pub async fn clear(&self, user_id: &str) {
        self.store.clear(user_id).await;
    }

    pub async fn snapshot(&self, user_id: &str) -> Option<ConversationSnapshot> {
        self.store.snapshot(user_id).await
    }

    fn build_request(
        &self,
        conversation: &Conversation,
        business: &BusinessContext,
    ) -> CompletionRequest {
        let mut messages = Vec::with_capacity(HISTORY_WINDOW + 1);
        messages.push(Message {
            role: MessageRole::System,
            content: build_system_prompt(business),
        });
        messages.extend(conversation.window(HISTORY_WINDOW).map(Message::from));

        let model = if self.config.model.is_empty() {
            self.provider.model().to_string()
        } else {
            self.config.model.clone()
        };

        CompletionRequest {
            model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            top_p: Some(self.config.top_p),
            stream: false,
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let span = info_span!(
            "gen_ai.complete",
            gen_ai.operation.name = OP_CHAT,
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.top_p = ?request.top_p,
            gen_ai.response.id = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
        );

        let timeout = self.config.request_timeout;
        let result = tokio::time::timeout(timeout, self.provider.complete(request))
            .instrument(span.clone())
            .await;

        match result {
            Ok(Ok(response)) => {
                span.record(GEN_AI_RESPONSE_ID, response.id.as_str());
                if let Some(reason) = response.finish_reason.as_deref() {
                    span.record(GEN_AI_RESPONSE_FINISH_REASONS, reason);
                }
                span.record(GEN_AI_USAGE_INPUT_TOKENS, response.usage.input_tokens);
                span.record(GEN_AI_USAGE_OUTPUT_TOKENS, response.usage.output_tokens);
                Ok(response)
            }
            Ok(Err(error)) => Err(error),
            Err(_) => Err(LlmError::Timeout {
                after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

impl std::fmt::Debug for ConversationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationOrchestrator")
            .field("provider", &self.provider)
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use orderbot_types::conversation::ConversationState;
    use orderbot_types::llm::Usage;

    use crate::conversation::StoreConfig;
    use crate::llm::provider::LlmProvider;
    use crate::llm::unavailable::UnavailableProvider;

    // --- Mock provider ---

    #[derive(Default)]
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn replying(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("OK".to_string()))?;
            Ok(CompletionResponse {
                id: "resp".to_string(),
                content: reply,
                model: request.model.clone(),
                finish_reason: Some("stop".to_string()),
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            })
        }
    }

    // --- Mock sink ---

    #[derive(Default)]
    struct RecordingSink {
        orders: Mutex<Vec<OrderRecord>>,
        fail: bool,
    }

    impl OrderSink for RecordingSink {
        async fn append_order(&self, order: &OrderRecord) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Request("connection refused".to_string()));
            }
            self.orders.lock().unwrap().push(order.clone());
            Ok(())
        }
    }

    const ORDER_REPLY: &str =
        r#"Thanks! ORDER_COMPLETE_JSON: {"name":"Ann","items":"1x Pizza","total":"$12.00"}"#;

    fn orchestrator_with(
        provider: ScriptedProvider,
    ) -> (ConversationOrchestrator, Arc<Mutex<Vec<CompletionRequest>>>) {
        let requests = Arc::clone(&provider.requests);
        let orchestrator = ConversationOrchestrator::new(
            BoxLlmProvider::new(provider),
            ConversationStore::new(StoreConfig::default()),
            OrchestratorConfig::default(),
        );
        (orchestrator, requests)
    }

    fn business() -> BusinessContext {
        BusinessContext::default()
    }

    #[tokio::test]
    async fn test_request_carries_system_prompt_and_parameters() {
        let (orchestrator, requests) = orchestrator_with(ScriptedProvider::default());
        let result = orchestrator.handle("u1", "Hi", &business()).await;
        assert_eq!(result.response_text, "OK");
        assert!(!result.is_order_complete);

        let requests = requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.model, "llama-3.3-70b-versatile");
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.top_p, Some(1.0));
        assert_eq!(request.max_tokens, 500);
        assert!(!request.stream);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert!(request.messages[0].content.contains("Our Business"));
        assert_eq!(request.messages[1].content, "Hi");
    }

    #[tokio::test]
    async fn test_window_is_bounded() {
        let (orchestrator, requests) = orchestrator_with(ScriptedProvider::default());
        for i in 0..30 {
            orchestrator.handle("u1", &format!("msg {i}"), &business()).await;
        }

        let requests = requests.lock().unwrap();
        assert!(requests.iter().all(|r| r.messages.len() <= HISTORY_WINDOW + 1));
        let last = requests.last().unwrap();
        assert_eq!(last.messages.len(), 11);
        assert_eq!(last.messages[0].role, MessageRole::System);
        assert_eq!(last.messages[10].content, "msg 29");
        assert_eq!(last.messages[10].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_unauthorized_provider_returns_configuration_message() {
        let orchestrator = ConversationOrchestrator::new(
            BoxLlmProvider::new(UnavailableProvider::new("groq", "GROQ_API_KEY is not set")),
            ConversationStore::new(StoreConfig::default()),
            OrchestratorConfig::default(),
        );

        let result = orchestrator.handle("u1", "Hi", &business()).await;
        assert!(!result.is_order_complete);
        assert!(result.order.is_none());
        assert_eq!(result.response_text, UNAUTHORIZED_MESSAGE);

        // The user turn is kept.
        let snapshot = orchestrator.snapshot("u1").await.unwrap();
        assert_eq!(snapshot.turns, vec![Turn::user("Hi")]);
        assert_eq!(snapshot.state, ConversationState::Collecting);
    }

    #[tokio::test]
    async fn test_failure_messages_by_kind() {
        let (orchestrator, _) = orchestrator_with(ScriptedProvider::replying(vec![
            Err(LlmError::RateLimited {
                retry_after_ms: Some(1000),
            }),
            Err(LlmError::Provider {
                message: "HTTP 500: boom".to_string(),
            }),
            Err(LlmError::AuthenticationFailed),
        ]));

        let rate_limited = orchestrator.handle("u1", "a", &business()).await;
        assert_eq!(rate_limited.response_text, RATE_LIMITED_MESSAGE);

        let transient = orchestrator.handle("u1", "b", &business()).await;
        assert!(transient.response_text.starts_with("I'm experiencing technical difficulties: "));
        assert!(transient.response_text.contains("HTTP 500: boom"));
        assert!(transient.response_text.ends_with("Please try again or contact us directly."));

        let unauthorized = orchestrator.handle("u1", "c", &business()).await;
        assert_eq!(unauthorized.response_text, UNAUTHORIZED_MESSAGE);

        assert_eq!(orchestrator.snapshot("u1").await.unwrap().turns.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_transient() {
        let (orchestrator, _) = orchestrator_with(ScriptedProvider::slow(Duration::from_secs(120)));
        let result = orchestrator.handle("u1", "Hi", &business()).await;
        assert!(!result.is_order_complete);
        assert!(result.response_text.contains("timed out after 30000ms"));
    }

    #[tokio::test]
    async fn test_completed_order_is_pending() {
        let (orchestrator, _) =
            orchestrator_with(ScriptedProvider::replying(vec![Ok(ORDER_REPLY.to_string())]));

        let result = orchestrator.handle("u1", "That's all", &business()).await;
        assert!(result.is_order_complete);
        let order = result.order.unwrap();
        assert_eq!(order.items.as_deref(), Some("1x Pizza"));

        let pending = orchestrator.pending_order("u1").await.unwrap();
        assert_eq!(pending, order);

        let snapshot = orchestrator.snapshot("u1").await.unwrap();
        assert_eq!(snapshot.state, ConversationState::Completed);
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[1].content(), ORDER_REPLY);
    }

    #[tokio::test]
    async fn test_newer_order_replaces_pending() {
        let (orchestrator, _) = orchestrator_with(ScriptedProvider::replying(vec![
            Ok(ORDER_REPLY.to_string()),
            Ok("Anything else?".to_string()),
            Ok(r#"Updated! ORDER_COMPLETE_JSON: {"items":"2x Pizza","total":"$24.00"}"#.to_string()),
        ]));

        orchestrator.handle("u1", "one pizza", &business()).await;
        orchestrator.handle("u1", "wait", &business()).await;
        assert_eq!(
            orchestrator.snapshot("u1").await.unwrap().state,
            ConversationState::Completed
        );
        orchestrator.handle("u1", "make it two", &business()).await;

        let pending = orchestrator.pending_order("u1").await.unwrap();
        assert_eq!(pending.items.as_deref(), Some("2x Pizza"));
    }

    #[tokio::test]
    async fn test_commit_clears_on_success() {
        let (orchestrator, _) =
            orchestrator_with(ScriptedProvider::replying(vec![Ok(ORDER_REPLY.to_string())]));
        orchestrator.handle("u1", "done", &business()).await;

        let sink = RecordingSink::default();
        let committed = orchestrator.commit("u1", &sink).await.unwrap();
        assert_eq!(committed.unwrap().name.as_deref(), Some("Ann"));
        assert_eq!(sink.orders.lock().unwrap().len(), 1);

        let snapshot = orchestrator.snapshot("u1").await.unwrap();
        assert_eq!(snapshot.state, ConversationState::Idle);
        assert!(snapshot.turns.is_empty());
        assert!(orchestrator.pending_order("u1").await.is_none());
    }

    #[tokio::test]
    async fn test_commit_keeps_order_on_sink_failure() {
        let (orchestrator, _) =
            orchestrator_with(ScriptedProvider::replying(vec![Ok(ORDER_REPLY.to_string())]));
        orchestrator.handle("u1", "done", &business()).await;

        let failing = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let err = orchestrator.commit("u1", &failing).await.unwrap_err();
        assert!(matches!(err, SinkError::Request(_)));

        let snapshot = orchestrator.snapshot("u1").await.unwrap();
        assert_eq!(snapshot.state, ConversationState::Completed);
        assert!(snapshot.pending_order.is_some());

        // Retry succeeds without re-extraction.
        let sink = RecordingSink::default();
        assert!(orchestrator.commit("u1", &sink).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_without_pending_order() {
        let (orchestrator, _) = orchestrator_with(ScriptedProvider::default());
        let sink = RecordingSink::default();
        assert!(orchestrator.commit("nobody", &sink).await.unwrap().is_none());
        assert!(!orchestrator.store().contains("nobody"));

        orchestrator.handle("u1", "hi", &business()).await;
        assert!(orchestrator.commit("u1", &sink).await.unwrap().is_none());
        assert!(sink.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_starts_fresh_history() {
        let (orchestrator, requests) = orchestrator_with(ScriptedProvider::default());
        orchestrator.handle("u1", "first", &business()).await;
        orchestrator.handle("u1", "second", &business()).await;
        orchestrator.clear("u1").await;
        orchestrator.handle("u1", "again", &business()).await;

        let requests = requests.lock().unwrap();
        let last = requests.last().unwrap();
        assert_eq!(last.messages.len(), 2);
        assert_eq!(last.messages[1].content, "again");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = ProviderSettings {
            model: Some("custom".to_string()),
            request_timeout_secs: 5,
            ..Default::default()
        };
        let config = OrchestratorConfig::from_settings(&settings);
        assert_eq!(config.model, "custom");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.top_p, 1.0);
    }
}
