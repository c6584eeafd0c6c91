//! Shared fixtures for handler and router tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;

use orderbot_core::llm::box_provider::BoxLlmProvider;
use orderbot_core::llm::provider::LlmProvider;
use orderbot_infra::secret::Secrets;
use orderbot_types::config::AppConfig;
use orderbot_types::llm::{CompletionRequest, CompletionResponse, LlmError, MessageRole, Usage};

use crate::state::AppState;

pub const ORDER_REPLY: &str = r#"Great, that's $12.00. ORDER_COMPLETE_JSON: {"name":"Ana","phone":"555-0100","items":"1x Pizza","total":"$12.00","address":"1 Elm St","notes":""}"#;

/// Replies with a completed order once the user says "all", otherwise asks
/// what they want.
pub struct ScriptedProvider;

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let content = if last_user.contains("all") {
            ORDER_REPLY
        } else {
            "What would you like to order?"
        };
        Ok(CompletionResponse {
            id: "scripted".to_string(),
            content: content.to_string(),
            model: "scripted-1".to_string(),
            finish_reason: Some("stop".to_string()),
            usage: Usage::default(),
        })
    }
}

pub fn secrets(pairs: &[(&str, &str)]) -> Secrets {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Secrets::from_lookup(|key| env.get(key).cloned())
}

pub fn scripted_state(config: AppConfig, pairs: &[(&str, &str)]) -> AppState {
    AppState::with_provider(config, secrets(pairs), BoxLlmProvider::new(ScriptedProvider)).unwrap()
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Graph API stand-in recording every `/v18.0/me/messages` body.
pub async fn spawn_messenger_stub() -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let bodies = Arc::new(Mutex::new(Vec::new()));

    async fn capture(
        State(bodies): State<Arc<Mutex<Vec<serde_json::Value>>>>,
        Json(body): Json<serde_json::Value>,
    ) -> Json<serde_json::Value> {
        bodies.lock().unwrap().push(body);
        Json(serde_json::json!({"recipient_id": "1", "message_id": "m1"}))
    }

    let router = Router::new()
        .route("/v18.0/me/messages", post(capture))
        .with_state(Arc::clone(&bodies));
    (spawn_server(router).await, bodies)
}
