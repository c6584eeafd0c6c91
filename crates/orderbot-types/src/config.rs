//! Application configuration types for orderbot.
//!
//! `AppConfig` mirrors `orderbot.toml`. Every section and field has a
//! default, so an empty (or missing) file yields a runnable configuration.
//! Secrets never live here; they are read from the environment.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderBackend;
use crate::order::BusinessContext;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderSettings,
    pub conversation: ConversationSettings,
    pub business: BusinessContext,
    pub messenger: MessengerSettings,
    pub sheets: SheetsSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Chat backend selection and sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub backend: ProviderBackend,
    /// Overrides the backend's default model.
    pub model: Option<String>,
    /// Overrides the backend's default API base URL.
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl ProviderSettings {
    /// The model to request, falling back to the backend default.
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.backend.default_model().to_string())
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            backend: ProviderBackend::Groq,
            model: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: 500,
            request_timeout_secs: 30,
        }
    }
}

/// Bounds on the in-memory conversation store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    /// Maximum number of users with a live conversation.
    pub max_conversations: usize,
    /// Conversations idle longer than this are evicted by the sweeper.
    pub idle_ttl_secs: u64,
    /// Turns retained per conversation (never fewer than the provider window).
    pub max_history: usize,
    /// How often the server sweeps idle conversations.
    pub sweep_interval_secs: u64,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            max_conversations: 10_000,
            idle_ttl_secs: 3_600,
            max_history: 50,
            sweep_interval_secs: 60,
        }
    }
}

/// Messenger Graph API endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerSettings {
    pub graph_api_base: String,
    pub graph_api_version: String,
}

impl Default for MessengerSettings {
    fn default() -> Self {
        Self {
            graph_api_base: "https://graph.facebook.com".to_string(),
            graph_api_version: "v18.0".to_string(),
        }
    }
}

/// Google Sheets values API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub api_base: String,
    /// A1 range orders are appended to.
    pub range: String,
    /// Sheet tab holding the orders (used for status updates).
    pub sheet_name: String,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            api_base: "https://sheets.googleapis.com/v4".to_string(),
            range: "Sheet1!A:G".to_string(),
            sheet_name: "Sheet1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.provider.backend, ProviderBackend::Groq);
        assert_eq!(config.provider.temperature, 0.7);
        assert_eq!(config.provider.max_tokens, 500);
        assert_eq!(config.conversation.max_conversations, 10_000);
        assert_eq!(config.business.name(), "Our Business");
    }

    #[test]
    fn test_app_config_deserialize_empty() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.provider.request_timeout_secs, 30);
        assert_eq!(config.sheets.range, "Sheet1!A:G");
        assert_eq!(config.messenger.graph_api_version, "v18.0");
    }

    #[test]
    fn test_app_config_deserialize_with_values() {
        let toml_str = r#"
[server]
port = 8080

[provider]
backend = "openai"
model = "gpt-4o"
temperature = 0.2

[conversation]
idle_ttl_secs = 120

[business]
name = "Demo Restaurant"
type = "pizzeria"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.provider.backend, ProviderBackend::OpenAi);
        assert_eq!(config.provider.resolved_model(), "gpt-4o");
        assert_eq!(config.provider.max_tokens, 500);
        assert_eq!(config.conversation.idle_ttl_secs, 120);
        assert_eq!(config.conversation.max_history, 50);
        assert_eq!(config.business.name(), "Demo Restaurant");
        assert_eq!(config.business.kind(), "pizzeria");
    }

    #[test]
    fn test_resolved_model_falls_back_to_backend_default() {
        let settings = ProviderSettings {
            model: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(settings.resolved_model(), "llama-3.3-70b-versatile");
    }
}
