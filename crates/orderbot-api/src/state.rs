//! Application state wiring the pipeline together.
//!
//! AppState holds the orchestrator plus the concrete outbound clients used
//! by both the CLI and the HTTP server. The core is generic over its ports;
//! AppState pins them to the infra implementations.

use std::path::Path;
use std::sync::Arc;

use orderbot_core::conversation::{ConversationStore, StoreConfig};
use orderbot_core::llm::box_provider::BoxLlmProvider;
use orderbot_core::orchestrator::{ConversationOrchestrator, OrchestratorConfig};
use orderbot_infra::config::load_config;
use orderbot_infra::llm::provider_or_unavailable;
use orderbot_infra::messenger::MessengerClient;
use orderbot_infra::secret::Secrets;
use orderbot_infra::sheets::SheetsOrderSink;
use orderbot_types::config::AppConfig;
use orderbot_types::order::BusinessContext;

/// Shared application state.
///
/// Cloning is cheap: every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ConversationOrchestrator,
    pub messenger: Arc<MessengerClient>,
    pub sheets: Arc<SheetsOrderSink>,
    pub config: Arc<AppConfig>,
    pub secrets: Arc<Secrets>,
}

impl AppState {
    /// Load configuration from `config_path`, read secrets from the
    /// environment, and wire every service.
    pub async fn init(config_path: &Path) -> anyhow::Result<Self> {
        let config = load_config(config_path).await;
        let secrets = Secrets::from_env();
        Self::from_parts(config, secrets)
    }

    /// Wire services from already-loaded configuration and secrets.
    ///
    /// A chat backend that cannot be configured does not fail startup; it is
    /// replaced by a provider that reports the configuration error per message.
    pub fn from_parts(config: AppConfig, secrets: Secrets) -> anyhow::Result<Self> {
        let provider = provider_or_unavailable(&config.provider, &secrets);
        Self::with_provider(config, secrets, provider)
    }

    /// Wire services around an explicit chat provider.
    pub fn with_provider(
        config: AppConfig,
        secrets: Secrets,
        provider: BoxLlmProvider,
    ) -> anyhow::Result<Self> {
        let store = ConversationStore::new(StoreConfig::from(&config.conversation));
        let orchestrator = ConversationOrchestrator::new(
            provider,
            store,
            OrchestratorConfig::from_settings(&config.provider),
        );

        let messenger = MessengerClient::new(&config.messenger, secrets.page_access_token.clone())?;
        let sheets = SheetsOrderSink::new(
            &config.sheets,
            secrets.google_sheet_id.clone(),
            secrets.google_sheets_access_token.clone(),
        )?;

        Ok(Self {
            orchestrator,
            messenger: Arc::new(messenger),
            sheets: Arc::new(sheets),
            config: Arc::new(config),
            secrets: Arc::new(secrets),
        })
    }

    pub fn business(&self) -> &BusinessContext {
        &self.config.business
    }

    /// True when a real chat backend is behind the orchestrator.
    pub fn ai_configured(&self) -> bool {
        self.secrets.api_key(self.config.provider.backend).is_some()
    }
}
