//! Service status endpoints.
//!
//! - GET /        - Which integrations are configured
//! - GET /health  - Liveness

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub ai: AiStatus,
    pub sheets: bool,
    pub messenger: bool,
    pub signature_verification: bool,
}

#[derive(Debug, Serialize)]
pub struct AiStatus {
    pub configured: bool,
    pub provider: String,
    pub model: String,
}

/// GET / - Report which integrations have credentials.
pub async fn service_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    let provider = state.orchestrator.provider();
    Json(ServiceStatus {
        status: "active",
        version: env!("CARGO_PKG_VERSION"),
        ai: AiStatus {
            configured: state.ai_configured(),
            provider: provider.name().to_string(),
            model: state.orchestrator.config().model.clone(),
        },
        sheets: state.sheets.is_configured(),
        messenger: state.messenger.is_configured(),
        signature_verification: state.secrets.app_secret.is_some(),
    })
}

/// GET /health
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
