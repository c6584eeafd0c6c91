//! Conversation inspection endpoints.
//!
//! - GET  /api/v1/conversations/{user_id}       - Turns, state, pending order
//! - POST /api/v1/conversations/{user_id}/clear - Reset to a fresh history

use std::time::Instant;

use axum::extract::{Path, State};
use serde::Serialize;

use orderbot_types::conversation::ConversationSnapshot;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearedConversation {
    pub user_id: String,
    pub cleared: bool,
}

/// GET /api/v1/conversations/{user_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<ConversationSnapshot>, AppError> {
    let started = Instant::now();
    let snapshot = state
        .orchestrator
        .snapshot(&user_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("no conversation for user '{user_id}'")))?;
    Ok(ApiResponse::success(snapshot, started))
}

/// POST /api/v1/conversations/{user_id}/clear
pub async fn clear_conversation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResponse<ClearedConversation> {
    let started = Instant::now();
    state.orchestrator.clear(&user_id).await;
    tracing::info!(user_id = %user_id, "Conversation cleared via API");
    ApiResponse::success(
        ClearedConversation {
            user_id,
            cleared: true,
        },
        started,
    )
}
