//! Direct message endpoint.
//!
//! - POST /api/v1/messages - Run one message through the pipeline and return
//!   the reply. Nothing is delivered to the messaging platform and completed
//!   orders are left pending rather than persisted.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use orderbot_types::order::ProcessResult;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub user_id: String,
    pub text: String,
}

/// POST /api/v1/messages
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<ApiResponse<ProcessResult>, AppError> {
    let started = Instant::now();

    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::Validation("user_id must not be empty".into()));
    }
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text must not be empty".into()));
    }

    let result = state
        .orchestrator
        .handle(user_id, &request.text, state.business())
        .await;

    let link = format!("/api/v1/conversations/{user_id}");
    Ok(ApiResponse::success(result, started).with_link("conversation", &link))
}
