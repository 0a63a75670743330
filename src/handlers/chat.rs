use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::support::{help_desk_reply, Message};
use crate::state::AppState;

// POST /api/chat
#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message is required".to_string()));
    }

    let response = help_desk_reply(state.llm.as_ref(), &body.history, &body.message)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "help desk chat failed");
            AppError::Ai(e.to_string())
        })?;

    Ok(Json(ChatResponse { response }))
}
