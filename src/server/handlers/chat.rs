use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::output::OutputChannel;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub channel: Option<String>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let channel = match payload.channel.as_deref() {
        Some(name) => name.parse::<OutputChannel>()?,
        None => state.pipeline.output().default_channel(),
    };
    let session_id = payload
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| state.default_session_id())
        .to_string();

    let response = state
        .pipeline
        .process(&payload.message, &session_id, channel)
        .await;

    Ok(Json(json!({
        "result": response.record,
        "output": response.output
    })))
}

pub async fn list_templates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "templates": state.pipeline.prompts().list_templates() }))
}
