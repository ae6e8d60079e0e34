use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

const DEFAULT_SUMMARY_MESSAGES: usize = 5;

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.pipeline.agent().sessions();
    let sessions = store.list_sessions()?;
    let statistics = store.statistics()?;
    Ok(Json(json!({
        "sessions": sessions,
        "statistics": statistics
    })))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.pipeline.agent().sessions();
    let session = store
        .session_info(&session_id)?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    let coding_context = store.coding_context(&session_id)?;

    Ok(Json(json!({
        "session": session,
        "coding_context": coding_context
    })))
}

pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.pipeline.agent().sessions().history(&session_id)?;
    Ok(Json(json!({ "messages": messages })))
}

pub async fn get_session_summary(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let last_n = params
        .get("last_n")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_SUMMARY_MESSAGES);
    let summary = state
        .pipeline
        .agent()
        .sessions()
        .summarize(&session_id, last_n)?;
    Ok(Json(json!({ "summary": summary })))
}

pub async fn export_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let export = state.pipeline.agent().sessions().export(&session_id)?;
    Ok(Json(export))
}

pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cleared = state.pipeline.agent().sessions().clear(&session_id)?;
    Ok(Json(json!({ "success": cleared })))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.pipeline.agent().sessions().remove(&session_id)?;
    if !removed {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}
