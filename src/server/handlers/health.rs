use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "app": state.settings.app.name,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.pipeline_status().await)
}

pub async fn get_agent_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.agent().agent_info())
}
