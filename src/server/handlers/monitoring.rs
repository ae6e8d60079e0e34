use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let detailed = params
        .get("detailed")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);
    let status = state.pipeline.monitor().status(detailed)?;
    Ok(Json(status))
}

pub async fn get_health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state.pipeline.monitor().health()?;
    Ok(Json(report))
}

pub async fn get_report(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state.pipeline.monitor().performance_report()?;
    Ok(Json(json!({
        "report": report,
        "input": state.pipeline.input().stats(),
        "output": state.pipeline.output().stats()
    })))
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let backup = state.pipeline.monitor().reset()?;
    state.pipeline.output().reset_stats();
    Ok(Json(json!({
        "status": "reset",
        "backup_file": backup
    })))
}

pub async fn export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let path = state.pipeline.monitor().export()?;
    Ok(Json(json!({ "file": path })))
}
