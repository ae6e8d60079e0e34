mod common;

use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

use ragbot_backend::server::handlers::{chat, health, sessions};

use common::{state_with, CannedLlm, FixedStore};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn chat_returns_record_and_formatted_text() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(CannedLlm::new(&[
        "fallback notes",
        r#"{"type":"final","content":"A stack is LIFO."}"#,
    ]));
    let state = state_with(dir.path(), llm, Arc::new(FixedStore::new(&["stack notes"])));

    let request = chat::ChatRequest {
        message: "What is a stack data structure?".to_string(),
        session_id: Some("web".to_string()),
        channel: None,
    };
    let response = chat::chat(State(state.clone()), Json(request))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"]["success"], true);
    assert_eq!(body["result"]["session_id"], "web");
    assert_eq!(body["output"]["success"], true);
    assert!(body["output"]["formatted_output"]
        .as_str()
        .unwrap()
        .starts_with("✅ **Response**"));

    let response = sessions::get_session(State(state), Path("web".to_string()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["session"]["query_count"], 1);
}

#[tokio::test]
async fn file_delivery_failure_reaches_the_client() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(CannedLlm::new(&[
        "fallback notes",
        r#"{"type":"final","content":"A queue is FIFO."}"#,
    ]));
    let state = state_with(dir.path(), llm, Arc::new(FixedStore::new(&["queue notes"])));
    std::fs::remove_dir_all(&state.paths.output_dir).unwrap();
    std::fs::write(&state.paths.output_dir, "occupied").unwrap();

    let request = chat::ChatRequest {
        message: "What is a queue data structure?".to_string(),
        session_id: None,
        channel: Some("file".to_string()),
    };
    let response = chat::chat(State(state), Json(request)).await.into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"]["success"], true);
    assert_eq!(body["output"]["success"], false);
    assert_eq!(body["output"]["channel"], "file");
    assert!(body["output"].get("path").is_none());
    assert!(body["output"]["error"]
        .as_str()
        .unwrap()
        .starts_with("internal error"));
}

#[tokio::test]
async fn unknown_channel_is_a_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(
        dir.path(),
        Arc::new(CannedLlm::new(&[])),
        Arc::new(FixedStore::new(&[])),
    );

    let request = chat::ChatRequest {
        message: "Explain recursion please".to_string(),
        session_id: None,
        channel: Some("fax".to_string()),
    };
    let response = chat::chat(State(state), Json(request)).await.into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_session_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(
        dir.path(),
        Arc::new(CannedLlm::new(&[])),
        Arc::new(FixedStore::new(&[])),
    );

    let response = sessions::delete_session(State(state.clone()), Path("nope".to_string()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = health::get_status(State(state)).await.into_response();
    let body = body_json(response).await;
    assert_eq!(body["database"]["status"], "connected");
    assert_eq!(body["overall_status"], "3/5 components operational");
}
