use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use ragbot_backend::core::logging;
use ragbot_backend::server;
use ragbot_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().await?;
    logging::init(&state.paths);

    let status = state.pipeline.pipeline_status().await;
    tracing::info!(
        "Pipeline ready: {}",
        status
            .get("overall_status")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    );

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(0);
    let bind_addr = format!("127.0.0.1:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("RAGBOT_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
