use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to build RAG pipeline: {0}")]
    Pipeline(#[source] anyhow::Error),
}
