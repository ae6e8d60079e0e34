pub mod agent;
pub mod api_client;
pub mod core;
pub mod history;
pub mod input;
pub mod llm;
pub mod monitoring;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod retrieval;
pub mod search;
pub mod server;
pub mod state;
pub mod tools;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;
