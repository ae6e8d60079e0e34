#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};

use ragbot_backend::core::config::{AppConfig, AppPaths, ConfigService};
use ragbot_backend::core::errors::ApiError;
use ragbot_backend::llm::{ChatMessage, ChatRequest, LlmProvider};
use ragbot_backend::pipeline::RagPipeline;
use ragbot_backend::search::TavilyClient;
use ragbot_backend::state::AppState;
use ragbot_backend::vector_store::{CollectionInfo, QueryInput, QueryResult, VectorStore};

pub struct CannedLlm {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl CannedLlm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for CannedLlm {
    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned-model"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        self.requests.lock().unwrap().push(request.messages);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::Upstream("no more replies".to_string()))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs.iter().map(|_| vec![0.0]).collect())
    }
}

/// One collection holding fixed documents.
pub struct FixedStore {
    documents: Vec<String>,
}

impl FixedStore {
    pub fn new(documents: &[&str]) -> Self {
        Self {
            documents: documents.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn collection() -> CollectionInfo {
        CollectionInfo {
            id: "c-1".to_string(),
            name: "dsa_notes".to_string(),
            metadata: None,
        }
    }
}

#[async_trait]
impl VectorStore for FixedStore {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ApiError> {
        Ok(vec![Self::collection()])
    }

    async fn get_collection(&self, _name: &str) -> Result<CollectionInfo, ApiError> {
        Ok(Self::collection())
    }

    async fn query(
        &self,
        _collection: &CollectionInfo,
        _input: QueryInput,
        n_results: usize,
    ) -> Result<QueryResult, ApiError> {
        let documents: Vec<String> = self.documents.iter().take(n_results).cloned().collect();
        let mut meta = Map::new();
        meta.insert("source".to_string(), Value::String("dsa.md".to_string()));
        Ok(QueryResult {
            metadatas: documents.iter().map(|_| Some(meta.clone())).collect(),
            distances: documents.iter().map(|_| Some(0.1)).collect(),
            documents,
        })
    }
}

pub fn offline_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.llm.api_key = None;
    config.search.api_key = None;
    config.vector_store.url = "http://127.0.0.1:1".to_string();
    config.monitoring.save_to_file = false;
    config
}

pub fn paths(dir: &Path) -> AppPaths {
    AppPaths::with_data_dir(dir.to_path_buf(), dir.join("data"))
}

pub fn state_with(
    dir: &Path,
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
) -> Arc<AppState> {
    let config = offline_config();
    let paths = Arc::new(paths(dir));
    let tavily = TavilyClient::new(&config.search).unwrap();
    let pipeline = RagPipeline::with_services(config.clone(), &paths, llm, store, tavily).unwrap();
    let service = ConfigService::new(paths.clone());
    Arc::new(AppState::from_parts(paths, service, config, pipeline))
}
