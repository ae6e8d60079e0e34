//! In-process doubles for the external collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::vector_store::{CollectionInfo, QueryInput, QueryResult, VectorStore};

/// Replays canned completions in order and records every request.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    always_fail: Option<String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            always_fail: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            always_fail: Some(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    /// Each request flattened to one string.
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|messages| {
                messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(self.always_fail.is_none())
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        self.requests.lock().unwrap().push(request.messages);
        if let Some(message) = &self.always_fail {
            return Err(ApiError::Upstream(message.clone()));
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(ApiError::Upstream(message)),
            None => Err(ApiError::Upstream("script exhausted".to_string())),
        }
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if let Some(message) = &self.always_fail {
            return Err(ApiError::Upstream(message.clone()));
        }
        Ok(inputs.iter().map(|t| vec![t.len() as f32]).collect())
    }
}

/// Collections of `(document, distance)` pairs returned verbatim by `query`.
#[derive(Default)]
pub struct MemoryStore {
    collections: Vec<(String, Vec<(String, f32)>)>,
    fail_with: Option<String>,
    queries: Mutex<Vec<(String, QueryInput)>>,
}

impl MemoryStore {
    pub fn with_collection(mut self, name: &str, documents: Vec<(&str, f32)>) -> Self {
        self.collections.push((
            name.to_string(),
            documents
                .into_iter()
                .map(|(d, dist)| (d.to_string(), dist))
                .collect(),
        ));
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<(String, QueryInput)> {
        self.queries.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), ApiError> {
        match &self.fail_with {
            Some(message) => Err(ApiError::Network(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ApiError> {
        self.check()?;
        Ok(self
            .collections
            .iter()
            .map(|(name, _)| CollectionInfo {
                id: format!("id-{}", name),
                name: name.clone(),
                metadata: None,
            })
            .collect())
    }

    async fn get_collection(&self, name: &str) -> Result<CollectionInfo, ApiError> {
        self.check()?;
        self.collections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(n, _)| CollectionInfo {
                id: format!("id-{}", n),
                name: n.clone(),
                metadata: None,
            })
            .ok_or_else(|| ApiError::NotFound(format!("collection {}", name)))
    }

    async fn query(
        &self,
        collection: &CollectionInfo,
        input: QueryInput,
        n_results: usize,
    ) -> Result<QueryResult, ApiError> {
        self.check()?;
        self.queries
            .lock()
            .unwrap()
            .push((collection.name.clone(), input));
        let docs = self
            .collections
            .iter()
            .find(|(n, _)| *n == collection.name)
            .map(|(_, docs)| docs.clone())
            .unwrap_or_default();
        let docs: Vec<_> = docs.into_iter().take(n_results).collect();
        let mut metadata = HashMap::new();
        metadata.insert("source", Value::String("notes.md".to_string()));
        Ok(QueryResult {
            documents: docs.iter().map(|(d, _)| d.clone()).collect(),
            metadatas: docs
                .iter()
                .map(|_| {
                    Some(
                        metadata
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.clone()))
                            .collect::<Map<String, Value>>(),
                    )
                })
                .collect(),
            distances: docs.iter().map(|(_, dist)| Some(*dist)).collect(),
        })
    }
}
