use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub mod chroma;

pub use chroma::ChromaClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// A vector-store query is either raw text or a precomputed embedding.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    Text(String),
    Embedding(Vec<f32>),
}

/// Parallel arrays for a single query, ordered nearest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub documents: Vec<String>,
    pub metadatas: Vec<Option<Map<String, Value>>>,
    pub distances: Vec<Option<f32>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &str;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ApiError>;

    async fn get_collection(&self, name: &str) -> Result<CollectionInfo, ApiError>;

    async fn query(
        &self,
        collection: &CollectionInfo,
        input: QueryInput,
        n_results: usize,
    ) -> Result<QueryResult, ApiError>;
}
