use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{CollectionInfo, QueryInput, QueryResult, VectorStore};
use crate::core::config::VectorStoreSettings;
use crate::core::errors::ApiError;

/// ChromaDB over its v1 REST API.
#[derive(Clone)]
pub struct ChromaClient {
    base_url: String,
    client: Client,
}

impl ChromaClient {
    pub fn new(settings: &VectorStoreSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    async fn check(res: Response, what: &str) -> Result<Response, ApiError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let text = res.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("chroma {}: {}", what, text)));
        }
        Err(ApiError::Upstream(format!(
            "chroma {} failed ({}): {}",
            what, status, text
        )))
    }
}

#[derive(Deserialize)]
struct RawQueryResponse {
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

impl RawQueryResponse {
    /// Flattens the first (and only) query row, dropping empty documents.
    fn into_result(self) -> QueryResult {
        let documents = first_row(self.documents);
        let metadatas = first_row(self.metadatas);
        let distances = first_row(self.distances);

        let mut result = QueryResult::default();
        for (i, doc) in documents.into_iter().enumerate() {
            let Some(doc) = doc.filter(|d| !d.trim().is_empty()) else {
                continue;
            };
            result.documents.push(doc);
            result
                .metadatas
                .push(metadatas.get(i).cloned().flatten());
            result.distances.push(distances.get(i).copied().flatten());
        }
        result
    }
}

fn first_row<T>(rows: Option<Vec<Vec<T>>>) -> Vec<T> {
    rows.and_then(|r| r.into_iter().next()).unwrap_or_default()
}

#[async_trait]
impl VectorStore for ChromaClient {
    fn name(&self) -> &str {
        "chroma"
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ApiError> {
        let res = self
            .client
            .get(self.url("collections"))
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest("chroma", e))?;
        let res = Self::check(res, "list_collections").await?;
        res.json::<Vec<CollectionInfo>>()
            .await
            .map_err(|e| ApiError::from_reqwest("chroma", e))
    }

    async fn get_collection(&self, name: &str) -> Result<CollectionInfo, ApiError> {
        let path = format!("collections/{}", urlencoding::encode(name));
        let res = self
            .client
            .get(self.url(&path))
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest("chroma", e))?;
        let res = Self::check(res, "get_collection").await?;
        res.json::<CollectionInfo>()
            .await
            .map_err(|e| ApiError::from_reqwest("chroma", e))
    }

    async fn query(
        &self,
        collection: &CollectionInfo,
        input: QueryInput,
        n_results: usize,
    ) -> Result<QueryResult, ApiError> {
        let mut body = json!({
            "n_results": n_results,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(obj) = body.as_object_mut() {
            match input {
                QueryInput::Text(text) => {
                    obj.insert("query_texts".to_string(), json!([text]));
                }
                QueryInput::Embedding(vector) => {
                    obj.insert("query_embeddings".to_string(), json!([vector]));
                }
            }
        }

        let path = format!("collections/{}/query", collection.id);
        let res = self
            .client
            .post(self.url(&path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest("chroma", e))?;
        let res = Self::check(res, "query").await?;
        let raw: RawQueryResponse = res
            .json()
            .await
            .map_err(|e| ApiError::from_reqwest("chroma", e))?;
        Ok(raw.into_result())
    }
}
