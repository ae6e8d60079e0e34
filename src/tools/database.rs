use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::config::VectorStoreSettings;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::vector_store::{QueryInput, VectorStore};

const CODING_KEYWORDS: [&str; 25] = [
    "algorithm",
    "data structure",
    "programming",
    "code",
    "function",
    "class",
    "python",
    "javascript",
    "java",
    "c++",
    "array",
    "tree",
    "graph",
    "sort",
    "search",
    "recursion",
    "iteration",
    "complexity",
    "leetcode",
    "coding",
    "development",
    "software",
    "debugging",
    "optimization",
    "performance",
];

const UNKNOWN_RELEVANCE: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseHit {
    pub content: String,
    pub metadata: Option<Map<String, Value>>,
    pub collection: String,
    pub relevance: f32,
}

/// Outcome of a knowledge-base lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseLookup {
    /// The store holds no collections at all.
    NoCollections,
    /// Collections exist but nothing coding-related matched.
    NoMatches,
    Found(Vec<DatabaseHit>),
}

impl DatabaseLookup {
    pub fn render(&self) -> String {
        match self {
            DatabaseLookup::NoCollections => "No coding knowledge collections found in the database. \
The database may need to be populated with coding data."
                .to_string(),
            DatabaseLookup::NoMatches => "No relevant coding information found in the database for your query. \
Try rephrasing or asking about specific programming concepts."
                .to_string(),
            DatabaseLookup::Found(hits) => {
                let mut out = String::from("**Relevant Coding Information from Database:**\n\n");
                for (i, hit) in hits.iter().enumerate() {
                    let source = hit
                        .metadata
                        .as_ref()
                        .map(|m| Value::Object(m.clone()).to_string())
                        .unwrap_or_else(|| "{}".to_string());
                    out.push_str(&format!(
                        "**Result {}:**\nContent: {}\nSource: {}\nCollection: {}\nRelevance: {:.2}\n\n",
                        i + 1,
                        hit.content,
                        source,
                        hit.collection,
                        hit.relevance
                    ));
                }
                out.trim_end().to_string()
            }
        }
    }

    /// Text usable as retrieval context. An empty store contributes nothing.
    pub fn as_context(&self) -> Option<String> {
        match self {
            DatabaseLookup::NoCollections => None,
            other => Some(other.render()),
        }
    }
}

/// Searches every collection of the vector store for coding material.
#[derive(Clone)]
pub struct DatabaseTool {
    store: Arc<dyn VectorStore>,
    embedder: Option<Arc<dyn LlmProvider>>,
    settings: VectorStoreSettings,
}

impl DatabaseTool {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Option<Arc<dyn LlmProvider>>,
        settings: VectorStoreSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    pub async fn search(&self, query: &str) -> Result<DatabaseLookup, ApiError> {
        let collections = self.store.list_collections().await?;
        if collections.is_empty() {
            tracing::info!("Vector store has no collections");
            return Ok(DatabaseLookup::NoCollections);
        }

        let input = self.query_input(query).await;
        let mut hits = Vec::new();
        let mut last_error = None;
        let mut answered = 0usize;

        for collection in &collections {
            let result = match self
                .store
                .query(collection, input.clone(), self.settings.results_per_collection)
                .await
            {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!("Query on collection {} failed: {}", collection.name, err);
                    last_error = Some(err);
                    continue;
                }
            };
            answered += 1;

            for (i, document) in result.documents.iter().enumerate() {
                if !is_coding_related(document) {
                    continue;
                }
                let relevance = result
                    .distances
                    .get(i)
                    .copied()
                    .flatten()
                    .map(|d| 1.0 - d)
                    .unwrap_or(UNKNOWN_RELEVANCE);
                hits.push(DatabaseHit {
                    content: truncate_document(document, self.settings.max_document_chars),
                    metadata: result.metadatas.get(i).cloned().flatten(),
                    collection: collection.name.clone(),
                    relevance,
                });
            }
        }

        if answered == 0 {
            if let Some(err) = last_error {
                return Err(err);
            }
        }
        if hits.is_empty() {
            return Ok(DatabaseLookup::NoMatches);
        }

        hits.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        });
        hits.truncate(self.settings.top_k);
        tracing::debug!("Database search produced {} hits", hits.len());
        Ok(DatabaseLookup::Found(hits))
    }

    async fn query_input(&self, query: &str) -> QueryInput {
        if !self.settings.embed_queries {
            return QueryInput::Text(query.to_string());
        }
        let Some(embedder) = &self.embedder else {
            return QueryInput::Text(query.to_string());
        };
        match embedder.embed(&[query.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => QueryInput::Embedding(vectors.remove(0)),
            Ok(_) => QueryInput::Text(query.to_string()),
            Err(err) => {
                tracing::warn!("Query embedding failed, using text query: {}", err);
                QueryInput::Text(query.to_string())
            }
        }
    }
}

fn is_coding_related(document: &str) -> bool {
    let lower = document.to_lowercase();
    CODING_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn truncate_document(document: &str, max_chars: usize) -> String {
    if document.chars().count() <= max_chars {
        return document.to_string();
    }
    let head: String = document.chars().take(max_chars).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, ScriptedLlm};

    fn tool(store: MemoryStore, settings: VectorStoreSettings) -> DatabaseTool {
        DatabaseTool::new(Arc::new(store), None, settings)
    }

    #[tokio::test]
    async fn empty_store_reports_no_collections() {
        let lookup = tool(MemoryStore::default(), VectorStoreSettings::default())
            .search("heap")
            .await
            .unwrap();
        assert_eq!(lookup, DatabaseLookup::NoCollections);
        assert!(lookup.as_context().is_none());
        assert!(lookup.render().starts_with("No coding knowledge collections"));
    }

    #[tokio::test]
    async fn non_coding_documents_are_filtered_out() {
        let store = MemoryStore::default().with_collection("notes", vec![("grocery list: milk", 0.1)]);
        let lookup = tool(store, VectorStoreSettings::default())
            .search("milk")
            .await
            .unwrap();
        assert_eq!(lookup, DatabaseLookup::NoMatches);
        assert!(lookup.as_context().unwrap().starts_with("No relevant coding information"));
    }

    #[tokio::test]
    async fn hits_are_ranked_truncated_and_capped() {
        let long = format!("python code {}", "x".repeat(900));
        let store = MemoryStore::default()
            .with_collection("dsa", vec![("binary search algorithm", 0.4), (long.as_str(), 0.1)])
            .with_collection("web", vec![("sorting in java", 0.2), ("graph bfs code", 0.9)]);
        let lookup = tool(store, VectorStoreSettings::default())
            .search("search")
            .await
            .unwrap();

        let DatabaseLookup::Found(hits) = &lookup else {
            panic!("expected hits, got {:?}", lookup);
        };
        assert_eq!(hits.len(), 3);
        assert!(hits[0].content.starts_with("python code"));
        assert_eq!(hits[0].content.chars().count(), 803);
        assert!((hits[0].relevance - 0.9).abs() < 1e-6);
        assert_eq!(hits[1].collection, "web");
        assert_eq!(hits[2].content, "binary search algorithm");

        let text = lookup.render();
        assert!(text.starts_with("**Relevant Coding Information from Database:**"));
        assert!(text.contains("**Result 3:**"));
        assert!(text.contains("Relevance: 0.60"));
        assert!(text.contains("Source: {\"source\":\"notes.md\"}"));
    }

    #[tokio::test]
    async fn store_failure_is_an_error() {
        let err = tool(MemoryStore::failing("connection refused"), VectorStoreSettings::default())
            .search("heap")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn embeddings_are_used_when_enabled() {
        let store = Arc::new(MemoryStore::default().with_collection("dsa", vec![("heap code", 0.2)]));
        let settings = VectorStoreSettings {
            embed_queries: true,
            ..VectorStoreSettings::default()
        };
        let llm: Arc<dyn crate::llm::LlmProvider> = Arc::new(ScriptedLlm::new(vec![]));
        let tool = DatabaseTool::new(store.clone(), Some(llm), settings);

        tool.search("heap").await.unwrap();

        let queries = store.queries();
        assert_eq!(queries[0].1, QueryInput::Embedding(vec![4.0]));
    }
}
