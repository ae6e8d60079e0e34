use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::config::RetrievalSettings;
use crate::tools::ToolBox;

const DATABASE_HEADER: &str = "**📚 Database Knowledge:**";
const TRUNCATION_NOTICE: &str = "\n\n[Context truncated due to length limits]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Database,
    Web,
    AiFallback,
}

impl ContextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextSource::Database => "database",
            ContextSource::Web => "web",
            ContextSource::AiFallback => "ai_fallback",
        }
    }
}

impl fmt::Display for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieved context for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextBundle {
    pub database: Option<String>,
    pub web: Option<String>,
    pub combined: String,
    pub success: bool,
    pub sources_used: Vec<ContextSource>,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

/// Joins the present parts with a blank line and cuts at `budget` characters.
pub fn combine_contexts(database: Option<&str>, web: Option<&str>, budget: usize) -> String {
    let combined = [database, web]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n\n");

    if combined.chars().count() <= budget {
        return combined;
    }
    let head: String = combined.chars().take(budget).collect();
    format!("{}{}", head, TRUNCATION_NOTICE)
}

pub struct ContextRetriever {
    tools: Arc<ToolBox>,
    settings: RetrievalSettings,
}

impl ContextRetriever {
    pub fn new(tools: Arc<ToolBox>, settings: RetrievalSettings) -> Self {
        Self { tools, settings }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    pub async fn retrieve(&self, query: &str, session_id: &str) -> ContextBundle {
        let started = Instant::now();
        let mut sources_used = Vec::new();

        let database = if self.settings.use_database {
            self.database_context(query).await
        } else {
            None
        };
        if database.is_some() {
            sources_used.push(ContextSource::Database);
        }

        let web = if self.settings.use_web {
            self.tools
                .api()
                .web_context(query, self.settings.use_llm_fallback)
                .await
        } else {
            None
        };
        let web = web.map(|context| {
            sources_used.push(context.source);
            context.text
        });

        let combined = combine_contexts(
            database.as_deref(),
            web.as_deref(),
            self.settings.max_context_length,
        );
        let success = !combined.is_empty();
        let elapsed = started.elapsed();

        tracing::info!(
            session_id,
            success,
            sources = ?sources_used,
            chars = combined.chars().count(),
            "Context retrieved in {:.2}s",
            elapsed.as_secs_f64()
        );

        ContextBundle {
            database,
            web,
            combined,
            success,
            sources_used,
            elapsed,
        }
    }

    async fn database_context(&self, query: &str) -> Option<String> {
        match self.tools.database().search(query).await {
            Ok(lookup) => lookup
                .as_context()
                .map(|text| format!("{}\n{}", DATABASE_HEADER, text)),
            Err(err) => {
                tracing::warn!("Database search unavailable: {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::ApiClient;
    use crate::core::config::{LlmSettings, SearchSettings, VectorStoreSettings};
    use crate::llm::LlmProvider;
    use crate::search::TavilyClient;
    use crate::testing::{MemoryStore, ScriptedLlm};
    use crate::tools::DatabaseTool;
    use crate::vector_store::VectorStore;

    fn retriever(
        store: MemoryStore,
        llm: ScriptedLlm,
        settings: RetrievalSettings,
    ) -> ContextRetriever {
        let llm: Arc<dyn LlmProvider> = Arc::new(llm);
        let store: Arc<dyn VectorStore> = Arc::new(store);
        let search_settings = SearchSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
            ..SearchSettings::default()
        };
        let api = ApiClient::new(
            llm.clone(),
            TavilyClient::new(&search_settings).unwrap(),
            LlmSettings::default(),
            search_settings,
        );
        let database = DatabaseTool::new(store, Some(llm), VectorStoreSettings::default());
        let fallback = settings.use_llm_fallback;
        ContextRetriever::new(Arc::new(ToolBox::new(database, api, fallback)), settings)
    }

    #[test]
    fn combine_joins_present_parts() {
        assert_eq!(combine_contexts(Some("A"), Some("B"), 4000), "A\n\nB");
        assert_eq!(combine_contexts(None, Some("B"), 4000), "B");
        assert_eq!(combine_contexts(Some("A"), None, 4000), "A");
        assert_eq!(combine_contexts(None, None, 4000), "");
    }

    #[test]
    fn combine_truncates_at_budget() {
        let a = "a".repeat(3000);
        let b = "b".repeat(3000);
        let combined = combine_contexts(Some(&a), Some(&b), 4000);

        assert_eq!(
            combined.chars().count(),
            4000 + TRUNCATION_NOTICE.chars().count()
        );
        assert!(combined.ends_with(TRUNCATION_NOTICE));
        assert!(combined.starts_with(&a));

        let exact = combine_contexts(Some(&"x".repeat(4000)), None, 4000);
        assert_eq!(exact.len(), 4000);
    }

    #[tokio::test]
    async fn database_and_fallback_are_combined() {
        let store = MemoryStore::default().with_collection("dsa", vec![("binary search code", 0.2)]);
        let llm = ScriptedLlm::new(vec!["Halve the interval each step."]);
        let bundle = retriever(store, llm, RetrievalSettings::default())
            .retrieve("binary search", "s1")
            .await;

        assert!(bundle.success);
        assert_eq!(
            bundle.sources_used,
            vec![ContextSource::Database, ContextSource::AiFallback]
        );
        let database = bundle.database.as_deref().unwrap();
        assert!(database.starts_with("**📚 Database Knowledge:**\n**Relevant Coding Information"));
        assert_eq!(
            bundle.combined,
            format!("{}\n\n{}", database, bundle.web.as_deref().unwrap())
        );
    }

    #[tokio::test]
    async fn empty_store_and_failed_fallback_yield_no_context() {
        let bundle = retriever(
            MemoryStore::default(),
            ScriptedLlm::failing("quota exceeded"),
            RetrievalSettings::default(),
        )
        .retrieve("binary search", "s1")
        .await;

        assert!(!bundle.success);
        assert!(bundle.combined.is_empty());
        assert!(bundle.database.is_none());
        assert!(bundle.web.is_none());
        assert!(bundle.sources_used.is_empty());
    }

    #[tokio::test]
    async fn store_errors_degrade_to_absence() {
        let settings = RetrievalSettings {
            use_llm_fallback: false,
            ..RetrievalSettings::default()
        };
        let bundle = retriever(
            MemoryStore::failing("connection refused"),
            ScriptedLlm::new(vec![]),
            settings,
        )
        .retrieve("heap", "s1")
        .await;

        assert!(!bundle.success);
        assert!(bundle.database.is_none());
    }
}
