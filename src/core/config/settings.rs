use std::env;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;

/// Typed view over the merged `config.yml` + `secrets.yaml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub input: InputSettings,
    pub retrieval: RetrievalSettings,
    pub agent: AgentSettings,
    pub output: OutputSettings,
    pub monitoring: MonitoringSettings,
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub vector_store: VectorStoreSettings,
    pub server: ServerSettings,
}

impl AppConfig {
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        let mut config: AppConfig = serde_json::from_value(value.clone())
            .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// API keys from the environment win over the secrets file.
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_env("GEMINI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = non_empty_env("TAVILY_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(url) = non_empty_env("CHROMA_URL") {
            self.vector_store.url = url;
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub default_session_id: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "Ragbot".to_string(),
            default_session_id: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub max_input_length: usize,
    pub min_input_length: usize,
    pub enhance_context: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            max_input_length: 2000,
            min_input_length: 3,
            enhance_context: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub max_context_length: usize,
    pub use_database: bool,
    pub use_web: bool,
    pub use_llm_fallback: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_context_length: 4000,
            use_database: true,
            use_web: true,
            use_llm_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub temperature: f64,
    pub max_tokens: u32,
    pub history_capacity: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            temperature: 0.1,
            max_tokens: 2048,
            history_capacity: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub max_display_length: usize,
    pub include_metadata: bool,
    pub format_code: bool,
    pub default_channel: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            max_display_length: 2000,
            include_metadata: true,
            format_code: true,
            default_channel: "none".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub history_capacity: usize,
    pub save_to_file: bool,
    pub min_success_rate: f64,
    pub warn_success_rate: f64,
    pub max_avg_response_time: f64,
    pub warn_avg_response_time: f64,
    pub max_consecutive_failures: u64,
    pub max_api_errors: u64,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            save_to_file: true,
            min_success_rate: 0.70,
            warn_success_rate: 0.85,
            max_avg_response_time: 15.0,
            warn_avg_response_time: 10.0,
            max_consecutive_failures: 5,
            max_api_errors: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub fallback_temperature: f64,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            api_key: None,
            temperature: 0.1,
            max_output_tokens: 2048,
            fallback_temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_results: usize,
    pub timeout_secs: u64,
    pub search_depth: String,
    pub include_answer: bool,
    pub include_domains: Vec<String>,
    pub display_results: usize,
    pub snippet_chars: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            api_key: None,
            max_results: 5,
            timeout_secs: 15,
            search_depth: "advanced".to_string(),
            include_answer: true,
            include_domains: [
                "stackoverflow.com",
                "github.com",
                "geeksforgeeks.org",
                "leetcode.com",
                "tutorialspoint.com",
                "w3schools.com",
                "developer.mozilla.org",
                "docs.python.org",
                "python.org",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
            display_results: 4,
            snippet_chars: 400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub url: String,
    pub results_per_collection: usize,
    pub top_k: usize,
    pub max_document_chars: usize,
    pub embed_queries: bool,
    pub timeout_secs: u64,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            results_per_collection: 3,
            top_k: 3,
            max_document_chars: 800,
            embed_queries: false,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub cors_allowed_origins: Vec<String>,
}
