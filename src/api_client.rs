use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::core::config::{LlmSettings, SearchSettings};
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::retrieval::ContextSource;
use crate::search::{enhance_coding_query, format_search_response, TavilyClient};

const FALLBACK_HEADER: &str = "**🤖 AI Knowledge Base:**";

/// Web context produced by either the search API or the LLM fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct WebContext {
    pub text: String,
    pub source: ContextSource,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ApiKeyStatus {
    pub gemini: bool,
    pub tavily: bool,
}

impl ApiKeyStatus {
    pub fn all_valid(&self) -> bool {
        self.gemini && self.tavily
    }
}

/// Composes the LLM provider and the web search client.
#[derive(Clone)]
pub struct ApiClient {
    llm: Arc<dyn LlmProvider>,
    tavily: TavilyClient,
    llm_settings: LlmSettings,
    search_settings: SearchSettings,
}

impl ApiClient {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tavily: TavilyClient,
        llm_settings: LlmSettings,
        search_settings: SearchSettings,
    ) -> Self {
        Self {
            llm,
            tavily,
            llm_settings,
            search_settings,
        }
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    pub async fn get_llm_response(&self, prompt: &str) -> Result<String, ApiError> {
        self.llm
            .generate(
                prompt,
                self.llm_settings.temperature,
                self.llm_settings.max_output_tokens,
            )
            .await
    }

    /// Searches the web; `Ok(None)` means the search returned nothing usable.
    pub async fn search_web(&self, query: &str) -> Result<Option<String>, ApiError> {
        let enhanced = enhance_coding_query(query);
        tracing::debug!("Web search query: {}", enhanced);

        let response = self
            .tavily
            .search(
                &enhanced,
                self.search_settings.max_results,
                &self.search_settings.include_domains,
            )
            .await?;

        if response.is_empty() {
            return Ok(None);
        }
        let formatted = format_search_response(
            &response,
            self.search_settings.display_results,
            self.search_settings.snippet_chars,
        );
        Ok(Some(formatted).filter(|text| !text.is_empty()))
    }

    /// Asks the LLM to stand in for a search engine.
    pub async fn search_llm_fallback(&self, query: &str) -> Result<String, ApiError> {
        let prompt = fallback_prompt(query);
        let answer = self
            .llm
            .generate(
                &prompt,
                self.llm_settings.fallback_temperature,
                self.llm_settings.max_output_tokens,
            )
            .await?;
        Ok(format!("{}\n\n{}", FALLBACK_HEADER, answer.trim()))
    }

    /// Web search first, LLM fallback second. Failures degrade to `None`.
    pub async fn web_context(&self, query: &str, allow_fallback: bool) -> Option<WebContext> {
        match self.search_web(query).await {
            Ok(Some(text)) => {
                return Some(WebContext {
                    text,
                    source: ContextSource::Web,
                })
            }
            Ok(None) => tracing::info!("Web search returned no results"),
            Err(err) => tracing::warn!("Web search unavailable: {}", err),
        }

        if !allow_fallback {
            return None;
        }

        match self.search_llm_fallback(query).await {
            Ok(text) => Some(WebContext {
                text,
                source: ContextSource::AiFallback,
            }),
            Err(err) => {
                tracing::warn!("LLM search fallback failed: {}", err);
                None
            }
        }
    }

    pub fn validate_api_keys(&self) -> ApiKeyStatus {
        let status = ApiKeyStatus {
            gemini: self
                .llm_settings
                .api_key
                .as_deref()
                .map(|k| !k.trim().is_empty())
                .unwrap_or(false),
            tavily: self.tavily.is_configured(),
        };
        if !status.gemini {
            tracing::warn!("Gemini API key is missing");
        }
        if !status.tavily {
            tracing::warn!("Tavily API key is missing");
        }
        status
    }

    pub fn status(&self) -> Value {
        let keys = self.validate_api_keys();
        json!({
            "llm": {
                "provider": self.llm.name(),
                "model": self.llm.model(),
                "configured": keys.gemini,
                "temperature": self.llm_settings.temperature,
                "max_output_tokens": self.llm_settings.max_output_tokens,
            },
            "web_search": {
                "provider": "tavily",
                "configured": keys.tavily,
                "max_results": self.search_settings.max_results,
                "timeout_secs": self.search_settings.timeout_secs,
                "include_domains": self.search_settings.include_domains,
            },
            "all_keys_valid": keys.all_valid(),
        })
    }
}

fn fallback_prompt(query: &str) -> String {
    format!(
        "Act as a search engine for programming knowledge. As a coding expert, provide a \
comprehensive answer for the following programming query: {}\n\n\
Please include:\n\
1. Clear explanation of the concept/problem\n\
2. Code examples if applicable (use proper syntax highlighting)\n\
3. Best practices and common pitfalls\n\
4. Time/space complexity if relevant\n\
5. Alternative approaches if applicable\n\n\
Make your response practical and educational for a coding assistant.",
        query
    )
}
