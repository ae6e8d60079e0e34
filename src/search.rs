use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::config::SearchSettings;
use crate::core::errors::ApiError;

const PROGRAMMING_TERMS: [&str; 7] = [
    "algorithm",
    "code",
    "programming",
    "python",
    "javascript",
    "java",
    "c++",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.answer
            .as_deref()
            .map(|a| a.trim().is_empty())
            .unwrap_or(true)
            && self.results.is_empty()
    }
}

/// Tavily search API client.
#[derive(Clone)]
pub struct TavilyClient {
    base_url: String,
    api_key: Option<String>,
    search_depth: String,
    include_answer: bool,
    client: Client,
}

impl TavilyClient {
    pub fn new(settings: &SearchSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            search_depth: settings.search_depth.clone(),
            include_answer: settings.include_answer,
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        domain_allowlist: &[String],
    ) -> Result<SearchResponse, ApiError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ApiError::ServiceUnavailable("TAVILY_API_KEY is not configured".to_string())
        })?;

        let body = json!({
            "api_key": api_key,
            "query": query,
            "max_results": max_results,
            "search_depth": self.search_depth,
            "include_answer": self.include_answer,
            "include_raw_content": false,
            "include_domains": domain_allowlist,
        });

        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest("tavily", e))?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "Tavily search failed: {}",
                response.status()
            )));
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| ApiError::from_reqwest("tavily", e))
    }
}

/// Appends coding-oriented terms when the query has no programming vocabulary.
pub fn enhance_coding_query(query: &str) -> String {
    let lower = query.to_lowercase();
    if PROGRAMMING_TERMS.iter().any(|term| lower.contains(term)) {
        return query.to_string();
    }

    let suffix = if lower.contains("dsa") || lower.contains("data structure") {
        " programming algorithm implementation"
    } else if ["compare", "vs", "difference"].iter().any(|t| lower.contains(t)) {
        " programming language comparison"
    } else {
        " programming tutorial example"
    };
    format!("{}{}", query, suffix)
}

/// Renders the direct answer and the leading results as markdown.
pub fn format_search_response(
    response: &SearchResponse,
    display_results: usize,
    snippet_chars: usize,
) -> String {
    let mut out = String::new();

    if let Some(answer) = response.answer.as_deref().filter(|a| !a.trim().is_empty()) {
        out.push_str(&format!("**🎯 Direct Answer:**\n{}\n\n", answer.trim()));
    }

    if !response.results.is_empty() {
        out.push_str("**🔍 Search Results:**\n");
        for (i, result) in response.results.iter().take(display_results).enumerate() {
            let snippet = if result.content.chars().count() > snippet_chars {
                let head: String = result.content.chars().take(snippet_chars).collect();
                format!("{}...", head)
            } else {
                result.content.clone()
            };
            out.push_str(&format!(
                "\n**{}. {}**\n🔗 URL: {}\n📄 Content: {}\n",
                i + 1,
                result.title,
                result.url,
                snippet
            ));
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhance_leaves_programming_queries_alone() {
        assert_eq!(
            enhance_coding_query("python list comprehension"),
            "python list comprehension"
        );
    }

    #[test]
    fn enhance_picks_suffix_by_topic() {
        assert_eq!(
            enhance_coding_query("dsa two sum"),
            "dsa two sum programming algorithm implementation"
        );
        assert_eq!(
            enhance_coding_query("Data Structure for LRU"),
            "Data Structure for LRU programming algorithm implementation"
        );
        assert_eq!(
            enhance_coding_query("rust vs go"),
            "rust vs go programming language comparison"
        );
        assert_eq!(
            enhance_coding_query("binary tree traversal"),
            "binary tree traversal programming tutorial example"
        );
    }

    #[test]
    fn leetcode_counts_as_programming_vocabulary() {
        assert_eq!(enhance_coding_query("leetcode two sum"), "leetcode two sum");
    }

    #[test]
    fn format_includes_answer_and_caps_results() {
        let response = SearchResponse {
            answer: Some("Use a heap.".to_string()),
            results: (1..=6)
                .map(|i| SearchResult {
                    title: format!("Result {}", i),
                    url: format!("https://example.com/{}", i),
                    content: "x".repeat(500),
                })
                .collect(),
        };

        let text = format_search_response(&response, 4, 400);

        assert!(text.starts_with("**🎯 Direct Answer:**\nUse a heap."));
        assert!(text.contains("**4. Result 4**"));
        assert!(!text.contains("Result 5"));
        assert!(text.contains(&format!("📄 Content: {}...", "x".repeat(400))));
    }

    #[test]
    fn empty_response_is_detected() {
        assert!(SearchResponse::default().is_empty());
        let with_blank_answer = SearchResponse {
            answer: Some("  ".to_string()),
            results: Vec::new(),
        };
        assert!(with_blank_answer.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_any_request() {
        let client = TavilyClient::new(&SearchSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
            ..SearchSettings::default()
        })
        .unwrap();

        let err = client.search("heap", 5, &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }
}
