use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api_client::ApiClient;
use crate::core::errors::ApiError;

pub mod database;

pub use database::{DatabaseHit, DatabaseLookup, DatabaseTool};

/// The closed set of capabilities the agent may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    DatabaseSearch,
    WebSearch,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::DatabaseSearch, Tool::WebSearch];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::DatabaseSearch => "DatabaseSearch",
            Tool::WebSearch => "WebSearch",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::DatabaseSearch => {
                "Search the local knowledge database for coding tutorials, algorithms, data \
structures, programming concepts, and previously stored coding solutions. Use this for: DSA \
problems, coding theory, algorithm explanations, data structure implementations, programming \
best practices."
            }
            Tool::WebSearch => {
                "Search the web for the latest coding information, programming tutorials, \
documentation, Stack Overflow solutions, GitHub repositories, and current programming trends. \
Use this for: latest framework updates, real-time coding solutions, community discussions, \
official documentation, new programming concepts."
            }
        }
    }

    /// One line per tool, for prompt rendering.
    pub fn catalog() -> String {
        Tool::ALL
            .iter()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn names() -> String {
        Tool::ALL
            .iter()
            .map(|tool| tool.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = ApiError;

    /// Accepts the canonical names plus snake_case and spaced variants.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "databasesearch" | "database" | "dbsearch" => Ok(Tool::DatabaseSearch),
            "websearch" | "web" | "internetsearch" => Ok(Tool::WebSearch),
            _ => Err(ApiError::BadRequest(format!(
                "Unknown tool `{}`. Available tools: {}",
                s.trim(),
                Tool::names()
            ))),
        }
    }
}

/// Executes [`Tool`] variants against their backing clients.
#[derive(Clone)]
pub struct ToolBox {
    database: DatabaseTool,
    api: ApiClient,
    use_llm_fallback: bool,
}

impl ToolBox {
    pub fn new(database: DatabaseTool, api: ApiClient, use_llm_fallback: bool) -> Self {
        Self {
            database,
            api,
            use_llm_fallback,
        }
    }

    pub fn database(&self) -> &DatabaseTool {
        &self.database
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn use_llm_fallback(&self) -> bool {
        self.use_llm_fallback
    }

    pub async fn execute(&self, tool: Tool, query: &str) -> Result<String, ApiError> {
        tracing::info!(tool = %tool, "Executing tool");
        match tool {
            Tool::DatabaseSearch => Ok(self.database.search(query).await?.render()),
            Tool::WebSearch => self
                .api
                .web_context(query, self.use_llm_fallback)
                .await
                .map(|context| context.text)
                .ok_or_else(|| {
                    ApiError::Upstream(
                        "web search returned nothing and the LLM fallback was unavailable"
                            .to_string(),
                    )
                }),
        }
    }
}
