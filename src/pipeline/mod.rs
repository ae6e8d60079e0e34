use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::agent::{AgentManager, AgentRequest};
use crate::api_client::ApiClient;
use crate::core::config::{AppConfig, AppPaths};
use crate::core::errors::ApiError;
use crate::input::{InputHandler, QueryType};
use crate::llm::{GeminiProvider, LlmProvider};
use crate::monitoring::Monitor;
use crate::output::{EmitResult, OutputChannel, OutputHandler};
use crate::prompts::{PromptCategory, PromptEngineer};
use crate::retrieval::{ContextRetriever, ContextSource};
use crate::search::TavilyClient;
use crate::tools::{DatabaseTool, Tool, ToolBox};
use crate::vector_store::{ChromaClient, VectorStore};

const INVALID_INPUT_RESPONSE: &str =
    "Invalid input provided. Please check your query and try again.";

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub query_type: Option<QueryType>,
    pub prompt_category: Option<PromptCategory>,
    pub confidence: Option<f64>,
    pub code_blocks_detected: usize,
    pub sources_used: Vec<ContextSource>,
    pub context_retrieval_time: Option<f64>,
    pub agent_time: Option<f64>,
    pub total_processing_time: f64,
    pub iterations: usize,
    pub stopped_early: bool,
    pub tools_used: Vec<Tool>,
    pub validation_errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for ResponseMetadata {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            query_type: None,
            prompt_category: None,
            confidence: None,
            code_blocks_detected: 0,
            sources_used: Vec::new(),
            context_retrieval_time: None,
            agent_time: None,
            total_processing_time: 0.0,
            iterations: 0,
            stopped_early: false,
            tools_used: Vec::new(),
            validation_errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Outcome of one request, successful or not.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub query: String,
    pub response: String,
    pub success: bool,
    pub source: String,
    pub session_id: String,
    pub error: Option<String>,
    pub metadata: ResponseMetadata,
}

/// What `process` hands back: the answer and how its delivery went.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    pub record: ResponseRecord,
    pub output: EmitResult,
}

/// Input handling, retrieval, prompting, the agent loop, monitoring and
/// output, wired together.
pub struct RagPipeline {
    config: AppConfig,
    input: InputHandler,
    tools: Arc<ToolBox>,
    retriever: ContextRetriever,
    prompts: Arc<PromptEngineer>,
    agent: AgentManager,
    output: OutputHandler,
    monitor: Monitor,
    started_at: DateTime<Utc>,
}

impl RagPipeline {
    /// Builds the production services (Gemini, Tavily, Chroma) from config.
    pub fn from_config(config: AppConfig, paths: &AppPaths) -> Result<Self, ApiError> {
        let llm: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(&config.llm)?);
        let store: Arc<dyn VectorStore> = Arc::new(ChromaClient::new(&config.vector_store)?);
        let tavily = TavilyClient::new(&config.search)?;
        Self::with_services(config, paths, llm, store, tavily)
    }

    pub fn with_services(
        config: AppConfig,
        paths: &AppPaths,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        tavily: TavilyClient,
    ) -> Result<Self, ApiError> {
        let api = ApiClient::new(
            llm.clone(),
            tavily,
            config.llm.clone(),
            config.search.clone(),
        );
        let database = DatabaseTool::new(store, Some(llm.clone()), config.vector_store.clone());
        let tools = Arc::new(ToolBox::new(
            database,
            api,
            config.retrieval.use_llm_fallback,
        ));
        let prompts = Arc::new(PromptEngineer::new());

        let pipeline = Self {
            input: InputHandler::new(config.input.clone())?,
            retriever: ContextRetriever::new(tools.clone(), config.retrieval.clone()),
            agent: AgentManager::new(llm, tools.clone(), prompts.clone(), config.agent.clone()),
            output: OutputHandler::new(config.output.clone(), paths.output_dir.clone())?,
            monitor: Monitor::new(config.monitoring.clone(), paths.metrics_dir.clone()),
            tools,
            prompts,
            config,
            started_at: Utc::now(),
        };

        let keys = pipeline.tools.api().validate_api_keys();
        tracing::info!(
            gemini = keys.gemini,
            tavily = keys.tavily,
            store = pipeline.tools.database().store_name(),
            "RAG pipeline initialized"
        );
        Ok(pipeline)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn input(&self) -> &InputHandler {
        &self.input
    }

    pub fn prompts(&self) -> &PromptEngineer {
        &self.prompts
    }

    pub fn agent(&self) -> &AgentManager {
        &self.agent
    }

    pub fn output(&self) -> &OutputHandler {
        &self.output
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Full path for a raw user submission. Every outcome, including
    /// rejected input, is recorded and emitted on `channel`. A failed
    /// delivery shows up in `output`, not in the record.
    pub async fn process(
        &self,
        raw_input: &str,
        session_id: &str,
        channel: OutputChannel,
    ) -> PipelineResponse {
        let started = Instant::now();
        let mut metadata = ResponseMetadata::default();

        let record = match self.input.process(raw_input, session_id) {
            Ok(processed) => {
                metadata.query_type = Some(processed.query_type);
                metadata.code_blocks_detected = processed.code_spans.len();
                metadata.warnings = processed.validation.warnings.clone();
                self.answer(&processed.query, session_id, metadata, started)
                    .await
            }
            Err(err) => {
                metadata.validation_errors = err.errors().to_vec();
                metadata.total_processing_time = started.elapsed().as_secs_f64();
                ResponseRecord {
                    query: raw_input.to_string(),
                    response: INVALID_INPUT_RESPONSE.to_string(),
                    success: false,
                    source: "input_validation".to_string(),
                    session_id: session_id.to_string(),
                    error: Some(err.to_string()),
                    metadata,
                }
            }
        };

        self.finish(&record);
        let output = self.output.emit(&record, channel);
        PipelineResponse { record, output }
    }

    /// Answers an already-clean query, skipping input handling and output.
    pub async fn process_query(&self, query: &str, session_id: &str) -> ResponseRecord {
        let started = Instant::now();
        let record = self
            .answer(query, session_id, ResponseMetadata::default(), started)
            .await;
        self.finish(&record);
        record
    }

    async fn answer(
        &self,
        query: &str,
        session_id: &str,
        mut metadata: ResponseMetadata,
        started: Instant,
    ) -> ResponseRecord {
        tracing::info!(
            session_id,
            request_id = %metadata.request_id,
            "Processing query: {}",
            preview(query, 50)
        );

        let context = self.retriever.retrieve(query, session_id).await;
        metadata.sources_used = context.sources_used.clone();
        metadata.context_retrieval_time = Some(context.elapsed.as_secs_f64());

        let prompt = self.prompts.generate(query, &context.combined);
        metadata.prompt_category = Some(prompt.category);
        metadata.confidence = Some(prompt.confidence);

        let agent_started = Instant::now();
        let result = self
            .agent
            .answer(
                AgentRequest::new(query).with_system_prompt(prompt.system),
                session_id,
            )
            .await;
        metadata.agent_time = Some(agent_started.elapsed().as_secs_f64());
        metadata.iterations = result.iterations;
        metadata.stopped_early = result.stopped_early;
        metadata.tools_used = result.tools_used;
        metadata.total_processing_time = started.elapsed().as_secs_f64();

        let source = if result.success {
            "rag_pipeline"
        } else {
            "rag_pipeline_agent_error"
        };
        ResponseRecord {
            query: query.to_string(),
            response: result.response,
            success: result.success,
            source: source.to_string(),
            session_id: session_id.to_string(),
            error: result.error,
            metadata,
        }
    }

    fn finish(&self, record: &ResponseRecord) {
        if let Err(err) = self.monitor.record(record) {
            tracing::error!("Failed to update monitoring: {}", err);
        }
        if record.success {
            tracing::info!(
                session_id = %record.session_id,
                "Query answered in {:.2}s",
                record.metadata.total_processing_time
            );
        } else {
            tracing::warn!(
                session_id = %record.session_id,
                source = %record.source,
                "Query failed: {}",
                record.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    /// Component-by-component summary for the status endpoint.
    pub async fn pipeline_status(&self) -> Value {
        let store = self.tools.database().store();
        let database = match store.list_collections().await {
            Ok(collections) => json!({
                "store": store.name(),
                "status": "connected",
                "collections_count": collections.len(),
                "collections": collections.iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
            }),
            Err(err) => json!({
                "store": store.name(),
                "status": "error",
                "error": err.to_string(),
            }),
        };
        let database_ok = database["status"] == "connected";

        let keys = self.tools.api().validate_api_keys();
        let monitoring = match (self.monitor.status(false), self.monitor.health()) {
            (Ok(status), Ok(health)) => json!({ "status": status, "health": health }),
            (Err(err), _) | (_, Err(err)) => json!({ "error": err.to_string() }),
        };

        let operational = [
            database_ok,
            keys.gemini,
            keys.tavily,
            !Tool::ALL.is_empty(),
            monitoring.get("error").is_none(),
        ]
        .iter()
        .filter(|ok| **ok)
        .count();

        json!({
            "overall_status": format!("{}/5 components operational", operational),
            "timestamp": Utc::now().to_rfc3339(),
            "started_at": self.started_at.to_rfc3339(),
            "database": database,
            "tools": {
                "count": Tool::ALL.len(),
                "names": Tool::ALL.iter().map(Tool::name).collect::<Vec<_>>(),
            },
            "api_client": self.tools.api().status(),
            "agent_manager": self.agent.agent_info(),
            "handlers": {
                "input_stats": self.input.stats(),
                "output_stats": self.output.stats(),
            },
            "prompt_templates": self.prompts.list_templates(),
            "monitoring": monitoring,
            "configuration": {
                "max_context_length": self.config.retrieval.max_context_length,
                "web_search_enabled": self.config.retrieval.use_web,
                "database_search_enabled": self.config.retrieval.use_database,
                "llm_fallback_enabled": self.config.retrieval.use_llm_fallback,
                "context_enhancement_enabled": self.config.input.enhance_context,
                "max_iterations": self.config.agent.max_iterations,
            },
        })
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head
    }
}
