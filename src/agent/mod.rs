use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::config::AgentSettings;
use crate::core::errors::ApiError;
use crate::history::SessionStore;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::prompts::PromptEngineer;
use crate::tools::{Tool, ToolBox};

const STOPPED_NOTICE: &str =
    "Agent stopped due to iteration limit before reaching a final answer.";

#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// The user's question, also what gets stored in session history.
    pub input: String,
    /// Category prompt with retrieved context already filled in.
    pub system_prompt: Option<String>,
}

impl AgentRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    pub response: String,
    pub success: bool,
    pub source: String,
    pub session_id: String,
    pub error: Option<String>,
    pub iterations: usize,
    pub stopped_early: bool,
    pub tools_used: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub tools: Vec<&'static str>,
    pub llm_provider: String,
    pub llm_model: String,
    pub prompt_type: &'static str,
    pub max_iterations: usize,
    pub history_capacity: usize,
    pub sessions_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentDecision {
    Final(String),
    ToolCall {
        name: String,
        query: Option<String>,
        thought: Option<String>,
    },
}

/// Runs the bounded think/act/observe loop and owns per-session history.
pub struct AgentManager {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolBox>,
    prompts: Arc<PromptEngineer>,
    sessions: SessionStore,
    settings: AgentSettings,
}

impl AgentManager {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: Arc<ToolBox>,
        prompts: Arc<PromptEngineer>,
        settings: AgentSettings,
    ) -> Self {
        let sessions = SessionStore::new(settings.history_capacity);
        tracing::info!(
            max_iterations = settings.max_iterations,
            history_capacity = sessions.capacity(),
            "AgentManager initialized"
        );
        Self {
            llm,
            tools,
            prompts,
            sessions,
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn answer(&self, request: AgentRequest, session_id: &str) -> AgentResult {
        let mut messages = match self.initial_messages(&request, session_id) {
            Ok(messages) => messages,
            Err(err) => return failure(session_id, &err, 0, Vec::new()),
        };

        let max_steps = self.settings.max_iterations.max(1);
        let mut tools_used = Vec::new();
        let mut last_thought: Option<String> = None;

        for step in 0..max_steps {
            tracing::debug!(session_id, "Reasoning step {}/{}", step + 1, max_steps);

            let chat = ChatRequest::new(messages.clone())
                .with_temperature(self.settings.temperature)
                .with_max_tokens(self.settings.max_tokens);
            let reply = match self.llm.chat(chat).await {
                Ok(reply) => reply,
                Err(err) => return failure(session_id, &err, step + 1, tools_used),
            };

            match parse_agent_decision(&reply) {
                AgentDecision::Final(content) => {
                    if content.trim().is_empty() {
                        let err = ApiError::Upstream("model returned an empty answer".to_string());
                        return failure(session_id, &err, step + 1, tools_used);
                    }
                    return self.success(&request, session_id, content, step + 1, false, tools_used);
                }
                AgentDecision::ToolCall {
                    name,
                    query,
                    thought,
                } => {
                    if let Some(thought) = thought.filter(|t| !t.trim().is_empty()) {
                        last_thought = Some(thought);
                    }
                    messages.push(ChatMessage::assistant(reply.trim()));

                    let observation = match name.parse::<Tool>() {
                        Ok(tool) => {
                            tools_used.push(tool);
                            let query = query.unwrap_or_else(|| request.input.clone());
                            match self.tools.execute(tool, &query).await {
                                Ok(output) => format!("Tool `{}` result:\n{}", tool, output),
                                Err(err) => {
                                    tracing::warn!("Tool {} failed: {}", tool, err);
                                    format!("Tool `{}` failed: {}", tool, err)
                                }
                            }
                        }
                        Err(err) => err.to_string(),
                    };
                    messages.push(ChatMessage::system(observation));
                }
            }
        }

        tracing::warn!(session_id, "Agent reached the maximum number of steps");
        let response = last_thought.unwrap_or_else(|| STOPPED_NOTICE.to_string());
        self.success(&request, session_id, response, max_steps, true, tools_used)
    }

    pub fn agent_info(&self) -> AgentInfo {
        AgentInfo {
            tools: Tool::ALL.iter().map(Tool::name).collect(),
            llm_provider: self.llm.name().to_string(),
            llm_model: self.llm.model().to_string(),
            prompt_type: "react",
            max_iterations: self.settings.max_iterations,
            history_capacity: self.sessions.capacity(),
            sessions_count: self
                .sessions
                .list_sessions()
                .map(|s| s.len())
                .unwrap_or_default(),
        }
    }

    fn initial_messages(
        &self,
        request: &AgentRequest,
        session_id: &str,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let protocol = self.prompts.react_instructions(self.settings.max_iterations);
        let system = match request.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => format!("{}\n\n{}", prompt.trim(), protocol),
            _ => protocol,
        };

        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(
            self.sessions
                .context_window(session_id, self.sessions.capacity())?,
        );
        messages.push(ChatMessage::user(request.input.clone()));
        Ok(messages)
    }

    fn success(
        &self,
        request: &AgentRequest,
        session_id: &str,
        response: String,
        iterations: usize,
        stopped_early: bool,
        tools_used: Vec<Tool>,
    ) -> AgentResult {
        if let Err(err) = self
            .sessions
            .append_exchange(session_id, &request.input, &response)
        {
            tracing::error!("Failed to save session history: {}", err);
        }
        tracing::info!(session_id, iterations, stopped_early, "Agent answered");

        AgentResult {
            response,
            success: true,
            source: "agent".to_string(),
            session_id: session_id.to_string(),
            error: None,
            iterations,
            stopped_early,
            tools_used,
        }
    }
}

fn failure(
    session_id: &str,
    err: &ApiError,
    iterations: usize,
    tools_used: Vec<Tool>,
) -> AgentResult {
    tracing::error!(session_id, "Agent failed: {}", err);
    AgentResult {
        response: format!(
            "I apologize, but I encountered an error while processing your query: {}",
            err
        ),
        success: false,
        source: "error".to_string(),
        session_id: session_id.to_string(),
        error: Some(err.to_string()),
        iterations,
        stopped_early: false,
        tools_used,
    }
}

/// Reads a model reply as JSON, then as `Action:`/`Final Answer:` text, and
/// otherwise takes the whole reply as the answer.
pub fn parse_agent_decision(text: &str) -> AgentDecision {
    if let Some(json_value) = parse_json_from_text(text) {
        if let Some(decision) = parse_decision_from_value(&json_value) {
            return decision;
        }
    }
    if let Some(decision) = parse_decision_from_text(text) {
        return decision;
    }
    AgentDecision::Final(text.trim().to_string())
}

fn parse_json_from_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

fn parse_decision_from_value(value: &Value) -> Option<AgentDecision> {
    let action_type = value
        .get("type")
        .or_else(|| value.get("action"))
        .and_then(|v| v.as_str())
        .unwrap_or("");

    if action_type == "tool_call" {
        let name = value
            .get("tool_name")
            .or_else(|| value.get("name"))
            .or_else(|| value.get("tool"))
            .and_then(|v| v.as_str())?;
        let args = value.get("tool_args").or_else(|| value.get("args"));
        let query = match args {
            Some(Value::String(s)) => Some(s.clone()),
            Some(args) => args
                .get("query")
                .or_else(|| args.get("input"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            None => None,
        };
        let thought = value
            .get("thought")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        return Some(AgentDecision::ToolCall {
            name: name.to_string(),
            query,
            thought,
        });
    }

    if action_type == "final" {
        let content = value
            .get("content")
            .or_else(|| value.get("message"))
            .or_else(|| value.get("response"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        return Some(AgentDecision::Final(content));
    }

    None
}

fn parse_decision_from_text(text: &str) -> Option<AgentDecision> {
    if let Some(idx) = text.find("Final Answer:") {
        let answer = text[idx + "Final Answer:".len()..].trim();
        return Some(AgentDecision::Final(answer.to_string()));
    }

    let field = |label: &str| {
        text.lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix(label))
            .map(|rest| rest.trim().trim_matches('"').to_string())
            .filter(|rest| !rest.is_empty())
    };

    let name = field("Action:")?;
    Some(AgentDecision::ToolCall {
        name,
        query: field("Action Input:"),
        thought: field("Thought:"),
    })
}
