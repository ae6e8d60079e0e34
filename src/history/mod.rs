use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::llm::ChatMessage;

const CODING_TOPICS: [&str; 39] = [
    "algorithms",
    "data structures",
    "python",
    "javascript",
    "java",
    "c++",
    "leetcode",
    "arrays",
    "trees",
    "graphs",
    "sorting",
    "searching",
    "recursion",
    "dynamic programming",
    "greedy",
    "backtracking",
    "binary search",
    "dfs",
    "bfs",
    "heap",
    "stack",
    "queue",
    "linked list",
    "hash table",
    "string manipulation",
    "debugging",
    "optimization",
    "complexity analysis",
    "object oriented programming",
    "functional programming",
    "design patterns",
    "system design",
    "databases",
    "web development",
    "api",
    "testing",
    "git",
    "machine learning",
    "ai",
];

const LANGUAGES: [&str; 8] = [
    "python",
    "javascript",
    "java",
    "c++",
    "c#",
    "go",
    "rust",
    "kotlin",
];

const ALGORITHM_TERMS: [&str; 12] = [
    "sorting",
    "searching",
    "tree",
    "graph",
    "array",
    "linked list",
    "stack",
    "queue",
    "heap",
    "hash",
    "recursion",
    "dynamic programming",
];

const ERROR_TERMS: [&str; 4] = ["error", "exception", "bug", "issue"];

const SUMMARY_SNIPPET_CHARS: usize = 150;
const CODE_BLOCK_CHARS: usize = 200;
const ERROR_SNIPPET_CHARS: usize = 100;
const CODING_CONTEXT_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryMessage {
    fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        match self.role {
            Role::User => ChatMessage::user(self.content.clone()),
            Role::Assistant => ChatMessage::assistant(self.content.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub query_count: u64,
    pub topics: Vec<String>,
    pub message_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodingContext {
    pub recent_languages: Vec<String>,
    pub algorithms_mentioned: Vec<String>,
    pub code_blocks: Vec<String>,
    pub errors_discussed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionExport {
    pub session_id: String,
    pub metadata: SessionInfo,
    pub coding_context: CodingContext,
    pub messages: Vec<HistoryMessage>,
    pub exported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatistics {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub total_messages: usize,
    pub unique_topics: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

struct Session {
    messages: VecDeque<HistoryMessage>,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    query_count: u64,
    topics: BTreeSet<String>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            messages: VecDeque::new(),
            created_at: now,
            last_active: now,
            query_count: 0,
            topics: BTreeSet::new(),
        }
    }

    fn info(&self, id: &str) -> SessionInfo {
        SessionInfo {
            id: id.to_string(),
            created_at: self.created_at,
            last_active: self.last_active,
            query_count: self.query_count,
            topics: self.topics.iter().cloned().collect(),
            message_count: self.messages.len(),
        }
    }
}

/// Per-session conversation memory. Each session keeps at most `capacity`
/// messages; the oldest are evicted first.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            capacity: capacity.max(2),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn history(&self, session_id: &str) -> Result<Vec<HistoryMessage>, ApiError> {
        let sessions = self.sessions.lock().map_err(ApiError::internal)?;
        Ok(sessions
            .get(session_id)
            .map(|s| s.messages.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Last `window` messages in the shape the LLM provider expects.
    pub fn context_window(
        &self,
        session_id: &str,
        window: usize,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let history = self.history(session_id)?;
        let skip = history.len().saturating_sub(window);
        Ok(history
            .iter()
            .skip(skip)
            .map(HistoryMessage::to_chat_message)
            .collect())
    }

    pub fn append_exchange(
        &self,
        session_id: &str,
        user_input: &str,
        answer: &str,
    ) -> Result<(), ApiError> {
        let mut sessions = self.sessions.lock().map_err(ApiError::internal)?;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(Session::new);

        session.last_active = Utc::now();
        if !user_input.is_empty() {
            session.messages.push_back(HistoryMessage::new(Role::User, user_input));
            session.query_count += 1;
            let lower = user_input.to_lowercase();
            session.topics.extend(
                CODING_TOPICS
                    .iter()
                    .filter(|topic| mentions(&lower, topic))
                    .map(|topic| topic.to_string()),
            );
        }
        if !answer.is_empty() {
            session
                .messages
                .push_back(HistoryMessage::new(Role::Assistant, answer));
        }
        while session.messages.len() > self.capacity {
            session.messages.pop_front();
        }

        tracing::debug!(
            session_id,
            query_count = session.query_count,
            messages = session.messages.len(),
            "Exchange saved"
        );
        Ok(())
    }

    /// Drops the messages and counters but keeps the creation time.
    pub fn clear(&self, session_id: &str) -> Result<bool, ApiError> {
        let mut sessions = self.sessions.lock().map_err(ApiError::internal)?;
        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(false);
        };
        session.messages.clear();
        session.query_count = 0;
        session.topics.clear();
        session.last_active = Utc::now();
        tracing::info!(session_id, "Session history cleared");
        Ok(true)
    }

    pub fn remove(&self, session_id: &str) -> Result<bool, ApiError> {
        let mut sessions = self.sessions.lock().map_err(ApiError::internal)?;
        Ok(sessions.remove(session_id).is_some())
    }

    /// Most recently active first.
    pub fn list_sessions(&self) -> Result<Vec<SessionInfo>, ApiError> {
        let sessions = self.sessions.lock().map_err(ApiError::internal)?;
        let mut infos: Vec<SessionInfo> = sessions.iter().map(|(id, s)| s.info(id)).collect();
        infos.sort_by(|a, b| b.last_active.cmp(&a.last_active).then(a.id.cmp(&b.id)));
        Ok(infos)
    }

    pub fn session_info(&self, session_id: &str) -> Result<Option<SessionInfo>, ApiError> {
        let sessions = self.sessions.lock().map_err(ApiError::internal)?;
        Ok(sessions.get(session_id).map(|s| s.info(session_id)))
    }

    pub fn summarize(&self, session_id: &str, last_n: usize) -> Result<String, ApiError> {
        let sessions = self.sessions.lock().map_err(ApiError::internal)?;
        let Some(session) = sessions.get(session_id).filter(|s| !s.messages.is_empty()) else {
            return Ok("No conversation history available.".to_string());
        };

        let topics: Vec<&str> = session.topics.iter().take(5).map(String::as_str).collect();
        let mut lines = vec![
            "**Session Summary:**".to_string(),
            format!(
                "Topics discussed: {}",
                if topics.is_empty() {
                    "General programming".to_string()
                } else {
                    topics.join(", ")
                }
            ),
            format!("Total queries: {}\n", session.query_count),
            "**Recent Conversation:**".to_string(),
        ];

        let skip = session.messages.len().saturating_sub(last_n);
        for message in session.messages.iter().skip(skip) {
            let speaker = match message.role {
                Role::User => "👤 User",
                Role::Assistant => "🤖 Assistant",
            };
            lines.push(format!(
                "{}: {}",
                speaker,
                ellipsize(&message.content, SUMMARY_SNIPPET_CHARS)
            ));
        }
        Ok(lines.join("\n"))
    }

    pub fn coding_context(&self, session_id: &str) -> Result<CodingContext, ApiError> {
        let history = self.history(session_id)?;
        Ok(analyze_coding_context(&history))
    }

    pub fn export(&self, session_id: &str) -> Result<SessionExport, ApiError> {
        let sessions = self.sessions.lock().map_err(ApiError::internal)?;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))?;
        let messages: Vec<HistoryMessage> = session.messages.iter().cloned().collect();

        Ok(SessionExport {
            session_id: session_id.to_string(),
            metadata: session.info(session_id),
            coding_context: analyze_coding_context(&messages),
            messages,
            exported_at: Utc::now(),
        })
    }

    pub fn statistics(&self) -> Result<SessionStatistics, ApiError> {
        let sessions = self.sessions.lock().map_err(ApiError::internal)?;
        let unique_topics: BTreeSet<&String> =
            sessions.values().flat_map(|s| s.topics.iter()).collect();

        Ok(SessionStatistics {
            total_sessions: sessions.len(),
            active_sessions: sessions.values().filter(|s| s.query_count > 0).count(),
            total_messages: sessions.values().map(|s| s.messages.len()).sum(),
            unique_topics: unique_topics.into_iter().cloned().collect(),
            timestamp: Utc::now(),
        })
    }
}

fn analyze_coding_context(history: &[HistoryMessage]) -> CodingContext {
    let mut languages = BTreeSet::new();
    let mut algorithms = BTreeSet::new();
    let mut context = CodingContext::default();

    let skip = history.len().saturating_sub(CODING_CONTEXT_WINDOW);
    for message in history.iter().skip(skip) {
        let lower = message.content.to_lowercase();
        languages.extend(LANGUAGES.iter().filter(|l| mentions(&lower, l)).copied());
        algorithms.extend(ALGORITHM_TERMS.iter().filter(|t| lower.contains(*t)).copied());

        if let Some(start) = message.content.find("```") {
            if let Some(end) = message.content[start + 3..].find("```") {
                let block = &message.content[start..start + 3 + end + 3];
                context.code_blocks.push(ellipsize(block, CODE_BLOCK_CHARS));
            }
        }
        if ERROR_TERMS.iter().any(|t| lower.contains(t)) {
            context
                .errors_discussed
                .push(ellipsize(&message.content, ERROR_SNIPPET_CHARS));
        }
    }

    context.recent_languages = languages.into_iter().map(str::to_string).collect();
    context.algorithms_mentioned = algorithms.into_iter().map(str::to_string).collect();
    context
}

/// Substring match that refuses to start or end inside a word, so `ai`
/// does not fire on "explain".
fn mentions(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest_messages() {
        let store = SessionStore::new(4);
        for i in 0..3 {
            store
                .append_exchange("s1", &format!("question {}", i), &format!("answer {}", i))
                .unwrap();
        }

        let history = store.history("s1").unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "question 1");
        assert_eq!(history[3].content, "answer 2");

        let info = store.session_info("s1").unwrap().unwrap();
        assert_eq!(info.query_count, 3);
        assert_eq!(info.message_count, 4);
    }

    #[test]
    fn topics_are_collected_from_user_input() {
        let store = SessionStore::new(40);
        store
            .append_exchange("s1", "How does binary search work in Python?", "It halves.")
            .unwrap();

        let info = store.session_info("s1").unwrap().unwrap();
        assert!(info.topics.contains(&"binary search".to_string()));
        assert!(info.topics.contains(&"python".to_string()));
        assert!(!info.topics.contains(&"java".to_string()));
        assert!(!info.topics.contains(&"ai".to_string()));
    }

    #[test]
    fn context_window_maps_roles() {
        let store = SessionStore::new(40);
        store.append_exchange("s1", "q1", "a1").unwrap();
        store.append_exchange("s1", "q2", "a2").unwrap();

        let window = store.context_window("s1", 3).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].role, "assistant");
        assert_eq!(window[0].content, "a1");
        assert_eq!(window[2].content, "a2");
        assert!(store.context_window("missing", 8).unwrap().is_empty());
    }

    #[test]
    fn summary_truncates_long_messages() {
        let store = SessionStore::new(40);
        assert_eq!(
            store.summarize("s1", 6).unwrap(),
            "No conversation history available."
        );

        let long_answer = "x".repeat(200);
        store.append_exchange("s1", "Explain recursion", &long_answer).unwrap();

        let summary = store.summarize("s1", 6).unwrap();
        assert!(summary.starts_with("**Session Summary:**"));
        assert!(summary.contains("Topics discussed: recursion"));
        assert!(summary.contains("Total queries: 1"));
        assert!(summary.contains("👤 User: Explain recursion"));
        assert!(summary.contains(&format!("🤖 Assistant: {}...", "x".repeat(150))));
    }

    #[test]
    fn clear_keeps_session_but_drops_messages() {
        let store = SessionStore::new(40);
        store.append_exchange("s1", "Explain heap", "A heap is a tree.").unwrap();
        let created = store.session_info("s1").unwrap().unwrap().created_at;

        assert!(store.clear("s1").unwrap());
        assert!(!store.clear("missing").unwrap());

        let info = store.session_info("s1").unwrap().unwrap();
        assert_eq!(info.message_count, 0);
        assert_eq!(info.query_count, 0);
        assert!(info.topics.is_empty());
        assert_eq!(info.created_at, created);
    }

    #[test]
    fn export_includes_coding_context() {
        let store = SessionStore::new(40);
        store
            .append_exchange(
                "s1",
                "Why does my rust code panic with an index error?",
                "Check bounds:\n```rust\nlet x = v.get(i);\n```",
            )
            .unwrap();

        let export = store.export("s1").unwrap();
        assert_eq!(export.session_id, "s1");
        assert_eq!(export.messages.len(), 2);
        assert_eq!(export.coding_context.recent_languages, vec!["rust"]);
        assert_eq!(
            export.coding_context.code_blocks,
            vec!["```rust\nlet x = v.get(i);\n```"]
        );
        assert_eq!(export.coding_context.errors_discussed.len(), 1);

        assert!(matches!(store.export("missing"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn statistics_span_sessions() {
        let store = SessionStore::new(40);
        store.append_exchange("a", "Explain graphs", "...").unwrap();
        store.append_exchange("b", "Explain stack", "...").unwrap();
        store.clear("b").unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.unique_topics, vec!["graphs"]);

        assert_eq!(store.list_sessions().unwrap().len(), 2);
    }
}
