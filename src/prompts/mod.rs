use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::tools::Tool;

pub mod templates;

const EMPTY_CONTEXT: &str = "No additional context provided.";
const REACT_TEMPLATE_NAME: &str = "react_agent";
const LOW_CONFIDENCE: f64 = 0.3;

const DS_ALGO_KEYWORDS: [&str; 60] = [
    "array",
    "list",
    "tree",
    "binary tree",
    "bst",
    "graph",
    "linked list",
    "stack",
    "queue",
    "heap",
    "hash",
    "sort",
    "sorting",
    "search",
    "searching",
    "leetcode",
    "algorithm",
    "algorithms",
    "complexity",
    "big o",
    "time complexity",
    "space complexity",
    "dynamic programming",
    "dp",
    "recursion",
    "recursive",
    "iteration",
    "iterative",
    "dfs",
    "bfs",
    "traversal",
    "fibonacci",
    "palindrome",
    "two pointers",
    "sliding window",
    "backtracking",
    "greedy",
    "divide and conquer",
    "merge sort",
    "quick sort",
    "binary search",
    "linear search",
    "dijkstra",
    "floyd warshall",
    "topological sort",
    "union find",
    "disjoint set",
    "segment tree",
    "fenwick tree",
    "trie",
    "suffix",
    "lru cache",
    "lfu cache",
    "two sum",
    "subarray",
    "subsequence",
    "matrix",
    "knapsack",
    "memoization",
    "bit manipulation",
];

const COMPARISON_KEYWORDS: [&str; 11] = [
    "vs",
    "versus",
    "compare",
    "comparison",
    "difference",
    "differences",
    "better",
    "which is better",
    "pros and cons",
    "advantages",
    "disadvantages",
];

const REVIEW_KEYWORDS: [&str; 9] = [
    "review",
    "improve",
    "optimize",
    "refactor",
    "best practice",
    "best practices",
    "code quality",
    "clean code",
    "performance",
];

const DEBUG_KEYWORDS: [&str; 17] = [
    "error",
    "bug",
    "debug",
    "debugging",
    "fix",
    "issue",
    "problem",
    "exception",
    "traceback",
    "not working",
    "doesn't work",
    "fails",
    "crash",
    "crashes",
    "syntax error",
    "runtime error",
    "logic error",
];

const TECHNICAL_KEYWORDS: [&str; 33] = [
    "python",
    "javascript",
    "java",
    "c++",
    "c#",
    "go",
    "rust",
    "kotlin",
    "algorithm",
    "data structure",
    "machine learning",
    "ai",
    "api",
    "rest",
    "database",
    "sql",
    "nosql",
    "web",
    "mobile",
    "frontend",
    "backend",
    "framework",
    "library",
    "docker",
    "kubernetes",
    "aws",
    "cloud",
    "git",
    "github",
    "testing",
    "unit test",
    "integration",
    "deployment",
];

const STRUCTURE_MARKERS: [&str; 5] = ["##", "###", "1.", "2.", "3."];

/// System-prompt family chosen for a query.
///
/// This classifier is independent of [`crate::input::QueryType`] and the two
/// may disagree on the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptCategory {
    Theory,
    DsProblem,
    Comparison,
    CodeReview,
    Debugging,
}

impl PromptCategory {
    pub const ALL: [PromptCategory; 5] = [
        PromptCategory::Theory,
        PromptCategory::DsProblem,
        PromptCategory::Comparison,
        PromptCategory::CodeReview,
        PromptCategory::Debugging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptCategory::Theory => "theory",
            PromptCategory::DsProblem => "ds_problem",
            PromptCategory::Comparison => "comparison",
            PromptCategory::CodeReview => "code_review",
            PromptCategory::Debugging => "debugging",
        }
    }

    fn default_template(&self) -> &'static str {
        match self {
            PromptCategory::Theory => templates::THEORY,
            PromptCategory::DsProblem => templates::DS_PROBLEM,
            PromptCategory::Comparison => templates::COMPARISON,
            PromptCategory::CodeReview => templates::CODE_REVIEW,
            PromptCategory::Debugging => templates::DEBUGGING,
        }
    }
}

impl fmt::Display for PromptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedPrompt {
    pub category: PromptCategory,
    pub template: String,
    pub system: String,
    pub query: String,
    pub confidence: f64,
}

pub struct PromptEngineer {
    templates: RwLock<BTreeMap<String, String>>,
}

impl PromptEngineer {
    pub fn new() -> Self {
        let templates = PromptCategory::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), c.default_template().to_string()))
            .collect();
        Self {
            templates: RwLock::new(templates),
        }
    }

    pub fn classify(&self, query: &str) -> PromptCategory {
        let lower = query.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|kw| lower.contains(kw));

        if matches(&DS_ALGO_KEYWORDS[..]) {
            PromptCategory::DsProblem
        } else if matches(&COMPARISON_KEYWORDS[..]) {
            PromptCategory::Comparison
        } else if matches(&REVIEW_KEYWORDS[..]) {
            PromptCategory::CodeReview
        } else if matches(&DEBUG_KEYWORDS[..]) {
            PromptCategory::Debugging
        } else {
            PromptCategory::Theory
        }
    }

    pub fn build_prompt(
        &self,
        category: PromptCategory,
        query: &str,
        context: &str,
    ) -> GeneratedPrompt {
        let template = self
            .template(category.as_str())
            .unwrap_or_else(|| category.default_template().to_string());
        let confidence = calibrate_confidence(context, query);
        if confidence < LOW_CONFIDENCE {
            tracing::warn!("Low confidence ({:.2}) for {} prompt", confidence, category);
        }

        GeneratedPrompt {
            category,
            template: category.as_str().to_string(),
            system: fill_context(&template, context),
            query: query.to_string(),
            confidence,
        }
    }

    /// Classifies and builds in one step.
    pub fn generate(&self, query: &str, context: &str) -> GeneratedPrompt {
        let category = self.classify(query);
        tracing::debug!("Prompt category: {}", category);
        self.build_prompt(category, query, context)
    }

    /// Renders a named template (built-in or registered) for `query`.
    pub fn render_template(
        &self,
        name: &str,
        query: &str,
        context: &str,
    ) -> Result<GeneratedPrompt, ApiError> {
        let template = self
            .template(name)
            .ok_or_else(|| ApiError::NotFound(format!("prompt template `{}`", name)))?;
        let category = self.classify(query);
        Ok(GeneratedPrompt {
            category,
            template: name.to_string(),
            system: fill_context(&template, context),
            query: query.to_string(),
            confidence: calibrate_confidence(context, query),
        })
    }

    pub fn register_template(&self, name: &str, template: &str) -> Result<(), ApiError> {
        let name = name.trim();
        if name.is_empty() || name == REACT_TEMPLATE_NAME {
            return Err(ApiError::BadRequest(format!(
                "template name `{}` is not allowed",
                name
            )));
        }
        if !template.contains("{context}") {
            return Err(ApiError::BadRequest(
                "template must contain a {context} placeholder".to_string(),
            ));
        }
        let mut templates = self.templates.write().map_err(ApiError::internal)?;
        templates.insert(name.to_string(), template.to_string());
        tracing::info!("Registered prompt template: {}", name);
        Ok(())
    }

    pub fn list_templates(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .templates
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.push(REACT_TEMPLATE_NAME.to_string());
        names
    }

    /// The tool-use protocol shown to the agent.
    pub fn react_instructions(&self, max_iterations: usize) -> String {
        templates::REACT_AGENT
            .replace("{tools}", &Tool::catalog())
            .replace("{tool_names}", &Tool::names())
            .replace("{max_iterations}", &max_iterations.to_string())
    }

    fn template(&self, name: &str) -> Option<String> {
        self.templates
            .read()
            .ok()
            .and_then(|t| t.get(name).cloned())
    }
}

impl Default for PromptEngineer {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_context(template: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        EMPTY_CONTEXT
    } else {
        context
    };
    template.replace("{context}", context)
}

/// Advisory score in `[0, 1]` from context richness (60%) and query richness (40%).
pub fn calibrate_confidence(context: &str, query: &str) -> f64 {
    let mut context_score = 0.0;
    if !context.trim().is_empty() {
        let words = context.split_whitespace().count() as f64;
        context_score = (words / 200.0).min(1.0);
        if context.contains("```") {
            context_score += 0.2;
        }
        if STRUCTURE_MARKERS.iter().any(|m| context.contains(m)) {
            context_score += 0.1;
        }
    }

    let query_words = query.split_whitespace().count();
    let mut query_score = match query_words {
        n if n > 10 => 0.9,
        n if n > 5 => 0.8,
        n if n > 2 => 0.6,
        _ => 0.4,
    };
    let lower = query.to_lowercase();
    if TECHNICAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        query_score += 0.2;
    }

    (context_score * 0.6 + query_score * 0.4).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::QueryType;

    #[test]
    fn classification_follows_its_own_priority() {
        let engineer = PromptEngineer::new();
        let cases = [
            ("Explain binary search", PromptCategory::DsProblem),
            ("python vs java for scripting", PromptCategory::Comparison),
            ("please review my code", PromptCategory::CodeReview),
            ("my program crashes with a traceback", PromptCategory::Debugging),
            ("What is polymorphism?", PromptCategory::Theory),
        ];
        for (query, expected) in cases {
            assert_eq!(engineer.classify(query), expected, "{}", query);
        }
    }

    #[test]
    fn classifiers_are_independent() {
        let query = "Fix the bug in my binary search implementation";
        assert_eq!(QueryType::detect(query), QueryType::Debugging);
        assert_eq!(PromptEngineer::new().classify(query), PromptCategory::DsProblem);
    }

    #[test]
    fn empty_context_uses_placeholder() {
        let prompt = PromptEngineer::new().build_prompt(PromptCategory::Theory, "What is a monad?", "  ");
        assert!(prompt.system.contains("Context: No additional context provided."));
        assert!(!prompt.system.contains("{context}"));
        assert_eq!(prompt.template, "theory");
    }

    #[test]
    fn context_is_substituted() {
        let prompt = PromptEngineer::new().generate("Explain heaps", "A heap is a tree.");
        assert_eq!(prompt.category, PromptCategory::DsProblem);
        assert!(prompt.system.contains("Context: A heap is a tree."));
        assert!(prompt.system.starts_with("You are a Data Structures and Algorithms expert"));
    }

    #[test]
    fn confidence_blends_context_and_query() {
        assert!((calibrate_confidence("", "hi") - 0.16).abs() < 1e-9);

        let context = "word ".repeat(100);
        let score = calibrate_confidence(&context, "how do closures capture variables in rust");
        assert!((score - 0.7).abs() < 1e-9);

        let rich = format!("{}\n```rust\nfn main() {{}}\n```\n1. step", "word ".repeat(300));
        let long_query = "one two three four five six seven eight nine ten eleven";
        assert_eq!(calibrate_confidence(&rich, long_query), 1.0);
    }

    #[test]
    fn custom_templates_require_context_slot() {
        let engineer = PromptEngineer::new();
        assert!(engineer.register_template("interview", "Be terse.").is_err());
        assert!(engineer.register_template("react_agent", "{context}").is_err());

        engineer
            .register_template("interview", "You are an interviewer.\nContext: {context}")
            .unwrap();
        let names = engineer.list_templates();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"interview".to_string()));

        let prompt = engineer
            .render_template("interview", "Ask me about trees", "none yet")
            .unwrap();
        assert_eq!(prompt.system, "You are an interviewer.\nContext: none yet");
        assert!(engineer.render_template("missing", "q", "").is_err());
    }

    #[test]
    fn react_instructions_name_the_tools() {
        let text = PromptEngineer::new().react_instructions(5);
        assert!(text.contains("- DatabaseSearch:"));
        assert!(text.contains("[DatabaseSearch, WebSearch]"));
        assert!(text.contains("at most 5 steps"));
        assert!(!text.contains("{tools}"));
    }
}
