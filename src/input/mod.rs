use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::InputSettings;
use crate::core::errors::ApiError;

pub mod code_spans;

pub use code_spans::{CodeSpan, CodeSpanExtractor};

const TRUNCATION_MARKER: &str = "... [truncated]";
const UNSAFE_PATTERN_WARNING: &str = "Input contains potentially unsafe code patterns";
const KEYWORD_SUGGESTION: &str = "Consider adding programming-related keywords for better results";

const SUSPICIOUS_PATTERNS: [&str; 6] = [
    r"exec\s*\(",
    r"eval\s*\(",
    r"__import__\s*\(",
    r"subprocess\.",
    r"os\.system",
    r"open\s*\(",
];

const CODING_KEYWORDS: [&str; 29] = [
    "algorithm",
    "code",
    "python",
    "java",
    "javascript",
    "c++",
    "programming",
    "function",
    "class",
    "method",
    "variable",
    "loop",
    "if",
    "else",
    "return",
    "array",
    "list",
    "tree",
    "graph",
    "sort",
    "search",
    "debug",
    "error",
    "leetcode",
    "dsa",
    "data structure",
    "implement",
    "explain",
    "how to",
];

/// Coarse intent of a query, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Debugging,
    Implementation,
    Explanation,
    Comparison,
    Optimization,
    DsaProblem,
    General,
}

impl QueryType {
    const PRIORITY: [(QueryType, &'static [&'static str]); 6] = [
        (QueryType::Debugging, &["error", "debug", "fix", "bug", "issue"]),
        (QueryType::Implementation, &["implement", "code", "write", "create"]),
        (
            QueryType::Explanation,
            &["explain", "what is", "how does", "describe"],
        ),
        (
            QueryType::Comparison,
            &["compare", "difference", "vs", "versus"],
        ),
        (
            QueryType::Optimization,
            &["optimize", "improve", "better", "performance"],
        ),
        (QueryType::DsaProblem, &["leetcode", "dsa", "algorithm", "complexity"]),
    ];

    /// First keyword-set match wins; ties go to the earlier category.
    pub fn detect(text: &str) -> QueryType {
        let lower = text.to_lowercase();
        Self::PRIORITY
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
            .map(|(query_type, _)| *query_type)
            .unwrap_or(QueryType::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Debugging => "debugging",
            QueryType::Implementation => "implementation",
            QueryType::Explanation => "explanation",
            QueryType::Comparison => "comparison",
            QueryType::Optimization => "optimization",
            QueryType::DsaProblem => "dsa_problem",
            QueryType::General => "general",
        }
    }

    fn context_hint(&self) -> Option<&'static str> {
        match self {
            QueryType::Debugging => Some("Focus on error analysis and solution steps."),
            QueryType::Implementation => Some("Provide working code examples with explanations."),
            QueryType::Explanation => Some("Give clear, educational explanations with examples."),
            QueryType::Comparison => Some("Show differences with pros/cons and use cases."),
            QueryType::Optimization => {
                Some("Suggest performance improvements and best practices.")
            }
            QueryType::DsaProblem => Some("Include time/space complexity analysis."),
            QueryType::General => None,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// A single accepted user submission.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedInput {
    pub session_id: String,
    pub original: String,
    pub sanitized: String,
    /// Sanitized text plus the optional context hint; this is what gets answered.
    pub query: String,
    pub query_type: QueryType,
    pub code_spans: Vec<CodeSpan>,
    pub validation: ValidationReport,
    pub processed_at: DateTime<Utc>,
    pub processing_time: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Input validation failed: {}", errors.join("; "))]
    Validation {
        errors: Vec<String>,
        warnings: Vec<String>,
        session_id: String,
    },
}

impl InputError {
    pub fn errors(&self) -> &[String] {
        match self {
            InputError::Validation { errors, .. } => errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputStats {
    pub total_processed: u64,
    pub valid_inputs: u64,
    pub invalid_inputs: u64,
    /// Percentage of valid inputs.
    pub success_rate: f64,
}

pub struct InputHandler {
    settings: InputSettings,
    blank_lines: Regex,
    horizontal_space: Regex,
    disallowed: Regex,
    suspicious: Vec<Regex>,
    extractor: CodeSpanExtractor,
    total: AtomicU64,
    valid: AtomicU64,
    invalid: AtomicU64,
}

impl InputHandler {
    pub fn new(settings: InputSettings) -> Result<Self, ApiError> {
        let suspicious = SUSPICIOUS_PATTERNS
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(ApiError::internal)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            settings,
            blank_lines: Regex::new(r"\n\s*\n\s*\n").map_err(ApiError::internal)?,
            horizontal_space: Regex::new(r"[ \t]+").map_err(ApiError::internal)?,
            disallowed: Regex::new(r#"[^\w\s.,!?()\[\]{};:'"`\-+=*/<>@#$%^\&|\\\~_]"#)
                .map_err(ApiError::internal)?,
            suspicious,
            extractor: CodeSpanExtractor::new()?,
            total: AtomicU64::new(0),
            valid: AtomicU64::new(0),
            invalid: AtomicU64::new(0),
        })
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    /// Sanitizes, validates and analyses one submission.
    ///
    /// Rejection happens before anything else observes the input, so a
    /// validation failure never reaches an external service.
    pub fn process(&self, raw_text: &str, session_id: &str) -> Result<ProcessedInput, InputError> {
        let started = Instant::now();
        self.total.fetch_add(1, Ordering::Relaxed);

        let sanitized = self.sanitize(raw_text);
        let validation = self.validate(&sanitized);

        if !validation.is_valid {
            self.invalid.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(session_id, "Input validation failed: {:?}", validation.errors);
            return Err(InputError::Validation {
                errors: validation.errors,
                warnings: validation.warnings,
                session_id: session_id.to_string(),
            });
        }

        let code_spans = self.extractor.extract(&sanitized);
        let query_type = QueryType::detect(&sanitized);
        let query = if self.settings.enhance_context {
            enhance_query_context(&sanitized, query_type)
        } else {
            sanitized.clone()
        };

        self.valid.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            session_id,
            query_type = %query_type,
            code_spans = code_spans.len(),
            "Input processed"
        );

        Ok(ProcessedInput {
            session_id: session_id.to_string(),
            original: raw_text.to_string(),
            sanitized,
            query,
            query_type,
            code_spans,
            validation,
            processed_at: Utc::now(),
            processing_time: started.elapsed().as_secs_f64(),
        })
    }

    pub fn sanitize(&self, raw_text: &str) -> String {
        let text = self.blank_lines.replace_all(raw_text, "\n\n");
        let text = self.horizontal_space.replace_all(&text, " ");
        let text = self.disallowed.replace_all(text.trim(), "");
        let text = text.trim();

        let max = self.settings.max_input_length;
        if text.chars().count() > max {
            let head: String = text.chars().take(max).collect();
            tracing::warn!("Input truncated to {} characters", max);
            return format!("{}{}", head, TRUNCATION_MARKER);
        }
        text.to_string()
    }

    pub fn validate(&self, text: &str) -> ValidationReport {
        let mut report = ValidationReport {
            is_valid: true,
            ..ValidationReport::default()
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            report.is_valid = false;
            report.errors.push("Input cannot be empty".to_string());
            return report;
        }

        if trimmed.chars().count() < self.settings.min_input_length {
            report.is_valid = false;
            report.errors.push(format!(
                "Input too short (minimum {} characters)",
                self.settings.min_input_length
            ));
            return report;
        }

        if text.chars().count() > self.settings.max_input_length {
            report.warnings.push(format!(
                "Input will be truncated (max {} characters)",
                self.settings.max_input_length
            ));
        }

        if self.suspicious.iter().any(|re| re.is_match(text)) {
            tracing::warn!("Suspicious code pattern detected in input");
            report.warnings.push(UNSAFE_PATTERN_WARNING.to_string());
        }

        let lower = text.to_lowercase();
        if !CODING_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            report.suggestions.push(KEYWORD_SUGGESTION.to_string());
        }

        report
    }

    pub fn extract_code_spans(&self, text: &str) -> Vec<CodeSpan> {
        self.extractor.extract(text)
    }

    pub fn stats(&self) -> InputStats {
        let total = self.total.load(Ordering::Relaxed);
        let valid = self.valid.load(Ordering::Relaxed);
        let invalid = self.invalid.load(Ordering::Relaxed);
        InputStats {
            total_processed: total,
            valid_inputs: valid,
            invalid_inputs: invalid,
            success_rate: if total == 0 {
                0.0
            } else {
                valid as f64 / total as f64 * 100.0
            },
        }
    }

    pub fn reset_stats(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.valid.store(0, Ordering::Relaxed);
        self.invalid.store(0, Ordering::Relaxed);
    }
}

pub fn enhance_query_context(query: &str, query_type: QueryType) -> String {
    match query_type.context_hint() {
        Some(hint) => format!("{}\n\n[Context: {}]", query, hint),
        None => query.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> InputHandler {
        InputHandler::new(InputSettings::default()).unwrap()
    }

    #[test]
    fn empty_and_short_inputs_are_rejected() {
        let h = handler();

        let err = h.process("   \n\t ", "s1").unwrap_err();
        assert_eq!(err.errors(), ["Input cannot be empty".to_string()]);

        for short in ["a", "ab", " ab "] {
            let err = h.process(short, "s1").unwrap_err();
            assert_eq!(
                err.errors(),
                ["Input too short (minimum 3 characters)".to_string()]
            );
        }

        let stats = h.stats();
        assert_eq!(stats.total_processed, 4);
        assert_eq!(stats.invalid_inputs, 4);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn long_input_is_truncated_with_marker() {
        let h = handler();
        for len in [2001, 2500, 10_000] {
            let processed = h.process(&"a".repeat(len), "s1").unwrap();
            assert_eq!(
                processed.sanitized.chars().count(),
                2000 + TRUNCATION_MARKER.chars().count()
            );
            assert!(processed.sanitized.ends_with(TRUNCATION_MARKER));
            assert!(processed
                .validation
                .warnings
                .iter()
                .any(|w| w.contains("truncated")));
        }

        let exact = h.process(&"a".repeat(2000), "s1").unwrap();
        assert_eq!(exact.sanitized.len(), 2000);
    }

    #[test]
    fn sanitize_collapses_whitespace_and_strips_symbols() {
        let h = handler();
        assert_eq!(h.sanitize("line one\n\n\n\nline two"), "line one\n\nline two");
        assert_eq!(h.sanitize("  fn   main()\t{ }  "), "fn main() { }");
        assert_eq!(h.sanitize("Explain 😀 binary search ©"), "Explain  binary search");
        assert_eq!(
            h.sanitize("a[i] += b->c && d || ~e; // `x` @ #1 $5 50% ^"),
            "a[i] += b->c && d || ~e; // `x` @ #1 $5 50% ^"
        );
    }

    #[test]
    fn query_type_follows_declared_priority() {
        let cases = [
            ("Fix the error in my implementation", QueryType::Debugging),
            ("implement a stack and write tests", QueryType::Implementation),
            ("what is a closure", QueryType::Explanation),
            ("compare tabs and spaces", QueryType::Comparison),
            ("optimize this loop", QueryType::Optimization),
            ("dsa complexity question", QueryType::DsaProblem),
            ("hello there", QueryType::General),
        ];
        for (text, expected) in cases {
            assert_eq!(QueryType::detect(text), expected, "{}", text);
        }
    }

    #[test]
    fn accepted_input_carries_hint_and_spans() {
        let h = handler();
        let processed = h
            .process("Why does `eval(x)` raise an error?", "sess")
            .unwrap();

        assert_eq!(processed.query_type, QueryType::Debugging);
        assert_eq!(
            processed.query,
            "Why does `eval(x)` raise an error?\n\n[Context: Focus on error analysis and solution steps.]"
        );
        assert_eq!(processed.code_spans.len(), 1);
        assert_eq!(processed.code_spans[0].id, "inline_0");
        assert_eq!(
            processed.validation.warnings,
            vec![UNSAFE_PATTERN_WARNING.to_string()]
        );
        assert!(processed.validation.suggestions.is_empty());
    }

    #[test]
    fn general_queries_get_no_hint_and_a_keyword_suggestion() {
        let h = handler();
        let processed = h.process("hello there", "sess").unwrap();
        assert_eq!(processed.query, "hello there");
        assert_eq!(processed.validation.suggestions, vec![KEYWORD_SUGGESTION.to_string()]);
    }

    #[test]
    fn enhancement_can_be_disabled() {
        let h = InputHandler::new(InputSettings {
            enhance_context: false,
            ..InputSettings::default()
        })
        .unwrap();
        let processed = h.process("explain recursion", "sess").unwrap();
        assert_eq!(processed.query, "explain recursion");
        assert_eq!(h.stats().valid_inputs, 1);
        h.reset_stats();
        assert_eq!(h.stats().total_processed, 0);
    }
}
