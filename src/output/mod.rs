use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::config::OutputSettings;
use crate::core::errors::ApiError;
use crate::input::code_spans::FENCED_CODE_PATTERN;
use crate::input::QueryType;
use crate::pipeline::ResponseRecord;

const TRUNCATION_NOTICE: &str = "\n\n**[Response truncated - ask for continuation if needed]**";
const HANDLER_VERSION: &str = "ragbot_output_v1";

const TROUBLESHOOTING: [&str; 4] = [
    "Try rephrasing your question",
    "Ensure your query is clear and specific",
    "Check for any special characters that might cause issues",
    "If the problem persists, try a simpler version of your question",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputChannel {
    Console,
    File,
    Json,
    None,
}

impl OutputChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputChannel::Console => "console",
            OutputChannel::File => "file",
            OutputChannel::Json => "json",
            OutputChannel::None => "none",
        }
    }
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputChannel {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(OutputChannel::Console),
            "file" => Ok(OutputChannel::File),
            "json" => Ok(OutputChannel::Json),
            "none" | "" => Ok(OutputChannel::None),
            other => Err(ApiError::BadRequest(format!(
                "Unknown output channel `{}`. Expected console, file, json or none",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmitResult {
    pub success: bool,
    pub channel: OutputChannel,
    pub formatted_output: String,
    pub output_length: usize,
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputStats {
    pub total_outputs_processed: u64,
    pub successful_outputs: u64,
    pub failed_outputs: u64,
    pub success_rate: f64,
    pub max_display_length: usize,
    pub include_metadata: bool,
    pub format_code: bool,
}

/// Turns response records into user-facing markdown and delivers them.
pub struct OutputHandler {
    settings: OutputSettings,
    output_dir: PathBuf,
    code_fence: Regex,
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
}

impl OutputHandler {
    pub fn new(settings: OutputSettings, output_dir: PathBuf) -> Result<Self, ApiError> {
        Ok(Self {
            settings,
            output_dir,
            code_fence: Regex::new(FENCED_CODE_PATTERN).map_err(ApiError::internal)?,
            total: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    pub fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    pub fn default_channel(&self) -> OutputChannel {
        self.settings
            .default_channel
            .parse()
            .unwrap_or(OutputChannel::None)
    }

    pub fn format(&self, record: &ResponseRecord) -> String {
        if record.success {
            self.format_success(record)
        } else {
            self.format_error(record)
        }
    }

    fn format_success(&self, record: &ResponseRecord) -> String {
        let text = if record.response.trim().is_empty() {
            "Response generated successfully."
        } else {
            record.response.as_str()
        };

        let mut body = match record.metadata.query_type {
            Some(query_type) => decorate(text, query_type),
            None => text.to_string(),
        };
        if self.settings.format_code {
            body = self.beautify_code_blocks(&body);
        }
        if body.chars().count() > self.settings.max_display_length {
            body = body.chars().take(self.settings.max_display_length).collect();
            body.push_str(TRUNCATION_NOTICE);
        }

        let mut out = format!("✅ **Response**\n\n{}\n\n", body);
        if self.settings.include_metadata {
            let summary = metadata_summary(record);
            if !summary.is_empty() {
                out.push_str("---\n**📊 Response Details:**\n");
                out.push_str(&summary);
            }
        }
        out
    }

    fn format_error(&self, record: &ResponseRecord) -> String {
        let issue = if record.response.trim().is_empty() {
            "An unknown error occurred."
        } else {
            record.response.as_str()
        };
        let details = record
            .error
            .as_deref()
            .unwrap_or("No additional error details available.");

        let mut out = format!("❌ **Error Response**\n\n**Issue:** {}\n\n", issue);
        if details != issue {
            out.push_str(&format!("**Details:** {}\n\n", details));
        }
        out.push_str("**💡 Troubleshooting Suggestions:**\n");
        for tip in TROUBLESHOOTING {
            out.push_str(&format!("- {}\n", tip));
        }
        out.push('\n');

        let summary = metadata_summary(record);
        if !summary.is_empty() {
            out.push_str("**📊 Technical Details:**\n");
            out.push_str(&summary);
        }
        out
    }

    /// Puts a language header above each fenced block. Blocks that already
    /// carry one are left alone.
    pub fn beautify_code_blocks(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 64);
        let mut last = 0;

        for caps in self.code_fence.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            if text[..whole.start()].ends_with("Code:**\n") {
                out.push_str(whole.as_str());
                continue;
            }

            let code = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            match caps.get(1).map(|m| m.as_str()) {
                Some(language) => out.push_str(&format!(
                    "\n{} **{} Code:**\n```{}\n{}\n```\n",
                    language_emoji(language),
                    title_case(language),
                    language,
                    code
                )),
                None => out.push_str(&format!("\n💻 **Code:**\n```\n{}\n```\n", code)),
            }
        }
        out.push_str(&text[last..]);
        out
    }

    /// Formats the record and delivers it on `channel`. Delivery failures are
    /// reported in the result, never raised.
    pub fn emit(&self, record: &ResponseRecord, channel: OutputChannel) -> EmitResult {
        let started = Instant::now();
        self.total.fetch_add(1, Ordering::Relaxed);

        let formatted = self.format(record);
        let delivered = match channel {
            OutputChannel::Console => {
                println!("{}", formatted);
                Ok(None)
            }
            OutputChannel::File => self.save_to_file(record, &formatted).map(Some),
            OutputChannel::Json => self.print_json(record, &formatted).map(|_| None),
            OutputChannel::None => Ok(None),
        };
        let processing_time = started.elapsed().as_secs_f64();

        match delivered {
            Ok(path) => {
                self.successful.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    channel = %channel,
                    "Output handled in {:.3}s",
                    processing_time
                );
                EmitResult {
                    success: true,
                    channel,
                    output_length: formatted.chars().count(),
                    formatted_output: formatted,
                    processing_time,
                    path,
                    error: None,
                }
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(channel = %channel, "Failed to deliver output: {}", err);
                EmitResult {
                    success: false,
                    channel,
                    output_length: formatted.chars().count(),
                    formatted_output: formatted,
                    processing_time,
                    path: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn save_to_file(&self, record: &ResponseRecord, formatted: &str) -> Result<PathBuf, ApiError> {
        std::fs::create_dir_all(&self.output_dir).map_err(ApiError::internal)?;
        let raw = serde_json::to_string_pretty(record).map_err(ApiError::internal)?;
        let short_id: String = record.metadata.request_id.chars().take(8).collect();
        let filename = format!(
            "output_{}_{}.txt",
            Utc::now().format("%Y%m%d_%H%M%S"),
            short_id
        );
        let path = self.output_dir.join(filename);
        let contents = format!(
            "{}\n\n{}\nRaw Response Data:\n{}",
            formatted,
            "=".repeat(50),
            raw
        );
        std::fs::write(&path, contents).map_err(ApiError::internal)?;
        tracing::info!("Output saved to file: {}", path.display());
        Ok(path)
    }

    fn print_json(&self, record: &ResponseRecord, formatted: &str) -> Result<(), ApiError> {
        let envelope = json!({
            "formatted_response": formatted,
            "raw_data": record,
            "handler_metadata": {
                "timestamp": Utc::now().to_rfc3339(),
                "output_handler_version": HANDLER_VERSION,
            }
        });
        let text = serde_json::to_string_pretty(&envelope).map_err(ApiError::internal)?;
        println!("{}", text);
        Ok(())
    }

    pub fn stats(&self) -> OutputStats {
        let total = self.total.load(Ordering::Relaxed);
        let successful = self.successful.load(Ordering::Relaxed);
        OutputStats {
            total_outputs_processed: total,
            successful_outputs: successful,
            failed_outputs: self.failed.load(Ordering::Relaxed),
            success_rate: successful as f64 / total.max(1) as f64 * 100.0,
            max_display_length: self.settings.max_display_length,
            include_metadata: self.settings.include_metadata,
            format_code: self.settings.format_code,
        }
    }

    pub fn reset_stats(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.successful.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

/// Adds the category header for `query_type` unless the text already has one.
pub fn decorate(text: &str, query_type: QueryType) -> String {
    match query_type {
        QueryType::Debugging => {
            if text.starts_with("🐛") || text.contains("**Problem:**") || text.contains("**Solution:**")
            {
                text.to_string()
            } else {
                format!("🐛 **Debug Analysis:**\n\n{}", text)
            }
        }
        QueryType::Explanation if !text.starts_with("📚") => {
            format!("📚 **Explanation:**\n\n{}", text)
        }
        QueryType::Comparison if !text.starts_with("⚖️") => {
            let lower = text.to_lowercase();
            if lower.contains("vs") || lower.contains("difference") {
                format!("⚖️ **Comparison:**\n\n{}", text)
            } else {
                text.to_string()
            }
        }
        QueryType::DsaProblem if !text.starts_with("🔬") => {
            format!("🔬 **Algorithm Analysis:**\n\n{}", text)
        }
        _ => text.to_string(),
    }
}

fn language_emoji(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "python" => "🐍",
        "javascript" => "💛",
        "java" => "☕",
        "cpp" | "c++" => "⚙️",
        "html" => "🌐",
        "css" => "🎨",
        "sql" => "🗃️",
        _ => "💻",
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn metadata_summary(record: &ResponseRecord) -> String {
    let meta = &record.metadata;
    let mut lines = vec![format!(
        "⏱️ **Processing Time:** {:.2}s",
        meta.total_processing_time
    )];
    if !meta.sources_used.is_empty() {
        let sources: Vec<&str> = meta.sources_used.iter().map(|s| s.as_str()).collect();
        lines.push(format!("📚 **Sources:** {}", sources.join(", ")));
    }
    if let Some(query_type) = meta.query_type {
        lines.push(format!("🏷️ **Query Type:** {}", query_type));
    }
    if !record.session_id.is_empty() {
        lines.push(format!("💬 **Session:** {}", record.session_id));
    }
    lines.push(format!(
        "📅 **Time:** {}",
        meta.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.join("\n")
}
