use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::core::config::MonitoringSettings;
use crate::core::errors::ApiError;
use crate::pipeline::ResponseRecord;

const TREND_WINDOW: usize = 10;
const TREND_CAPACITY: usize = 50;
const RECENT_QUERIES: usize = 10;
const API_ERROR_RATE_LIMIT: f64 = 0.3;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,
    pub total_response_time: f64,
    pub avg_response_time: f64,
    pub min_response_time: Option<f64>,
    pub max_response_time: f64,
    pub api_calls: BTreeMap<String, u64>,
    pub query_types: BTreeMap<String, u64>,
    pub error_types: BTreeMap<String, u64>,
    pub context_sources_used: BTreeMap<String, u64>,
}

impl Metrics {
    fn success_ratio(&self) -> Option<f64> {
        (self.total_queries > 0).then(|| self.successful_queries as f64 / self.total_queries as f64)
    }

    fn api_failures(&self) -> u64 {
        ["timeout", "api_error", "network_error"]
            .iter()
            .filter_map(|k| self.error_types.get(*k))
            .sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRecord {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub processing_time: f64,
    pub query_type: String,
    pub context_sources: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HourlyStats {
    pub queries: u64,
    pub success: u64,
    pub fail: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceTrends {
    pub response_time_trend: Vec<f64>,
    pub success_rate_trend: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseTimeStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusDetails {
    pub response_time: ResponseTimeStats,
    pub query_types: BTreeMap<String, u64>,
    pub error_types: BTreeMap<String, u64>,
    pub context_sources: BTreeMap<String, u64>,
    pub recent_queries: Vec<QueryRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub uptime_formatted: String,
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,
    /// Percentage in `[0, 100]`.
    pub success_rate: f64,
    pub avg_response_time: f64,
    pub consecutive_failures: u64,
    pub api_calls: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall_healthy: bool,
    pub timestamp: DateTime<Utc>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    pub monitoring_started: DateTime<Utc>,
    pub duration_hours: f64,
    pub metrics: Metrics,
    pub trends: PerformanceTrends,
    pub hourly_breakdown: BTreeMap<String, HourlyStats>,
    pub top_error_types: Vec<(String, u64)>,
    pub recommendations: Vec<String>,
}

struct MonitorState {
    started_at: DateTime<Utc>,
    metrics: Metrics,
    history: VecDeque<QueryRecord>,
    response_times: VecDeque<f64>,
    hourly: BTreeMap<String, HourlyStats>,
    consecutive_failures: u64,
    trends: PerformanceTrends,
}

impl MonitorState {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            metrics: Metrics::default(),
            history: VecDeque::new(),
            response_times: VecDeque::new(),
            hourly: BTreeMap::new(),
            consecutive_failures: 0,
            trends: PerformanceTrends::default(),
        }
    }
}

/// Aggregates per-request outcomes. All state sits behind one lock so a
/// reader never sees counters from two different updates.
pub struct Monitor {
    state: Mutex<MonitorState>,
    settings: MonitoringSettings,
    metrics_dir: PathBuf,
}

impl Monitor {
    pub fn new(settings: MonitoringSettings, metrics_dir: PathBuf) -> Self {
        tracing::info!(
            history_capacity = settings.history_capacity,
            save_to_file = settings.save_to_file,
            "Monitoring initialized"
        );
        Self {
            state: Mutex::new(MonitorState::new()),
            settings,
            metrics_dir,
        }
    }

    pub fn settings(&self) -> &MonitoringSettings {
        &self.settings
    }

    pub fn record(&self, record: &ResponseRecord) -> Result<(), ApiError> {
        let now = Utc::now();
        let capacity = self.settings.history_capacity.max(1);
        let query_type = record
            .metadata
            .query_type
            .map(|q| q.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let sources: Vec<String> = record
            .metadata
            .sources_used
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let processing_time = record.metadata.total_processing_time;

        let dump = {
            let mut state = self.state.lock().map_err(ApiError::internal)?;
            let metrics = &mut state.metrics;

            metrics.total_queries += 1;
            if record.success {
                metrics.successful_queries += 1;
            } else {
                metrics.failed_queries += 1;
                let category = categorize_error(record.error.as_deref().unwrap_or("Unknown"));
                *metrics.error_types.entry(category.to_string()).or_default() += 1;
            }

            if processing_time > 0.0 {
                metrics.total_response_time += processing_time;
                metrics.min_response_time = Some(
                    metrics
                        .min_response_time
                        .map_or(processing_time, |m| m.min(processing_time)),
                );
                metrics.max_response_time = metrics.max_response_time.max(processing_time);
            }
            metrics.avg_response_time = metrics.total_response_time / metrics.total_queries as f64;

            for source in &sources {
                *metrics.context_sources_used.entry(source.clone()).or_default() += 1;
                if let Some(api) = api_for_source(source) {
                    *metrics.api_calls.entry(api.to_string()).or_default() += 1;
                }
            }
            if !sources.is_empty() {
                *metrics.api_calls.entry("total".to_string()).or_default() += sources.len() as u64;
            }
            *metrics.query_types.entry(query_type.clone()).or_default() += 1;

            if record.success {
                state.consecutive_failures = 0;
            } else {
                state.consecutive_failures += 1;
            }

            if processing_time > 0.0 {
                state.response_times.push_back(processing_time);
                while state.response_times.len() > capacity {
                    state.response_times.pop_front();
                }
            }
            state.history.push_back(QueryRecord {
                timestamp: now,
                success: record.success,
                processing_time,
                query_type,
                context_sources: sources,
                error: (!record.success).then(|| record.error.clone()).flatten(),
            });
            while state.history.len() > capacity {
                state.history.pop_front();
            }

            let hour = state
                .hourly
                .entry(now.format("%Y-%m-%d_%H").to_string())
                .or_default();
            hour.queries += 1;
            if record.success {
                hour.success += 1;
            } else {
                hour.fail += 1;
            }

            update_trends(&mut state);
            tracing::debug!("Metrics updated for query #{}", state.metrics.total_queries);

            self.settings.save_to_file.then(|| {
                json!({
                    "timestamp": now.to_rfc3339(),
                    "metrics": state.metrics,
                    "hourly_stats": state.hourly,
                    "initialization_time": state.started_at.to_rfc3339(),
                })
            })
        };

        if let Some(dump) = dump {
            if let Err(err) = write_json(&self.metrics_dir.join("metrics.json"), &dump) {
                tracing::warn!("Failed to save metrics to file: {}", err);
            }
        }
        Ok(())
    }

    pub fn status(&self, detailed: bool) -> Result<StatusSnapshot, ApiError> {
        let state = self.state.lock().map_err(ApiError::internal)?;
        let now = Utc::now();
        let uptime = (now - state.started_at).num_seconds().max(0);
        let metrics = &state.metrics;

        let details = detailed.then(|| StatusDetails {
            response_time: ResponseTimeStats {
                min: metrics.min_response_time.unwrap_or(0.0),
                max: metrics.max_response_time,
                avg: metrics.avg_response_time,
            },
            query_types: metrics.query_types.clone(),
            error_types: metrics.error_types.clone(),
            context_sources: metrics.context_sources_used.clone(),
            recent_queries: state
                .history
                .iter()
                .skip(state.history.len().saturating_sub(RECENT_QUERIES))
                .cloned()
                .collect(),
        });

        let snapshot = StatusSnapshot {
            timestamp: now,
            uptime_seconds: uptime,
            uptime_formatted: format_uptime(uptime),
            total_queries: metrics.total_queries,
            successful_queries: metrics.successful_queries,
            failed_queries: metrics.failed_queries,
            success_rate: metrics.successful_queries as f64 / metrics.total_queries.max(1) as f64
                * 100.0,
            avg_response_time: metrics.avg_response_time,
            consecutive_failures: state.consecutive_failures,
            api_calls: metrics.api_calls.clone(),
            details,
        };

        tracing::info!(
            uptime = %snapshot.uptime_formatted,
            total_queries = snapshot.total_queries,
            consecutive_failures = snapshot.consecutive_failures,
            "Monitoring status: {:.1}% success, {:.2}s avg",
            snapshot.success_rate,
            snapshot.avg_response_time
        );
        Ok(snapshot)
    }

    pub fn health(&self) -> Result<HealthReport, ApiError> {
        let state = self.state.lock().map_err(ApiError::internal)?;
        let metrics = &state.metrics;
        let thresholds = &self.settings;
        let mut issues = Vec::new();
        let mut warnings = Vec::new();
        let mut recommendations = Vec::new();

        if let Some(rate) = metrics.success_ratio() {
            if rate < thresholds.min_success_rate {
                issues.push(format!(
                    "Success rate {:.1}% below threshold {:.1}%",
                    rate * 100.0,
                    thresholds.min_success_rate * 100.0
                ));
            } else if rate < thresholds.warn_success_rate {
                warnings.push(format!(
                    "Success rate {:.1}% is concerning (below {:.0}%)",
                    rate * 100.0,
                    thresholds.warn_success_rate * 100.0
                ));
            }
        }

        if metrics.avg_response_time > thresholds.max_avg_response_time {
            issues.push(format!(
                "Avg response time {:.2}s exceeds {}s",
                metrics.avg_response_time, thresholds.max_avg_response_time
            ));
        } else if metrics.avg_response_time > thresholds.warn_avg_response_time {
            warnings.push(format!(
                "Avg response time {:.2}s is slow (above {}s)",
                metrics.avg_response_time, thresholds.warn_avg_response_time
            ));
        }

        if state.consecutive_failures >= thresholds.max_consecutive_failures {
            issues.push(format!(
                "Too many consecutive failures: {}",
                state.consecutive_failures
            ));
        }

        let api_failures = metrics.api_failures();
        if api_failures >= thresholds.max_api_errors {
            issues.push(format!("Too many API errors: {}", api_failures));
        }
        let api_calls = metrics.api_calls.get("total").copied().unwrap_or(0);
        if api_calls > 0 {
            let error_rate = api_failures as f64 / api_calls as f64;
            if error_rate > API_ERROR_RATE_LIMIT {
                issues.push(format!("High API error rate: {:.1}%", error_rate * 100.0));
            }
        }

        if metrics.total_queries > 0 {
            let unknown = metrics.query_types.get("unknown").copied().unwrap_or(0);
            if unknown as f64 / metrics.total_queries as f64 > 0.2 {
                recommendations.push("Consider improving query type detection".to_string());
            }
            if metrics.context_sources_used.is_empty() {
                recommendations.push(
                    "No context sources being used - check search functionality".to_string(),
                );
            }
        }

        let report = HealthReport {
            overall_healthy: issues.is_empty(),
            timestamp: Utc::now(),
            issues,
            warnings,
            recommendations,
        };

        tracing::info!("Health check completed - healthy: {}", report.overall_healthy);
        for issue in &report.issues {
            tracing::warn!("Health issue: {}", issue);
        }
        for warning in &report.warnings {
            tracing::warn!("Health warning: {}", warning);
        }
        Ok(report)
    }

    pub fn performance_report(&self) -> Result<PerformanceReport, ApiError> {
        let state = self.state.lock().map_err(ApiError::internal)?;
        let now = Utc::now();

        let mut top_error_types: Vec<(String, u64)> = state
            .metrics
            .error_types
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        top_error_types.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        top_error_types.truncate(5);

        Ok(PerformanceReport {
            generated_at: now,
            monitoring_started: state.started_at,
            duration_hours: (now - state.started_at).num_milliseconds() as f64 / 3_600_000.0,
            metrics: state.metrics.clone(),
            trends: state.trends.clone(),
            hourly_breakdown: state.hourly.clone(),
            top_error_types,
            recommendations: recommendations(&state.metrics),
        })
    }

    /// Clears every counter. When file output is on, the previous state is
    /// written to a backup first and its path returned.
    pub fn reset(&self) -> Result<Option<PathBuf>, ApiError> {
        let mut state = self.state.lock().map_err(ApiError::internal)?;

        let backup = if self.settings.save_to_file {
            let path = self
                .metrics_dir
                .join(format!("metrics_backup_{}.json", file_stamp()));
            let data = json!({
                "reset_timestamp": Utc::now().to_rfc3339(),
                "final_metrics": state.metrics,
                "query_history": state.history,
                "hourly_stats": state.hourly,
            });
            match write_json(&path, &data) {
                Ok(()) => {
                    tracing::info!("Metrics backed up to {}", path.display());
                    Some(path)
                }
                Err(err) => {
                    tracing::warn!("Failed to backup metrics: {}", err);
                    None
                }
            }
        } else {
            None
        };

        *state = MonitorState::new();
        tracing::info!("All metrics reset");
        Ok(backup)
    }

    pub fn export(&self) -> Result<PathBuf, ApiError> {
        let data = {
            let state = self.state.lock().map_err(ApiError::internal)?;
            json!({
                "export_timestamp": Utc::now().to_rfc3339(),
                "metrics": state.metrics,
                "query_history": state.history,
                "hourly_stats": state.hourly,
                "performance_trends": state.trends,
                "health_thresholds": self.settings,
            })
        };
        let path = self
            .metrics_dir
            .join(format!("monitoring_export_{}.json", file_stamp()));
        write_json(&path, &data)?;
        tracing::info!("Monitoring data exported to {}", path.display());
        Ok(path)
    }
}

/// Maps an error string onto a coarse category by keyword, first match wins.
pub fn categorize_error(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.starts_with("timeout:") {
        return "timeout";
    }
    if lower.starts_with("network connection failed:") {
        return "network_error";
    }
    if lower.starts_with("api error:") || lower.starts_with("service unavailable:") {
        return "api_error";
    }

    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(&["timeout", "time"]) {
        "timeout"
    } else if has(&["api", "key"]) {
        "api_error"
    } else if has(&["agent"]) {
        "agent_error"
    } else if has(&["network", "connection"]) {
        "network_error"
    } else if has(&["validation", "input"]) {
        "input_error"
    } else {
        "other"
    }
}

fn api_for_source(source: &str) -> Option<&'static str> {
    match source {
        "web" => Some("tavily"),
        "ai_fallback" => Some("gemini_fallback"),
        "database" => Some("database"),
        _ => None,
    }
}

fn update_trends(state: &mut MonitorState) {
    if state.response_times.len() >= TREND_WINDOW {
        let recent: f64 = state.response_times.iter().rev().take(TREND_WINDOW).sum();
        push_bounded(
            &mut state.trends.response_time_trend,
            recent / TREND_WINDOW as f64,
        );
    }
    if state.metrics.total_queries >= TREND_WINDOW as u64 {
        if let Some(rate) = state.metrics.success_ratio() {
            push_bounded(&mut state.trends.success_rate_trend, rate);
        }
    }
}

fn push_bounded(values: &mut Vec<f64>, value: f64) {
    values.push(value);
    if values.len() > TREND_CAPACITY {
        values.remove(0);
    }
}

fn recommendations(metrics: &Metrics) -> Vec<String> {
    let mut out = Vec::new();
    if metrics.avg_response_time > 10.0 {
        out.push(
            "Consider optimizing response times - current average is above 10 seconds".to_string(),
        );
    }
    let total = metrics.total_queries.max(1) as f64;
    if metrics.total_queries > 0 {
        let per_query = metrics.api_calls.get("total").copied().unwrap_or(0) as f64 / total;
        if per_query > 2.0 {
            out.push("High API usage per query - consider caching or optimization".to_string());
        }
    }
    if metrics.failed_queries as f64 / total > 0.2 {
        out.push(
            "High failure rate - investigate error patterns and improve error handling".to_string(),
        );
    }
    if metrics.context_sources_used.is_empty() {
        out.push(
            "No context sources being utilized - verify search and database connectivity"
                .to_string(),
        );
    }
    out
}

fn format_uptime(seconds: i64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, secs)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    }
}

fn file_stamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(ApiError::internal)?;
    }
    let text = serde_json::to_string_pretty(value).map_err(ApiError::internal)?;
    std::fs::write(path, text).map_err(ApiError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::QueryType;
    use crate::pipeline::ResponseMetadata;
    use crate::retrieval::ContextSource;

    fn outcome(success: bool, seconds: f64, error: Option<&str>) -> ResponseRecord {
        ResponseRecord {
            query: "q".to_string(),
            response: "r".to_string(),
            success,
            source: "test".to_string(),
            session_id: "s1".to_string(),
            error: error.map(str::to_string),
            metadata: ResponseMetadata {
                query_type: Some(QueryType::Explanation),
                total_processing_time: seconds,
                sources_used: vec![ContextSource::Database, ContextSource::Web],
                ..ResponseMetadata::default()
            },
        }
    }

    fn monitor(dir: &Path, settings: MonitoringSettings) -> Monitor {
        Monitor::new(settings, dir.to_path_buf())
    }

    #[test]
    fn counts_successes_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = monitor(dir.path(), MonitoringSettings::default());

        for _ in 0..3 {
            monitor.record(&outcome(true, 2.0, None)).unwrap();
        }
        monitor
            .record(&outcome(false, 4.0, Some("timeout: gemini request timed out")))
            .unwrap();

        let status = monitor.status(true).unwrap();
        assert_eq!(status.total_queries, 4);
        assert_eq!(status.successful_queries, 3);
        assert_eq!(status.failed_queries, 1);
        assert_eq!(status.success_rate, 75.0);
        assert_eq!(status.avg_response_time, 2.5);
        assert_eq!(status.consecutive_failures, 1);
        assert_eq!(status.api_calls["tavily"], 4);
        assert_eq!(status.api_calls["database"], 4);
        assert_eq!(status.api_calls["total"], 8);

        let details = status.details.unwrap();
        assert_eq!(details.response_time.min, 2.0);
        assert_eq!(details.response_time.max, 4.0);
        assert_eq!(details.error_types["timeout"], 1);
        assert_eq!(details.query_types["explanation"], 4);
        assert_eq!(details.recent_queries.len(), 4);

        assert!(dir.path().join("metrics.json").exists());
    }

    #[test]
    fn health_flags_consecutive_failures() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = monitor(dir.path(), MonitoringSettings::default());

        monitor.record(&outcome(true, 1.0, None)).unwrap();
        assert!(monitor.health().unwrap().overall_healthy);

        for _ in 0..5 {
            monitor
                .record(&outcome(false, 1.0, Some("agent loop broke")))
                .unwrap();
        }
        let health = monitor.health().unwrap();
        assert!(!health.overall_healthy);
        assert!(health
            .issues
            .iter()
            .any(|i| i == "Too many consecutive failures: 5"));
        assert!(health.issues.iter().any(|i| i.starts_with("Success rate 16.7%")));

        monitor.record(&outcome(true, 1.0, None)).unwrap();
        assert_eq!(monitor.status(false).unwrap().consecutive_failures, 0);
    }

    #[test]
    fn slow_responses_warn_then_fail() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = monitor(dir.path(), MonitoringSettings::default());

        monitor.record(&outcome(true, 12.0, None)).unwrap();
        let health = monitor.health().unwrap();
        assert!(health.overall_healthy);
        assert_eq!(health.warnings.len(), 1);

        monitor.record(&outcome(true, 30.0, None)).unwrap();
        assert!(!monitor.health().unwrap().overall_healthy);
    }

    #[test]
    fn history_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let settings = MonitoringSettings {
            history_capacity: 3,
            save_to_file: false,
            ..MonitoringSettings::default()
        };
        let monitor = monitor(dir.path(), settings);
        for _ in 0..5 {
            monitor.record(&outcome(true, 1.0, None)).unwrap();
        }

        let status = monitor.status(true).unwrap();
        assert_eq!(status.total_queries, 5);
        assert_eq!(status.details.unwrap().recent_queries.len(), 3);
        assert!(!dir.path().join("metrics.json").exists());
    }

    #[test]
    fn reset_writes_backup_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = monitor(dir.path(), MonitoringSettings::default());
        monitor.record(&outcome(false, 1.0, Some("boom"))).unwrap();

        let backup = monitor.reset().unwrap().unwrap();
        let text = std::fs::read_to_string(backup).unwrap();
        assert!(text.contains("\"failed_queries\": 1"));

        let status = monitor.status(false).unwrap();
        assert_eq!(status.total_queries, 0);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.success_rate, 0.0);
    }

    #[test]
    fn export_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = monitor(dir.path(), MonitoringSettings::default());
        monitor
            .record(&outcome(false, 1.0, Some("api error: quota")))
            .unwrap();
        monitor
            .record(&outcome(false, 1.0, Some("api error: quota")))
            .unwrap();

        let path = monitor.export().unwrap();
        let exported: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(exported["metrics"]["total_queries"], 2);
        assert_eq!(exported["query_history"].as_array().unwrap().len(), 2);

        let report = monitor.performance_report().unwrap();
        assert_eq!(report.top_error_types, vec![("api_error".to_string(), 2)]);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.starts_with("High failure rate")));
    }

    #[test]
    fn error_categories() {
        assert_eq!(categorize_error("timeout: tavily request timed out"), "timeout");
        assert_eq!(
            categorize_error("network connection failed: gemini: https://generativelanguage.googleapis.com"),
            "network_error"
        );
        assert_eq!(categorize_error("api error: empty response"), "api_error");
        assert_eq!(
            categorize_error("service unavailable: GEMINI_API_KEY is not configured"),
            "api_error"
        );
        assert_eq!(categorize_error("The agent gave up"), "agent_error");
        assert_eq!(categorize_error("Input validation failed"), "input_error");
        assert_eq!(categorize_error("boom"), "other");
    }
}
