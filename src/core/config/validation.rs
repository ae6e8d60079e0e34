use serde_json::{Map, Value};

use crate::core::errors::ApiError;

const OUTPUT_CHANNELS: [&str; 4] = ["console", "file", "json", "none"];

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(app) = expect_optional_object(root, "app")? {
        validate_optional_string_field(app, "app.name", "name")?;
        validate_optional_string_field(app, "app.default_session_id", "default_session_id")?;
    }

    if let Some(input) = expect_optional_object(root, "input")? {
        validate_u64_field(input, "input.max_input_length", "max_input_length", 1, 1_000_000)?;
        validate_u64_field(input, "input.min_input_length", "min_input_length", 1, 1_000)?;
        validate_bool_field(input, "input.enhance_context", "enhance_context")?;

        let min = input.get("min_input_length").and_then(Value::as_u64);
        let max = input.get("max_input_length").and_then(Value::as_u64);
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ApiError::BadRequest(
                    "Invalid config at 'input': min_input_length exceeds max_input_length"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(
            retrieval,
            "retrieval.max_context_length",
            "max_context_length",
            1,
            1_000_000,
        )?;
        validate_bool_field(retrieval, "retrieval.use_database", "use_database")?;
        validate_bool_field(retrieval, "retrieval.use_web", "use_web")?;
        validate_bool_field(retrieval, "retrieval.use_llm_fallback", "use_llm_fallback")?;
    }

    if let Some(agent) = expect_optional_object(root, "agent")? {
        validate_u64_field(agent, "agent.max_iterations", "max_iterations", 1, 50)?;
        validate_f64_field(agent, "agent.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(agent, "agent.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_u64_field(agent, "agent.history_capacity", "history_capacity", 2, 100_000)?;
    }

    if let Some(output) = expect_optional_object(root, "output")? {
        validate_u64_field(
            output,
            "output.max_display_length",
            "max_display_length",
            1,
            10_000_000,
        )?;
        validate_bool_field(output, "output.include_metadata", "include_metadata")?;
        validate_bool_field(output, "output.format_code", "format_code")?;
        if let Some(channel) = output.get("default_channel") {
            let valid = channel
                .as_str()
                .map(|c| OUTPUT_CHANNELS.contains(&c))
                .unwrap_or(false);
            if !valid {
                return Err(ApiError::BadRequest(format!(
                    "Invalid config at 'output.default_channel': expected one of {}",
                    OUTPUT_CHANNELS.join(", ")
                )));
            }
        }
    }

    if let Some(monitoring) = expect_optional_object(root, "monitoring")? {
        validate_u64_field(
            monitoring,
            "monitoring.history_capacity",
            "history_capacity",
            1,
            1_000_000,
        )?;
        validate_bool_field(monitoring, "monitoring.save_to_file", "save_to_file")?;
        for key in ["min_success_rate", "warn_success_rate"] {
            validate_f64_field(monitoring, &format!("monitoring.{}", key), key, 0.0, 1.0)?;
        }
        for key in ["max_avg_response_time", "warn_avg_response_time"] {
            validate_f64_field(monitoring, &format!("monitoring.{}", key), key, 0.0, 86_400.0)?;
        }
        for key in ["max_consecutive_failures", "max_api_errors"] {
            validate_u64_field(monitoring, &format!("monitoring.{}", key), key, 1, 1_000_000)?;
        }
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_f64_field(llm, "llm.fallback_temperature", "fallback_temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_output_tokens", "max_output_tokens", 1, 1_000_000)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(search) = expect_optional_object(root, "search")? {
        validate_optional_string_field(search, "search.base_url", "base_url")?;
        validate_optional_string_field(search, "search.api_key", "api_key")?;
        validate_optional_string_field(search, "search.search_depth", "search_depth")?;
        validate_u64_field(search, "search.max_results", "max_results", 1, 20)?;
        validate_u64_field(search, "search.timeout_secs", "timeout_secs", 1, 600)?;
        validate_u64_field(search, "search.display_results", "display_results", 1, 20)?;
        validate_u64_field(search, "search.snippet_chars", "snippet_chars", 1, 100_000)?;
        validate_bool_field(search, "search.include_answer", "include_answer")?;
        validate_string_array_field(search, "search.include_domains", "include_domains")?;
    }

    if let Some(store) = expect_optional_object(root, "vector_store")? {
        validate_optional_string_field(store, "vector_store.url", "url")?;
        validate_u64_field(
            store,
            "vector_store.results_per_collection",
            "results_per_collection",
            1,
            100,
        )?;
        validate_u64_field(store, "vector_store.top_k", "top_k", 1, 100)?;
        validate_u64_field(
            store,
            "vector_store.max_document_chars",
            "max_document_chars",
            1,
            1_000_000,
        )?;
        validate_bool_field(store, "vector_store.embed_queries", "embed_queries")?;
        validate_u64_field(store, "vector_store.timeout_secs", "timeout_secs", 1, 600)?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
