use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::config::LlmSettings;
use crate::core::errors::ApiError;

const MAX_ERROR_BODY_CHARS: usize = 300;

/// Google Gemini over the public `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    model: String,
    embedding_model: String,
    api_key: Option<String>,
    client: Client,
}

impl GeminiProvider {
    pub fn new(settings: &LlmSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            embedding_model: settings.embedding_model.clone(),
            api_key: settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, ApiError> {
        self.api_key.as_deref().ok_or_else(|| {
            ApiError::ServiceUnavailable("GEMINI_API_KEY is not configured".to_string())
        })
    }

    fn endpoint(&self, model: &str, action: &str, key: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url,
            model,
            action,
            urlencoding::encode(key)
        )
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ApiError> {
        let res = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest("gemini", e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(ApiError::Upstream(format!(
                "Gemini API error ({}): {}",
                status, snippet
            )));
        }

        res.json::<Value>()
            .await
            .map_err(|e| ApiError::from_reqwest("gemini", e))
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Embedding>,
}

#[derive(Deserialize)]
struct Embedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(false);
        };
        let url = format!(
            "{}/models/{}?key={}",
            self.base_url,
            self.model,
            urlencoding::encode(key)
        );
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let key = self.api_key()?;
        let (system, contents) = build_contents(&request.messages);

        let mut generation_config = serde_json::Map::new();
        if let Some(t) = request.temperature {
            generation_config.insert("temperature".to_string(), json!(t));
        }
        if let Some(m) = request.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(m));
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if let (Some(system), Some(obj)) = (system, body.as_object_mut()) {
            obj.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": system }] }),
            );
        }

        let url = self.endpoint(&self.model, "generateContent", key);
        let payload = self.post_json(&url, &body).await?;
        let response: GenerateResponse =
            serde_json::from_value(payload).map_err(ApiError::internal)?;

        let text = extract_text(&response);
        if text.trim().is_empty() {
            let reason = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            tracing::warn!("Gemini returned no text (reason: {})", reason);
            return Err(ApiError::Upstream(format!(
                "Gemini returned an empty response ({})",
                reason
            )));
        }
        Ok(text)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.api_key()?;
        let model_ref = format!("models/{}", self.embedding_model);
        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": model_ref,
                    "content": { "parts": [{ "text": text }] }
                })
            })
            .collect();

        let url = self.endpoint(&self.embedding_model, "batchEmbedContents", key);
        let payload = self.post_json(&url, &json!({ "requests": requests })).await?;
        let response: BatchEmbedResponse =
            serde_json::from_value(payload).map_err(ApiError::internal)?;

        if response.embeddings.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "Gemini returned {} embeddings for {} inputs",
                response.embeddings.len(),
                inputs.len()
            )));
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

fn extract_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

/// Splits chat messages into Gemini's system instruction and turn list.
///
/// Leading system messages become the instruction; later ones are sent as
/// user turns. Consecutive turns with the same role are merged.
fn build_contents(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut turns: Vec<(&'static str, String)> = Vec::new();
    let mut leading = true;

    for message in messages {
        if leading && message.role == "system" {
            system_parts.push(&message.content);
            continue;
        }
        leading = false;

        let role = match message.role.as_str() {
            "assistant" | "model" => "model",
            _ => "user",
        };
        match turns.last_mut() {
            Some((last_role, text)) if *last_role == role => {
                text.push_str("\n\n");
                text.push_str(&message.content);
            }
            _ => turns.push((role, message.content.clone())),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    let contents = turns
        .into_iter()
        .map(|(role, text)| json!({ "role": role, "parts": [{ "text": text }] }))
        .collect();
    (system, contents)
}
