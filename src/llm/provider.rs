use async_trait::async_trait;

use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// return the model used for completions
    fn model(&self) -> &str;

    /// check if the provider is configured and reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// chat completion; an empty completion is an error
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;

    /// generate embeddings
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    /// single-prompt completion
    async fn generate(
        &self,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, ApiError> {
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(temperature)
            .with_max_tokens(max_tokens);
        let text = self.chat(request).await?;
        if text.trim().is_empty() {
            return Err(ApiError::Upstream(format!(
                "{} returned an empty response",
                self.name()
            )));
        }
        Ok(text)
    }
}
