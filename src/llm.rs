//! Anthropic messages API client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::ports::LanguageModel;
use crate::{Error, Result};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    text: Option<String>,
}

/// Single-turn completions against the Anthropic API
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl AnthropicClient {
    /// Create a client with the default model
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: SecretString) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Anthropic API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Use a specific model
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(model = %self.model, max_tokens, "sending completion request");

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Anthropic API error");
            return Err(Error::Llm(format!("API error {status}: {body}")));
        }

        let result: MessageResponse = response.json().await?;
        let text = result
            .content
            .into_iter()
            .find_map(|c| c.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Llm("empty completion".to_string()))?;

        tracing::debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

/// Stand-in when no model is configured; every request is unavailable
///
/// Follow-ups are then skipped and categories keep their default questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineModel;

#[async_trait]
impl LanguageModel for OfflineModel {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        Err(Error::Unavailable("no language model configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_model_is_unavailable() {
        let result = OfflineModel.complete("anything", 10).await;
        assert!(matches!(result, Err(Error::Unavailable(_))));
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(AnthropicClient::new(SecretString::from(String::new())).is_err());
    }

    #[test]
    fn default_model_can_be_overridden() {
        let client = AnthropicClient::new(SecretString::from("sk-test".to_string())).unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);

        let client = client.with_model("claude-3-5-haiku-latest".to_string());
        assert_eq!(client.model(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn request_serializes_single_user_turn() {
        let request = MessageRequest {
            model: DEFAULT_MODEL,
            max_tokens: 100,
            messages: [Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 100);
    }
}
