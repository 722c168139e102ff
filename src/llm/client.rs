//! OpenAI-compatible chat completion client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::common::errors::{ArenaError, Result};
use crate::common::traits::CompletionClient;
use crate::config::types::LlmConfig;

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Completion client for any `/chat/completions` endpoint
///
/// Works against vLLM, llama.cpp server, OpenAI and similar. The API key is
/// optional since self-hosted servers usually ignore it.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    config: LlmConfig,
    url: String,
}

impl OpenAiCompatClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ArenaError::Internal(e.to_string()))?;
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            url,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    #[instrument(skip_all)]
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, "Sending completion request to {}", self.url);
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArenaError::InvalidResponse(format!(
                "completion endpoint returned status {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ArenaError::InvalidResponse("completion had no choices".to_string()))?;
        debug!(finish_reason = ?choice.finish_reason, "Completion received");

        choice
            .message
            .content
            .ok_or_else(|| ArenaError::InvalidResponse("completion had no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            base_url: format!("{}/v1/", server.uri()),
            model: "test-model".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "max_tokens": 500,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "usr"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "{\"action\": \"HOLD\"}"}, "finish_reason": "stop"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config_for(&server)).unwrap();
        let text = client.complete("sys", "usr").await.unwrap();
        assert_eq!(text, "{\"action\": \"HOLD\"}");
    }

    #[tokio::test]
    async fn test_bearer_sent_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.api_key = Some("sk-test".to_string());
        let client = OpenAiCompatClient::new(config).unwrap();
        assert_eq!(client.complete("a", "b").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_error_status_and_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        let client = OpenAiCompatClient::new(config_for(&server)).unwrap();
        let err = client.complete("a", "b").await.unwrap_err();
        assert!(err.to_string().contains("503"));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;
        let client = OpenAiCompatClient::new(config_for(&server)).unwrap();
        assert!(client.complete("a", "b").await.is_err());
    }
}
