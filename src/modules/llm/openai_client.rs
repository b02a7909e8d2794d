use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{ChatMessage, Completion, CompletionRequest};
use super::CompletionClient;
use crate::core::config::CompletionConfig;
use crate::core::error::{AppError, Result};

/// Client for any OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::ExternalServiceError("No completion API key configured".to_string())
        })?;

        let payload = OpenAiChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Completion request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Completion API returned an error: {}", text);
            return Err(AppError::ExternalServiceError(format!(
                "Completion API returned {}",
                status
            )));
        }

        let output: OpenAiChatResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Invalid completion response: {}", e))
        })?;

        completion_from_response(output, &request.model)
    }
}

fn completion_from_response(output: OpenAiChatResponse, requested_model: &str) -> Result<Completion> {
    let content = output
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| {
            AppError::ExternalServiceError("Completion API returned no content".to_string())
        })?;

    Ok(Completion {
        content,
        model: output.model.unwrap_or_else(|| requested_model.to_string()),
        total_tokens: output.usage.and_then(|usage| usage.total_tokens),
    })
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    model: Option<String>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiAssistantMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiAssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn config(api_key: Option<&str>) -> CompletionConfig {
        CompletionConfig {
            api_key: api_key.map(str::to_string),
            base_url: "https://llm.example.invalid/v1/".to_string(),
            default_model: "gpt-3.5-turbo".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = OpenAiClient::new(&config(Some("k"))).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://llm.example.invalid/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_request() {
        let client = OpenAiClient::new(&config(None)).unwrap();
        let request = CompletionRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 10,
            temperature: 0.5,
        };

        let err = client.complete(&request).await.unwrap_err();
        match err {
            AppError::ExternalServiceError(msg) => {
                assert_eq!(msg, "No completion API key configured")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_request_payload_shape() {
        let messages = vec![ChatMessage::system("ctx"), ChatMessage::user("hi")];
        let payload = OpenAiChatRequest {
            model: "m",
            messages: &messages,
            max_tokens: 64,
            temperature: 0.25,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["max_tokens"], 64);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_parses_first_choice() {
        let output: OpenAiChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "model": "gpt-3.5-turbo-0125",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Hello!"}}
            ],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        }))
        .unwrap();

        let completion = completion_from_response(output, "gpt-3.5-turbo").unwrap();
        assert_eq!(completion.content, "Hello!");
        assert_eq!(completion.model, "gpt-3.5-turbo-0125");
        assert_eq!(completion.total_tokens, Some(7));
    }

    #[test]
    fn test_empty_choices_is_an_error() {
        let output: OpenAiChatResponse =
            serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            completion_from_response(output, "m"),
            Err(AppError::ExternalServiceError(_))
        ));
    }
}
