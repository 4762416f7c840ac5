//! Ollama provider implementation (native API).
//!
//! Supports:
//! - Chat completions via `/api/chat` (non-streaming)
//! - Embeddings via `/api/embeddings`
//! - Model listing and health checks via `/api/tags`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolpilot_core::error::ProviderError;
use toolpilot_core::message::Turn;
use toolpilot_core::provider::*;
use tracing::{debug, warn};

/// Default Ollama API base URL (local server).
pub const OLLAMA_API_BASE_URL: &str = "http://127.0.0.1:11434";

/// A provider backed by a local (or remote) Ollama server.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider. Every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Turn types to Ollama API format.
    fn to_api_messages(turns: &[Turn]) -> Vec<ApiMessage> {
        turns
            .iter()
            .map(|t| ApiMessage {
                role: t.role.as_str().to_string(),
                content: t.content.clone(),
            })
            .collect()
    }

    fn map_send_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }

    /// Turn a non-success HTTP status into a provider error.
    async fn status_error(response: reqwest::Response, model: &str) -> ProviderError {
        let status = response.status().as_u16();
        let error_body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&error_body)
            .map(|e| e.error)
            .unwrap_or(error_body);

        if status == 404 && message.contains("not found") {
            return ProviderError::ModelNotFound(model.to_string());
        }

        warn!(status, body = %message, "Ollama returned error");
        ProviderError::ApiError {
            status_code: status,
            message,
        }
    }

    async fn fetch_tags(&self) -> Result<TagsResponse, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, "").await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse model list: {e}")))
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let body = ChatRequest {
            model: &request.model,
            messages: Self::to_api_messages(&request.turns),
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
            },
        };

        debug!(model = %request.model, turns = request.turns.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, &request.model).await);
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse chat response: {e}")))?;

        let usage = match (api_response.prompt_eval_count, api_response.eval_count) {
            (Some(prompt), Some(completion)) => Some(Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        Ok(ProviderResponse {
            content: api_response.message.content,
            model: api_response.model,
            usage,
        })
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/api/embeddings", self.base_url);

        debug!(
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let mut embeddings = Vec::with_capacity(request.inputs.len());
        for input in &request.inputs {
            let response = self
                .client
                .post(&url)
                .json(&EmbeddingApiRequest {
                    model: &request.model,
                    prompt: input,
                })
                .send()
                .await
                .map_err(Self::map_send_error)?;

            if !response.status().is_success() {
                return Err(Self::status_error(response, &request.model).await);
            }

            let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse embedding response: {e}"))
            })?;

            if api_resp.embedding.is_empty() {
                return Err(ProviderError::InvalidResponse(format!(
                    "Model '{}' returned an empty embedding",
                    request.model
                )));
            }
            embeddings.push(api_resp.embedding);
        }

        Ok(EmbeddingResponse {
            embeddings,
            model: request.model,
        })
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let tags = self.fetch_tags().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Ok(response.status().is_success())
    }
}

// --- Ollama API types ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    message: ApiMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct EmbeddingApiRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OllamaProvider {
        OllamaProvider::new("http://127.0.0.1:11434/", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let provider = provider();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.base_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn turn_conversion_keeps_roles() {
        let turns = vec![Turn::system("You are helpful"), Turn::user("Hello")];
        let api_messages = OllamaProvider::to_api_messages(&turns);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
        assert_eq!(api_messages[1].content, "Hello");
    }

    #[test]
    fn chat_request_serializes_options() {
        let body = ChatRequest {
            model: "llama3.1",
            messages: vec![],
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3.1");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.0);
    }

    #[test]
    fn parse_chat_response() {
        let data = r#"{
            "model": "llama3.1",
            "created_at": "2024-08-01T10:00:00Z",
            "message": {"role": "assistant", "content": "<tool_call>{\"name\": \"search\"}</tool_call>"},
            "done": true,
            "prompt_eval_count": 26,
            "eval_count": 12
        }"#;
        let parsed: ChatResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.model, "llama3.1");
        assert!(parsed.message.content.starts_with("<tool_call>"));
        assert_eq!(parsed.prompt_eval_count, Some(26));
    }

    #[test]
    fn parse_embedding_response() {
        let data = r#"{"embedding": [0.5, -0.25, 1.0]}"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.embedding, vec![0.5, -0.25, 1.0]);
    }

    #[test]
    fn parse_tags_response() {
        let data = r#"{"models": [{"name": "llama3.1:latest", "size": 1}, {"name": "nomic-embed-text:latest"}]}"#;
        let parsed: TagsResponse = serde_json::from_str(data).unwrap();
        let names: Vec<_> = parsed.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama3.1:latest", "nomic-embed-text:latest"]);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_retryable_error() {
        // Port 9 (discard) is not expected to have an HTTP server listening.
        let provider = OllamaProvider::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = provider
            .complete(ProviderRequest {
                model: "llama3.1".into(),
                turns: vec![Turn::user("hi")],
                temperature: 0.0,
            })
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
