//! Ollama provider for locally hosted models.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::sse::byte_lines;
use cookbook_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl GenerateResponse {
    fn usage(&self) -> LlmUsage {
        LlmUsage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        )
    }
}

/// Ollama completion client.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn to_generate_request<'a>(&self, request: &'a LlmRequest, stream: bool) -> GenerateRequest<'a> {
        let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| {
            GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            }
        });

        GenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            options,
            stream,
        }
    }

    async fn send(&self, body: &GenerateRequest<'_>) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to reach Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Generation(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_stream_line(line: &str) -> AppResult<LlmStreamChunk> {
    let parsed: GenerateResponse = serde_json::from_str(line)
        .map_err(|e| AppError::Generation(format!("Malformed Ollama chunk: {}", e)))?;

    if let Some(error) = &parsed.error {
        return Err(AppError::Generation(format!("Ollama error: {}", error)));
    }

    Ok(LlmStreamChunk {
        usage: parsed.done.then(|| parsed.usage()),
        content: parsed.response,
        done: parsed.done,
    })
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending completion request to Ollama");

        let body = self.to_generate_request(request, false);
        let response = self.send(&body).await?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse Ollama response: {}", e)))?;

        if let Some(error) = &parsed.error {
            return Err(AppError::Generation(format!("Ollama error: {}", error)));
        }

        let usage = parsed.usage();
        Ok(LlmResponse {
            content: parsed.response,
            model: parsed.model,
            usage,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(model = %request.model, "Starting streaming request to Ollama");

        let body = self.to_generate_request(request, true);
        let response = self.send(&body).await?;

        let stream = byte_lines(response.bytes_stream())
            .map(|line| line.and_then(|line| parse_stream_line(&line)));

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::with_base_url("http://localhost:11434/");
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_generate_request_options() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("Hello", "llama3.2")
            .with_temperature(Some(0.7))
            .with_max_tokens(Some(100));

        let body = serde_json::to_value(client.to_generate_request(&request, false)).unwrap();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["options"]["num_predict"], 100);
        assert_eq!(body["stream"], false);

        let bare = LlmRequest::new("Hello", "llama3.2");
        let body = serde_json::to_value(client.to_generate_request(&bare, false)).unwrap();
        assert!(body.get("options").is_none());
    }

    #[tokio::test]
    async fn test_stream_ndjson() {
        let body = concat!(
            "{\"model\":\"llama3.2\",\"response\":\"Whisk \",\"done\":false}\n",
            "{\"model\":\"llama3.2\",\"response\":\"the eggs.\",\"done\":false}\n",
            "{\"model\":\"llama3.2\",\"response\":\"\",\"done\":true,\"prompt_eval_count\":12,\"eval_count\":4}\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri());
        let chunks: Vec<LlmStreamChunk> = client
            .stream(&LlmRequest::new("Eggs?", "llama3.2"))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        let text: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(text, "Whisk the eggs.");
        assert_eq!(chunks.last().and_then(|c| c.usage).map(|u| u.total_tokens), Some(16));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = OllamaClient::with_base_url("http://127.0.0.1:9");
        let err = client
            .complete(&LlmRequest::new("Eggs?", "llama3.2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }
}
