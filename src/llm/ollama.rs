//! Ollama-style generate endpoint
//!
//! One non-streaming completion per request.

use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

pub struct OllamaService {
    client: Client,
    config: OllamaConfig,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

impl OllamaService {
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::connection(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        }
    }
}

/// Classify a finished HTTP exchange into reply text or an error
fn parse_response(status: StatusCode, body: &str) -> Result<String, LlmError> {
    let json: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) if status.is_success() => {
            return Err(LlmError::decode(format!("Invalid JSON from service: {e}")));
        }
        Err(_) => {
            return Err(LlmError::service(format!("HTTP {status}: {body}")));
        }
    };

    if let Some(error) = json.get("error") {
        let message = error
            .as_str()
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(LlmError::service(message));
    }

    if !status.is_success() {
        return Err(LlmError::service(format!("HTTP {status}: {body}")));
    }

    match json.get("response").and_then(Value::as_str) {
        Some(text) => Ok(text.trim().to_string()),
        None => Err(LlmError::malformed_response(
            "Response has no 'response' text field",
        )),
    }
}

#[async_trait]
impl LlmService for OllamaService {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::connection(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::connection(format!("Connection failed: {e}"))
                } else {
                    LlmError::connection(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::connection(format!("Failed to read response: {e}")))?;

        parse_response(status, &body)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
