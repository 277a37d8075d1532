//! Abstractions for text generation via local providers.
//!
//! Generation serves three pipeline steps: document summaries, category labels, and answer
//! synthesis. The pipeline is optional; when no provider is configured the processing layer
//! falls back to deterministic extractive summaries, keyword categories, and a fixed answer
//! notice. The Ollama-backed client issues HTTP requests directly to the runtime.

use crate::config::{GenerationProvider, get_config};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors surfaced while attempting text generation.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the generation provider.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully qualified model identifier understood by the provider.
    pub model: String,
    /// Prompt assembled by the processing pipeline.
    pub prompt: String,
}

/// Interface implemented by text-generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for the assembled prompt.
    async fn complete(&self, request: GenerationRequest) -> Result<String, GenerationClientError>;
}

/// Build a generation client based on configuration.
pub fn get_generation_client() -> Option<Box<dyn GenerationClient>> {
    let config = get_config();
    match config.generation_provider {
        GenerationProvider::None => None,
        GenerationProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Some(Box::new(OllamaGenerationClient::new(base_url)))
        }
    }
}

struct OllamaGenerationClient {
    http: Client,
    base_url: String,
}

impl OllamaGenerationClient {
    fn new(base_url: String) -> Self {
        let http = Client::builder()
            .user_agent("docuseek/generate")
            .build()
            .expect("Failed to construct reqwest::Client for generation");
        Self { http, base_url }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerationClient for OllamaGenerationClient {
    async fn complete(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                // Lower temperature for reproducible summaries and grounded answers.
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(GenerationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}
