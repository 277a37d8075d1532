//! Embedding client abstraction and adapters.
//!
//! Two backends are provided: an Ollama adapter that issues HTTP requests directly to the
//! runtime's `/api/embed` endpoint, and a deterministic hashing encoder useful for tests and
//! for running the server without any external process. Both produce vectors of the configured
//! dimension; the pipeline treats mismatches as hard errors rather than silently truncating.

use crate::config::{EmbeddingProvider, get_config};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or did not match the request.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied piece of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Build an embedding client suitable for the current configuration.
pub fn get_embedding_client() -> Box<dyn EmbeddingClient> {
    let config = get_config();
    match config.embedding_provider {
        EmbeddingProvider::Hash => Box::new(HashEmbeddingClient::new(config.embedding_dimension)),
        EmbeddingProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Box::new(OllamaEmbeddingClient::new(
                base_url,
                config.embedding_model.clone(),
                config.embedding_dimension,
            ))
        }
    }
}

/// Deterministic embedding client that folds bytes into a normalized vector.
///
/// The encoding carries no semantics beyond "identical text maps to identical vectors", which is
/// exactly what retrieval tests need.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    /// Construct a deterministic embedding client producing vectors of `dimension`.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let embeddings = texts
            .into_iter()
            .map(|text| Self::encode(&text, self.dimension))
            .collect();

        Ok(embeddings)
    }
}

/// Embedding client backed by an Ollama runtime.
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbeddingClient {
    /// Construct a client pointed at the given Ollama base URL.
    pub fn new(base_url: String, model: String, dimension: usize) -> Self {
        let http = Client::builder()
            .user_agent("docuseek/embed")
            .build()
            .expect("Failed to construct reqwest::Client for embeddings");
        Self {
            http,
            base_url,
            model,
            dimension,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let requested = texts.len();
        tracing::debug!(
            model = %self.model,
            inputs = requested,
            "Generating embeddings"
        );

        let payload = json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaEmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if body.embeddings.len() != requested {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "expected {requested} embeddings, got {}",
                body.embeddings.len()
            )));
        }
        if let Some(vector) = body
            .embeddings
            .iter()
            .find(|vector| vector.len() != self.dimension)
        {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "expected dimension {}, got {}",
                self.dimension,
                vector.len()
            )));
        }

        Ok(body.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn hash_client_is_deterministic() {
        let client = HashEmbeddingClient::new(16);
        let first = client
            .generate_embeddings(vec!["alpha".into(), "beta".into()])
            .await
            .expect("embeddings");
        let second = client
            .generate_embeddings(vec!["alpha".into(), "beta".into()])
            .await
            .expect("embeddings");

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].len(), 16);
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn hash_client_rejects_empty_input() {
        let client = HashEmbeddingClient::new(8);
        let error = client
            .generate_embeddings(Vec::new())
            .await
            .expect_err("empty input rejected");
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn ollama_client_decodes_embeddings() {
        let server = MockServer::start_async().await;
        let client = OllamaEmbeddingClient::new(server.base_url(), "all-minilm".into(), 3);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(200).json_body(json!({
                    "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]
                }));
            })
            .await;

        let vectors = client
            .generate_embeddings(vec!["one".into(), "two".into()])
            .await
            .expect("embeddings");

        mock.assert();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn ollama_client_rejects_dimension_mismatch() {
        let server = MockServer::start_async().await;
        let client = OllamaEmbeddingClient::new(server.base_url(), "all-minilm".into(), 4);

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(200).json_body(json!({
                    "embeddings": [[0.1, 0.2]]
                }));
            })
            .await;

        let error = client
            .generate_embeddings(vec!["one".into()])
            .await
            .expect_err("dimension mismatch surfaces");
        assert!(matches!(error, EmbeddingClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn ollama_client_surfaces_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaEmbeddingClient::new(server.base_url(), "all-minilm".into(), 2);

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate_embeddings(vec!["one".into()])
            .await
            .expect_err("error response surfaces");
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }
}
