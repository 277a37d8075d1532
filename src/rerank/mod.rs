//! Relevance reranking abstraction and adapters.
//!
//! Reranking is the second retrieval stage: after the vector index produces a broad candidate
//! pool, every (query, passage) pair is scored by a cross-encoder and the pool is reordered by
//! that score. The HTTP adapter speaks the `/rerank` protocol used by text-embeddings-inference
//! style servers; the lexical adapter is a deterministic in-process stand-in that scores by
//! token overlap.

use crate::config::{RerankProvider, get_config};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised by reranking providers.
#[derive(Debug, Error)]
pub enum RerankClientError {
    /// Provider could not be reached.
    #[error("Rerank provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider failed to score the supplied pairs.
    #[error("Failed to score candidates: {0}")]
    ScoringFailed(String),
    /// Provider response could not be parsed or did not cover the request.
    #[error("Malformed rerank response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by reranking backends.
#[async_trait]
pub trait RerankClient: Send + Sync {
    /// Score each passage against the query; results align with the input order.
    async fn score(
        &self,
        query: &str,
        passages: &[String],
    ) -> Result<Vec<f32>, RerankClientError>;
}

/// Build a rerank client suitable for the current configuration.
pub fn get_rerank_client() -> Box<dyn RerankClient> {
    let config = get_config();
    match config.rerank_provider {
        RerankProvider::Lexical => Box::new(LexicalRerankClient::new()),
        RerankProvider::Http => {
            let base_url = config
                .reranker_url
                .clone()
                .unwrap_or_else(|| "http://127.0.0.1:8080".to_string());
            Box::new(HttpRerankClient::new(base_url))
        }
    }
}

/// Rerank client backed by an external cross-encoder service.
pub struct HttpRerankClient {
    http: Client,
    base_url: String,
}

impl HttpRerankClient {
    /// Construct a client pointed at the given reranker base URL.
    pub fn new(base_url: String) -> Self {
        let http = Client::builder()
            .user_agent("docuseek/rerank")
            .build()
            .expect("Failed to construct reqwest::Client for reranking");
        Self { http, base_url }
    }

    fn endpoint(&self) -> String {
        format!("{}/rerank", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

#[async_trait]
impl RerankClient for HttpRerankClient {
    async fn score(
        &self,
        query: &str,
        passages: &[String],
    ) -> Result<Vec<f32>, RerankClientError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let payload = json!({
            "query": query,
            "texts": passages,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                RerankClientError::ProviderUnavailable(format!(
                    "failed to reach reranker at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RerankClientError::ScoringFailed(format!(
                "reranker returned {status}: {body}"
            )));
        }

        let hits: Vec<RerankHit> = response.json().await.map_err(|error| {
            RerankClientError::InvalidResponse(format!(
                "failed to decode reranker response: {error}"
            ))
        })?;

        // The service may return hits sorted by score; map them back onto input order.
        let mut scores = vec![None; passages.len()];
        for hit in hits {
            let slot = scores.get_mut(hit.index).ok_or_else(|| {
                RerankClientError::InvalidResponse(format!(
                    "hit index {} out of range for {} passages",
                    hit.index,
                    passages.len()
                ))
            })?;
            *slot = Some(hit.score);
        }

        scores
            .into_iter()
            .enumerate()
            .map(|(position, score)| {
                score.ok_or_else(|| {
                    RerankClientError::InvalidResponse(format!(
                        "reranker returned no score for passage {position}"
                    ))
                })
            })
            .collect()
    }
}

/// Deterministic rerank client scoring by normalized token overlap.
///
/// Scores fall in `[0, 1]`: the fraction of distinct query tokens present in the passage. Exact
/// keyword matches rank highest, which is sufficient for offline runs and tests.
pub struct LexicalRerankClient;

impl LexicalRerankClient {
    /// Construct a new lexical rerank client.
    pub const fn new() -> Self {
        Self
    }

    fn tokens(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(|token| token.to_lowercase())
            .collect()
    }

    fn overlap_score(query_tokens: &HashSet<String>, passage: &str) -> f32 {
        if query_tokens.is_empty() {
            return 0.0;
        }
        let passage_tokens = Self::tokens(passage);
        let shared = query_tokens
            .iter()
            .filter(|token| passage_tokens.contains(*token))
            .count();
        shared as f32 / query_tokens.len() as f32
    }
}

impl Default for LexicalRerankClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RerankClient for LexicalRerankClient {
    async fn score(
        &self,
        query: &str,
        passages: &[String],
    ) -> Result<Vec<f32>, RerankClientError> {
        let query_tokens = Self::tokens(query);
        Ok(passages
            .iter()
            .map(|passage| Self::overlap_score(&query_tokens, passage))
            .collect())
    }
}
