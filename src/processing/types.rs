//! Core data types and error definitions for the processing pipeline.

use crate::embedding::EmbeddingClientError;
use crate::index::IndexError;
use crate::rerank::RerankClientError;
use crate::store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by the document ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Ingest was called with no extractable text; the index has been cleared.
    #[error("Document contained no extractable text")]
    EmptyDocument,
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors for the chunks.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Index build rejected the produced vectors.
    #[error("Failed to build index: {0}")]
    Index(#[from] IndexError),
    /// Document record could not be persisted.
    #[error("Failed to persist document record: {0}")]
    Store(#[from] StoreError),
}

/// Errors emitted while orchestrating retrieval.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding provider failed to return vectors for a query expansion.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Reranker failed to score the candidate pool.
    #[error("Failed to rerank candidates: {0}")]
    Rerank(#[from] RerankClientError),
    /// Index search rejected the query vector.
    #[error("Index search failed: {0}")]
    Index(#[from] IndexError),
    /// Embedding provider returned no vector for a query expansion.
    #[error("Embedding provider returned no vector for the query")]
    EmptyEmbedding,
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Identifier assigned to the stored document record.
    pub document_id: String,
    /// Summary stored with the record.
    pub summary: String,
    /// Category label stored with the record.
    pub category: String,
    /// Number of chunks indexed for the document.
    pub chunk_count: usize,
    /// Chunk size used during processing.
    pub chunk_size: usize,
    /// Chunks skipped within the request due to duplicate text.
    pub skipped_duplicates: usize,
}

/// A retrieved chunk enriched with retrieval and rerank scores.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    /// Chunk text content.
    pub text: String,
    /// Squared Euclidean distance from the nearest matching expansion.
    pub distance: f32,
    /// Relevance score assigned by the reranker against the original query.
    pub score: f32,
}

/// Result of a full question-answering call.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Synthesized answer text (or a fixed fallback).
    pub answer: String,
    /// Final reranked context chunks, most relevant first.
    pub chunks: Vec<RetrievedChunk>,
}
