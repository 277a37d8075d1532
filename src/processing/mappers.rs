//! Chunk preparation and candidate-selection helpers.

use crate::processing::types::RetrievedChunk;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Chunk text with associated hash ready for ingestion.
#[derive(Debug, Clone)]
pub(crate) struct PreparedChunk {
    /// Chunk text content.
    pub(crate) text: String,
    /// Stable digest used for dedupe.
    pub(crate) chunk_hash: String,
}

/// Compute a deterministic digest for a chunk's text.
pub(crate) fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Remove duplicate chunks within a document, keeping the first occurrence.
pub(crate) fn dedupe_chunks(chunks: Vec<String>) -> (Vec<PreparedChunk>, usize) {
    let mut seen = HashSet::new();
    let mut prepared = Vec::new();
    let mut skipped = 0;

    for text in chunks {
        if text.trim().is_empty() {
            continue;
        }
        let hash = compute_chunk_hash(&text);
        if seen.insert(hash.clone()) {
            prepared.push(PreparedChunk {
                text,
                chunk_hash: hash,
            });
        } else {
            skipped += 1;
        }
    }

    (prepared, skipped)
}

/// Order scored candidates by relevance and keep the best unique chunks.
///
/// The sort is stable and descending by rerank score, so pool order breaks ties. Chunks with
/// identical text collapse onto their first (highest-scoring) occurrence before truncation to
/// `final_k`.
pub(crate) fn select_candidates(
    mut candidates: Vec<RetrievedChunk>,
    final_k: usize,
) -> Vec<RetrievedChunk> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for candidate in candidates {
        if !seen.insert(candidate.text.clone()) {
            continue;
        }
        selected.push(candidate);
        if selected.len() == final_k {
            break;
        }
    }

    selected
}
