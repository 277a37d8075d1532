//! Chunk-size heuristics and chunking policies.
//!
//! Two policies are supported, selected per deployment via `CHUNKING_POLICY`:
//!
//! - Paragraph: split on newline boundaries and greedily pack whole paragraphs into
//!   character-bounded chunks with no overlap. A paragraph is never split, so a single
//!   paragraph larger than the budget is emitted as one oversized chunk.
//! - Sentence: split on terminal punctuation and pack sentences into word-bounded chunks,
//!   carrying the last `overlap` words of each closed chunk into the next one.
//!
//! The policies are not interchangeable: paragraph chunks carry no overlap, sentence chunks do.
//! Whitespace-only input yields an empty chunk sequence, which the index build treats as
//! "no index" rather than an error.

use crate::config::ChunkingPolicy;

use super::types::ChunkingError;

const DEFAULT_PARAGRAPH_CHUNK_CHARS: usize = 800;
const DEFAULT_SENTENCE_CHUNK_WORDS: usize = 300;
const DEFAULT_SENTENCE_OVERLAP_WORDS: usize = 50;

/// Determine the chunk size for an ingestion, respecting overrides.
///
/// The unit depends on the policy: characters for paragraph packing, words for sentence
/// packing. Explicit overrides (`CHUNK_SIZE`) win and are clamped at `>= 1`.
pub(crate) fn determine_chunk_size(override_size: Option<usize>, policy: ChunkingPolicy) -> usize {
    if let Some(explicit) = override_size {
        return explicit.max(1);
    }
    match policy {
        ChunkingPolicy::Paragraph => DEFAULT_PARAGRAPH_CHUNK_CHARS,
        ChunkingPolicy::Sentence => DEFAULT_SENTENCE_CHUNK_WORDS,
    }
}

/// Determine the word overlap for an ingestion, respecting overrides.
///
/// Paragraph packing never overlaps; the override only applies to the sentence policy and is
/// clamped below the chunk size so packing always advances.
pub(crate) fn determine_overlap(
    override_overlap: Option<usize>,
    policy: ChunkingPolicy,
    chunk_size: usize,
) -> usize {
    match policy {
        ChunkingPolicy::Paragraph => 0,
        ChunkingPolicy::Sentence => override_overlap
            .unwrap_or(DEFAULT_SENTENCE_OVERLAP_WORDS)
            .min(chunk_size.saturating_sub(1)),
    }
}

/// Chunk text according to the configured policy.
///
/// Returns an empty vector when the input text is all whitespace.
pub(crate) fn chunk_text(
    text: &str,
    policy: ChunkingPolicy,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chunks = match policy {
        ChunkingPolicy::Paragraph => chunk_paragraphs(text, chunk_size),
        ChunkingPolicy::Sentence => chunk_sentences(text, chunk_size, overlap),
    };
    Ok(chunks)
}

/// Greedy paragraph packer bounded by character count.
///
/// Paragraphs are trimmed and joined with single spaces; when appending the next paragraph
/// would push the buffer past `chunk_size` characters, the buffer closes and the paragraph
/// starts a new one.
fn chunk_paragraphs(text: &str, chunk_size: usize) -> Vec<String> {
    let paragraphs = text
        .split('\n')
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty());

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for paragraph in paragraphs {
        let paragraph_chars = paragraph.chars().count();
        let projected = if current.is_empty() {
            paragraph_chars
        } else {
            current_chars + 1 + paragraph_chars
        };
        if projected > chunk_size && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current.push_str(paragraph);
            current_chars = paragraph_chars;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(paragraph);
            current_chars = projected;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Sentence packer bounded by word count with a sliding word overlap.
fn chunk_sentences(text: &str, chunk_words: usize, overlap: usize) -> Vec<String> {
    let sentences = split_sentences(text);

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for sentence in sentences {
        let words: Vec<String> = sentence
            .split_whitespace()
            .map(|word| word.to_string())
            .collect();
        if words.is_empty() {
            continue;
        }

        if !current.is_empty() && current.len() + words.len() > chunk_words {
            chunks.push(current.join(" "));
            let tail_start = current.len().saturating_sub(overlap);
            current = current.split_off(tail_start);
        }
        current.extend(words);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Split text into sentences on terminal punctuation, keeping the punctuation attached.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}
