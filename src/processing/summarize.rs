//! Document summarization and categorization helpers.
//!
//! On ingest every document gets a short summary and a single category label. Both prefer the
//! configured generation provider and fall back to deterministic local heuristics so that
//! ingestion never fails on generation problems.

use crate::generation::{GenerationClient, GenerationRequest};
use crate::processing::sanitize::normalize_category;

/// Fixed label set a document can be filed under.
pub const CATEGORY_LABELS: [&str; 10] = [
    "Operations",
    "Research & Development",
    "Finance",
    "Legal",
    "Human Resources",
    "Engineering",
    "Marketing",
    "Administration",
    "Security",
    "Archives",
];

const FALLBACK_CATEGORY: &str = "Archives";
const SUMMARY_SOURCE_CHAR_BUDGET: usize = 6000;

/// Summary and category produced for a document.
#[derive(Debug, Clone)]
pub(crate) struct DocumentDigest {
    pub(crate) summary: String,
    pub(crate) category: String,
}

/// Produce a summary and category for a document, preferring the generation provider.
///
/// Generation failures are logged and replaced by the extractive summary and keyword category;
/// they never propagate to the caller.
pub(crate) async fn digest_document(
    client: Option<&(dyn GenerationClient)>,
    model: Option<&str>,
    text: &str,
    max_words: usize,
) -> DocumentDigest {
    if let (Some(client), Some(model)) = (client, model) {
        let summary = match client
            .complete(GenerationRequest {
                model: model.to_string(),
                prompt: build_summary_prompt(text, max_words),
            })
            .await
        {
            Ok(response) if !response.trim().is_empty() => Some(response.trim().to_string()),
            Ok(_) => None,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Abstractive summarization failed; falling back to extractive"
                );
                None
            }
        };

        let category = match client
            .complete(GenerationRequest {
                model: model.to_string(),
                prompt: build_category_prompt(text),
            })
            .await
        {
            Ok(response) => normalize_category(&response, &CATEGORY_LABELS),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Category labeling failed; falling back to keyword match"
                );
                None
            }
        };

        return DocumentDigest {
            summary: summary.unwrap_or_else(|| build_extractive_summary(text, max_words)),
            category: category.unwrap_or_else(|| keyword_category(text)),
        };
    }

    DocumentDigest {
        summary: build_extractive_summary(text, max_words),
        category: keyword_category(text),
    }
}

/// Build the abstractive summarization prompt.
pub(crate) fn build_summary_prompt(text: &str, max_words: usize) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "System: You summarize documents into concise, factual prose. Prefer neutral tone. Avoid speculation. Return at most {max_words} words. Output a single paragraph.\n\n"
    ));
    prompt.push_str("Summarize the following document.\n\nDOCUMENT:\n");
    prompt.push_str(truncate_chars(text, SUMMARY_SOURCE_CHAR_BUDGET));
    prompt.push('\n');
    prompt
}

/// Build the category classification prompt.
pub(crate) fn build_category_prompt(text: &str) -> String {
    let labels = CATEGORY_LABELS.join(", ");
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "System: You classify documents. Reply with exactly one label from this list and nothing else: {labels}.\n\n"
    ));
    prompt.push_str("Classify the following document.\n\nDOCUMENT:\n");
    prompt.push_str(truncate_chars(text, SUMMARY_SOURCE_CHAR_BUDGET));
    prompt.push('\n');
    prompt
}

/// Build a deterministic extractive summary bounded by a word budget.
///
/// Takes leading sentences until the budget runs out; always returns at least one sentence so
/// the record is never stored with an empty summary.
pub(crate) fn build_extractive_summary(text: &str, max_words: usize) -> String {
    let mut summary_words: Vec<&str> = Vec::new();

    for sentence in sentences(text) {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        if !summary_words.is_empty() && summary_words.len() + words.len() > max_words {
            break;
        }
        summary_words.extend(words);
    }

    if summary_words.len() > max_words {
        summary_words.truncate(max_words);
    }
    summary_words.join(" ")
}

/// Guess a category by counting label-word occurrences in the document.
pub(crate) fn keyword_category(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for label in CATEGORY_LABELS {
        let hits: usize = label
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.len() > 2)
            .map(|word| lowered.matches(&word.to_lowercase()).count())
            .sum();
        if hits > 0 && best.map(|(_, count)| hits > count).unwrap_or(true) {
            best = Some((label, hits));
        }
    }

    best.map(|(label, _)| label.to_string())
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
}

fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}
