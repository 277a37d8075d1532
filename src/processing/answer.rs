//! Answer synthesis from retrieved context.
//!
//! The synthesizer is deliberately thin: it short-circuits on empty context, builds a grounded
//! prompt otherwise, and passes the model's free-text reply through unchanged. Failures are
//! logged and replaced with a fixed message so callers never see a raw provider error.

use crate::generation::{GenerationClient, GenerationRequest};
use crate::processing::types::RetrievedChunk;

/// Fallback answer when retrieval produced no context.
pub const NO_CONTEXT_FALLBACK: &str =
    "No relevant information was found in the indexed documents.";
/// Fallback answer when no generation provider is configured.
pub const UNCONFIGURED_FALLBACK: &str =
    "Answer generation is not configured; the most relevant passages are returned instead.";
/// Fallback answer when the generation call fails.
pub const SYNTHESIS_FALLBACK: &str =
    "There was an error generating the answer from the language model.";

/// Build the grounded answer prompt from the original query and retrieved chunks.
pub(crate) fn build_answer_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    let context = chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = String::new();
    prompt.push_str(
        "System: You answer questions about a document. Use ONLY the provided context. \
         If the context gives another name or synonym for something, state it explicitly. \
         If the answer is not in the context, reply: \"The document does not specify this.\"\n\n",
    );
    prompt.push_str("CONTEXT:\n");
    prompt.push_str(&context);
    prompt.push_str("\n\nQUESTION:\n");
    prompt.push_str(question);
    prompt.push('\n');
    prompt
}

/// Synthesize an answer for the question from the retrieved chunks.
///
/// Empty context returns the fixed fallback without touching the provider.
pub(crate) async fn synthesize_answer(
    client: Option<&(dyn GenerationClient)>,
    model: Option<&str>,
    question: &str,
    chunks: &[RetrievedChunk],
) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_FALLBACK.to_string();
    }

    let (Some(client), Some(model)) = (client, model) else {
        return UNCONFIGURED_FALLBACK.to_string();
    };

    match client
        .complete(GenerationRequest {
            model: model.to_string(),
            prompt: build_answer_prompt(question, chunks),
        })
        .await
    {
        Ok(answer) => answer,
        Err(error) => {
            tracing::error!(error = %error, "Answer synthesis failed");
            SYNTHESIS_FALLBACK.to_string()
        }
    }
}
