//! Document processing pipeline: chunking, expansion, retrieval, and answer synthesis.

/// Answer-synthesis prompt building and fallbacks.
pub mod answer;
/// Chunking policies and size heuristics.
pub mod chunking;
/// Query expansion for synonym-style questions.
pub mod expand;
mod mappers;
mod sanitize;
mod service;
/// Document summarization and categorization helpers.
pub mod summarize;
/// Pipeline data types and error taxonomy.
pub mod types;

pub use service::{ProcessingApi, ProcessingService, RetrievalSettings};
pub use types::{
    ChunkingError, IngestError, IngestOutcome, QueryOutcome, RetrievalError, RetrievedChunk,
};
