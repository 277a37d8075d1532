//! Processing service coordinating chunking, embedding, indexing, and retrieval.

use crate::{
    config::{ChunkingPolicy, Config, get_config},
    embedding::{EmbeddingClient, get_embedding_client},
    generation::{GenerationClient, get_generation_client},
    index::FlatIndex,
    metrics::{MetricsSnapshot, ServiceMetrics},
    processing::{
        answer::synthesize_answer,
        chunking::{chunk_text, determine_chunk_size, determine_overlap},
        expand::expand_query,
        mappers::{dedupe_chunks, select_candidates},
        sanitize::sanitize_filename,
        summarize::digest_document,
        types::{IngestError, IngestOutcome, QueryOutcome, RetrievalError, RetrievedChunk},
    },
    rerank::{RerankClient, RerankClientError, get_rerank_client},
    store::{DocumentListing, DocumentStore},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

const DEFAULT_STORE_PATH: &str = "data/documents.json";

/// Retrieval knobs resolved from configuration at service construction.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Chunking policy applied during ingestion.
    pub chunking_policy: ChunkingPolicy,
    /// Optional chunk size override.
    pub chunk_size: Option<usize>,
    /// Optional sentence-policy overlap override.
    pub chunk_overlap: Option<usize>,
    /// Neighbors retrieved per expanded query.
    pub k_per_expansion: usize,
    /// Default number of chunks kept after reranking.
    pub final_k: usize,
    /// Upper bound accepted for caller-supplied `k`.
    pub max_k: usize,
    /// Word budget for generated summaries.
    pub summary_max_words: usize,
    /// Generation model used for summaries and answers, when configured.
    pub generation_model: Option<String>,
}

impl RetrievalSettings {
    /// Resolve settings from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunking_policy: config.chunking_policy,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            k_per_expansion: config.search_k_per_expansion.max(1),
            final_k: config.search_final_k.max(1),
            max_k: config.search_max_k.max(1),
            summary_max_words: config.summary_max_words.max(1),
            generation_model: config.generation_model.clone(),
        }
    }
}

/// Immutable chunk sequence plus the index built over it.
///
/// Sessions are built completely off to the side and only then published, so readers never
/// observe an index and chunk list of mismatched length.
struct RetrievalSession {
    chunks: Vec<String>,
    index: FlatIndex,
}

impl RetrievalSession {
    fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            index: FlatIndex::default(),
        }
    }

    fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Coordinates the full pipeline: ingestion (chunk, embed, index, summarize, persist) and
/// question answering (expand, search, rerank, synthesize).
///
/// The service owns long-lived handles to the model clients, the document store, and the
/// metrics registry so the HTTP surface reuses the same components. Construct it once near
/// process start and share it through an `Arc`.
pub struct ProcessingService {
    embedding_client: Box<dyn EmbeddingClient>,
    rerank_client: Box<dyn RerankClient>,
    generation_client: Option<Box<dyn GenerationClient>>,
    store: DocumentStore,
    session: RwLock<Arc<RetrievalSession>>,
    settings: RetrievalSettings,
    metrics: Arc<ServiceMetrics>,
}

/// Abstraction over the processing pipeline used by external surfaces.
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Summarize, persist, and index a document from extracted text.
    async fn ingest_document(
        &self,
        filename: Option<String>,
        text: String,
    ) -> Result<IngestOutcome, IngestError>;

    /// Answer a free-text question from the indexed document.
    async fn query(
        &self,
        question: String,
        k: Option<usize>,
    ) -> Result<QueryOutcome, RetrievalError>;

    /// List stored document records.
    fn list_documents(&self) -> Vec<DocumentListing>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Build a new processing service from loaded configuration.
    pub fn new() -> Self {
        let config = get_config();
        tracing::info!("Initializing model clients");
        let embedding_client = get_embedding_client();
        let rerank_client = get_rerank_client();
        let generation_client = get_generation_client();
        let store_path = config
            .document_store_path
            .clone()
            .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string());
        let store = DocumentStore::open(store_path).expect("Failed to open document store");

        Self::with_components(
            embedding_client,
            rerank_client,
            generation_client,
            store,
            RetrievalSettings::from_config(config),
        )
    }

    /// Build a service from explicit components; used by tests and embedders.
    pub fn with_components(
        embedding_client: Box<dyn EmbeddingClient>,
        rerank_client: Box<dyn RerankClient>,
        generation_client: Option<Box<dyn GenerationClient>>,
        store: DocumentStore,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedding_client,
            rerank_client,
            generation_client,
            store,
            session: RwLock::new(Arc::new(RetrievalSession::empty())),
            settings,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    /// Summarize, persist, and index a document from extracted text.
    ///
    /// The retrieval session is rebuilt wholesale: a successful ingest replaces the previous
    /// searchable chunk set, and a failed one clears it so queries fall back to "no index"
    /// rather than answering from half-replaced state.
    pub async fn ingest_document(
        &self,
        filename: Option<String>,
        text: String,
    ) -> Result<IngestOutcome, IngestError> {
        let filename = sanitize_filename(filename).unwrap_or_else(|| "untitled".to_string());
        tracing::info!(filename = %filename, "Processing document");

        let (session, chunk_size, skipped_duplicates) = match self.build_session(&text).await {
            Ok(built) => built,
            Err(error) => {
                self.publish_session(RetrievalSession::empty()).await;
                return Err(error);
            }
        };
        let chunk_count = session.chunks.len();
        self.publish_session(session).await;

        let digest = digest_document(
            self.generation_client.as_deref(),
            self.settings.generation_model.as_deref(),
            &text,
            self.settings.summary_max_words,
        )
        .await;

        let record = self.store.insert(
            filename,
            text,
            digest.summary.clone(),
            digest.category.clone(),
        )?;

        self.metrics
            .record_document(chunk_count as u64, chunk_size as u64);
        tracing::info!(
            document_id = %record.id,
            chunks = chunk_count,
            chunk_size,
            skipped_duplicates,
            category = %record.category,
            "Document ingested"
        );

        Ok(IngestOutcome {
            document_id: record.id,
            summary: digest.summary,
            category: digest.category,
            chunk_count,
            chunk_size,
            skipped_duplicates,
        })
    }

    /// Retrieve the `final_k` most relevant unique chunks for a question.
    ///
    /// An empty index short-circuits to an empty result without touching the embedding or
    /// rerank providers. Neighbor positions outside the chunk range are discarded rather than
    /// surfaced.
    pub async fn retrieve(
        &self,
        question: &str,
        final_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let session = self.session.read().await.clone();
        if session.is_empty() {
            tracing::debug!("No index available; returning empty retrieval");
            return Ok(Vec::new());
        }

        let expansions = expand_query(question);
        tracing::debug!(
            expansions = expansions.len(),
            k_per_expansion = self.settings.k_per_expansion,
            "Searching expanded queries"
        );

        let mut pooled: Vec<(String, f32)> = Vec::new();
        for expansion in &expansions {
            let mut vectors = self
                .embedding_client
                .generate_embeddings(vec![expansion.clone()])
                .await?;
            let vector = vectors.pop().ok_or(RetrievalError::EmptyEmbedding)?;

            let neighbors = session
                .index
                .search(&vector, self.settings.k_per_expansion)?;
            for neighbor in neighbors {
                match session.chunks.get(neighbor.position) {
                    Some(chunk) => pooled.push((chunk.clone(), neighbor.distance)),
                    None => {
                        tracing::warn!(
                            position = neighbor.position,
                            chunks = session.chunks.len(),
                            "Discarding out-of-range neighbor"
                        );
                    }
                }
            }
        }

        if pooled.is_empty() {
            return Ok(Vec::new());
        }

        let passages: Vec<String> = pooled.iter().map(|(text, _)| text.clone()).collect();
        let scores = self.rerank_client.score(question, &passages).await?;
        if scores.len() != pooled.len() {
            return Err(RetrievalError::Rerank(RerankClientError::InvalidResponse(
                format!("expected {} scores, got {}", pooled.len(), scores.len()),
            )));
        }

        let scored: Vec<RetrievedChunk> = pooled
            .into_iter()
            .zip(scores)
            .map(|((text, distance), score)| RetrievedChunk {
                text,
                distance,
                score,
            })
            .collect();

        let selected = select_candidates(scored, final_k);
        tracing::debug!(selected = selected.len(), "Retrieval complete");
        Ok(selected)
    }

    /// Answer a free-text question from the indexed document.
    pub async fn query(
        &self,
        question: String,
        k: Option<usize>,
    ) -> Result<QueryOutcome, RetrievalError> {
        let final_k = k
            .map(|value| value.clamp(1, self.settings.max_k))
            .unwrap_or(self.settings.final_k);

        let chunks = self.retrieve(&question, final_k).await?;
        let answer = synthesize_answer(
            self.generation_client.as_deref(),
            self.settings.generation_model.as_deref(),
            &question,
            &chunks,
        )
        .await;

        self.metrics.record_query();
        tracing::info!(chunks = chunks.len(), "Query answered");
        Ok(QueryOutcome { answer, chunks })
    }

    /// List stored document records.
    pub fn list_documents(&self) -> Vec<DocumentListing> {
        self.store.list()
    }

    /// Return the current service metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn build_session(
        &self,
        text: &str,
    ) -> Result<(RetrievalSession, usize, usize), IngestError> {
        if text.trim().is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        let chunk_size =
            determine_chunk_size(self.settings.chunk_size, self.settings.chunking_policy);
        let overlap = determine_overlap(
            self.settings.chunk_overlap,
            self.settings.chunking_policy,
            chunk_size,
        );
        tracing::debug!(
            policy = ?self.settings.chunking_policy,
            chunk_size,
            overlap,
            "Derived chunking parameters"
        );

        let chunks = chunk_text(text, self.settings.chunking_policy, chunk_size, overlap)?;
        let (prepared, skipped_duplicates) = dedupe_chunks(chunks);
        if prepared.is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        let texts: Vec<String> = prepared.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self
            .embedding_client
            .generate_embeddings(texts.clone())
            .await?;
        debug_assert_eq!(prepared.len(), embeddings.len());

        // Dimension is fixed by the first embedding; `add` rejects any stragglers.
        let dimension = embeddings.first().map(Vec::len).unwrap_or_default();
        let mut index = FlatIndex::new(dimension);
        index.add(embeddings)?;

        Ok((
            RetrievalSession {
                chunks: texts,
                index,
            },
            chunk_size,
            skipped_duplicates,
        ))
    }

    async fn publish_session(&self, session: RetrievalSession) {
        *self.session.write().await = Arc::new(session);
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn ingest_document(
        &self,
        filename: Option<String>,
        text: String,
    ) -> Result<IngestOutcome, IngestError> {
        ProcessingService::ingest_document(self, filename, text).await
    }

    async fn query(
        &self,
        question: String,
        k: Option<usize>,
    ) -> Result<QueryOutcome, RetrievalError> {
        ProcessingService::query(self, question, k).await
    }

    fn list_documents(&self) -> Vec<DocumentListing> {
        ProcessingService::list_documents(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingClientError, HashEmbeddingClient};
    use crate::rerank::LexicalRerankClient;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbeddingClient {
        inner: HashEmbeddingClient,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EmbeddingClient for CountingEmbeddingClient {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.inner.generate_embeddings(texts).await
        }
    }

    struct CountingRerankClient {
        inner: LexicalRerankClient,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RerankClient for CountingRerankClient {
        async fn score(
            &self,
            query: &str,
            passages: &[String],
        ) -> Result<Vec<f32>, RerankClientError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.inner.score(query, passages).await
        }
    }

    struct TestHarness {
        service: ProcessingService,
        embedding_calls: Arc<AtomicUsize>,
        rerank_calls: Arc<AtomicUsize>,
        store_path: std::path::PathBuf,
    }

    impl Drop for TestHarness {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.store_path);
        }
    }

    fn build_harness(tag: &str, chunk_size: Option<usize>) -> TestHarness {
        let embedding_calls = Arc::new(AtomicUsize::new(0));
        let rerank_calls = Arc::new(AtomicUsize::new(0));
        let store_path = std::env::temp_dir().join(format!(
            "docuseek-service-{tag}-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&store_path);

        let service = ProcessingService::with_components(
            Box::new(CountingEmbeddingClient {
                inner: HashEmbeddingClient::new(32),
                calls: embedding_calls.clone(),
            }),
            Box::new(CountingRerankClient {
                inner: LexicalRerankClient::new(),
                calls: rerank_calls.clone(),
            }),
            None,
            DocumentStore::open(&store_path).expect("store opens"),
            RetrievalSettings {
                chunking_policy: ChunkingPolicy::Paragraph,
                chunk_size,
                chunk_overlap: None,
                k_per_expansion: 20,
                final_k: 5,
                max_k: 20,
                summary_max_words: 120,
                generation_model: None,
            },
        );

        TestHarness {
            service,
            embedding_calls,
            rerank_calls,
            store_path,
        }
    }

    #[tokio::test]
    async fn retrieve_before_ingest_is_empty_and_calls_no_providers() {
        let harness = build_harness("no-index", None);
        let chunks = harness
            .service
            .retrieve("anything", 5)
            .await
            .expect("retrieval succeeds");

        assert!(chunks.is_empty());
        assert_eq!(harness.embedding_calls.load(Ordering::Relaxed), 0);
        assert_eq!(harness.rerank_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn empty_document_is_rejected_and_clears_index() {
        let harness = build_harness("empty-doc", None);
        harness
            .service
            .ingest_document(Some("doc.txt".into()), "body text".into())
            .await
            .expect("first ingest succeeds");

        let error = harness
            .service
            .ingest_document(Some("doc.txt".into()), "   \n  ".into())
            .await
            .expect_err("empty ingest rejected");
        assert!(matches!(error, IngestError::EmptyDocument));

        let chunks = harness
            .service
            .retrieve("body", 5)
            .await
            .expect("retrieval succeeds");
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn retrieval_ranks_keyword_match_first() {
        let harness = build_harness("keyword", Some(2));
        let outcome = harness
            .service
            .ingest_document(Some("letters.txt".into()), "A.\nB.\nC.".into())
            .await
            .expect("ingest succeeds");
        assert_eq!(outcome.chunk_count, 3);

        let chunks = harness
            .service
            .retrieve("B", 5)
            .await
            .expect("retrieval succeeds");
        assert_eq!(chunks.first().map(|c| c.text.as_str()), Some("B."));
    }

    #[tokio::test]
    async fn expansion_recall_returns_synonym_chunk() {
        let harness = build_harness("synonym", None);
        harness
            .service
            .ingest_document(
                Some("bio.txt".into()),
                "The mitochondria is also called the powerhouse.".into(),
            )
            .await
            .expect("ingest succeeds");

        let chunks = harness
            .service
            .retrieve("What is another name for mitochondria?", 5)
            .await
            .expect("retrieval succeeds");
        assert_eq!(
            chunks.first().map(|c| c.text.as_str()),
            Some("The mitochondria is also called the powerhouse.")
        );
    }

    #[tokio::test]
    async fn duplicate_recalls_across_expansions_collapse_to_one() {
        let harness = build_harness("dedupe", None);
        harness
            .service
            .ingest_document(
                Some("single.txt".into()),
                "The mitochondria is also called the powerhouse.".into(),
            )
            .await
            .expect("ingest succeeds");

        // Every expansion recalls the single indexed chunk; the final set holds it once.
        let chunks = harness
            .service
            .retrieve("What is another name for mitochondria?", 5)
            .await
            .expect("retrieval succeeds");
        assert_eq!(chunks.len(), 1);
        assert!(harness.embedding_calls.load(Ordering::Relaxed) > 1);
    }

    #[tokio::test]
    async fn repeated_ingest_yields_identical_results() {
        let harness = build_harness("idempotent", Some(2));
        let text = "A.\nB.\nC.";

        harness
            .service
            .ingest_document(Some("letters.txt".into()), text.into())
            .await
            .expect("ingest succeeds");
        let first = harness
            .service
            .retrieve("B", 5)
            .await
            .expect("retrieval succeeds");

        harness
            .service
            .ingest_document(Some("letters.txt".into()), text.into())
            .await
            .expect("re-ingest succeeds");
        let second = harness
            .service
            .retrieve("B", 5)
            .await
            .expect("retrieval succeeds");

        let first_texts: Vec<&str> = first.iter().map(|c| c.text.as_str()).collect();
        let second_texts: Vec<&str> = second.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(first_texts, second_texts);
    }

    #[tokio::test]
    async fn query_without_generation_returns_fallback_answer() {
        let harness = build_harness("fallback", None);
        harness
            .service
            .ingest_document(Some("doc.txt".into()), "Some indexed content.".into())
            .await
            .expect("ingest succeeds");

        let outcome = harness
            .service
            .query("indexed content".into(), None)
            .await
            .expect("query succeeds");
        assert!(!outcome.chunks.is_empty());
        assert_eq!(
            outcome.answer,
            crate::processing::answer::UNCONFIGURED_FALLBACK
        );
    }

    #[tokio::test]
    async fn query_with_no_index_uses_no_context_fallback() {
        let harness = build_harness("no-context", None);
        let outcome = harness
            .service
            .query("anything".into(), None)
            .await
            .expect("query succeeds");
        assert!(outcome.chunks.is_empty());
        assert_eq!(outcome.answer, crate::processing::answer::NO_CONTEXT_FALLBACK);
    }

    #[tokio::test]
    async fn ingest_assigns_sequential_document_ids() {
        let harness = build_harness("ids", None);
        let first = harness
            .service
            .ingest_document(Some("a.txt".into()), "First document body.".into())
            .await
            .expect("ingest succeeds");
        let second = harness
            .service
            .ingest_document(Some("b.txt".into()), "Second document body.".into())
            .await
            .expect("ingest succeeds");

        assert_eq!(first.document_id, "DOC_001");
        assert_eq!(second.document_id, "DOC_002");
        assert_eq!(harness.service.list_documents().len(), 2);
    }
}
