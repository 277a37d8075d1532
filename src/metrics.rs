use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and query activity.
#[derive(Default)]
pub struct ServiceMetrics {
    documents_ingested: AtomicU64,
    chunks_indexed: AtomicU64,
    queries_answered: AtomicU64,
    // 0 means "no document processed yet"; chunk sizes are always >= 1.
    last_chunk_size: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed document, its chunk count, and the chunk size used.
    pub fn record_document(&self, chunk_count: u64, chunk_size: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
        self.last_chunk_size.store(chunk_size, Ordering::Relaxed);
    }

    /// Record a completed query.
    pub fn record_query(&self) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_chunk_size = match self.last_chunk_size.load(Ordering::Relaxed) {
            0 => None,
            value => Some(value),
        };
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            queries_answered: self.queries_answered.load(Ordering::Relaxed),
            last_chunk_size,
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents that have been ingested since startup.
    pub documents_ingested: u64,
    /// Total chunk count produced across all ingested documents.
    pub chunks_indexed: u64,
    /// Number of queries answered since startup.
    pub queries_answered: u64,
    /// Chunk size used by the most recent ingestion, when any occurred.
    pub last_chunk_size: Option<u64>,
}
