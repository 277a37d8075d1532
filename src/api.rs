//! HTTP surface for Docuseek.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /documents` – Ingest extracted document text: summarize and categorize it, persist a
//!   document record, and rebuild the retrieval index.
//! - `GET /documents` – List stored document records (without the full text).
//! - `POST /query` – Answer a free-text question from the indexed document, returning the
//!   synthesized answer together with the reranked context chunks.
//! - `GET /metrics` – Observe ingestion/query counters and the last chunk size used.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Pipeline failures are logged with their full kind and cause, but callers only ever see a
//! generic service error with a safe message.

use crate::metrics::MetricsSnapshot;
use crate::processing::{IngestError, ProcessingApi, RetrievalError, RetrievedChunk};
use crate::store::DocumentListing;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the ingestion and query API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ProcessingApi + 'static,
{
    Router::new()
        .route(
            "/documents",
            get(list_documents::<S>).post(ingest_document::<S>),
        )
        .route("/query", post(query::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /documents` endpoint.
#[derive(Deserialize)]
struct IngestRequest {
    /// Extracted document text to summarize and index.
    text: String,
    /// Optional original filename recorded with the document.
    #[serde(default)]
    filename: Option<String>,
}

/// Success response for the `POST /documents` endpoint.
#[derive(Serialize)]
struct IngestResponse {
    /// Identifier assigned to the stored document record.
    document_id: String,
    /// Summary stored with the record.
    summary: String,
    /// Category label stored with the record.
    category: String,
    /// Number of chunks indexed for the document.
    chunks_indexed: usize,
    /// Effective chunk size used for this ingestion.
    chunk_size: usize,
    /// Number of duplicate chunks skipped within this request.
    skipped_duplicates: usize,
}

/// Ingest a document from extracted text.
///
/// The handler accepts raw text plus an optional filename, produces a summary and category
/// label, persists the record, and rebuilds the retrieval index from the text.
async fn ingest_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError>
where
    S: ProcessingApi,
{
    let IngestRequest { text, filename } = request;
    let outcome = service.ingest_document(filename, text).await?;
    tracing::info!(
        document_id = %outcome.document_id,
        chunks = outcome.chunk_count,
        chunk_size = outcome.chunk_size,
        skipped_duplicates = outcome.skipped_duplicates,
        "Ingest request completed"
    );
    Ok(Json(IngestResponse {
        document_id: outcome.document_id,
        summary: outcome.summary,
        category: outcome.category,
        chunks_indexed: outcome.chunk_count,
        chunk_size: outcome.chunk_size,
        skipped_duplicates: outcome.skipped_duplicates,
    }))
}

/// Request body for the `POST /query` endpoint.
#[derive(Deserialize)]
struct QueryRequest {
    /// Free-text question to answer from the indexed document.
    question: String,
    /// Optional number of context chunks to retrieve (clamped server-side).
    #[serde(default)]
    k: Option<usize>,
}

/// Response body for the `POST /query` endpoint.
#[derive(Serialize)]
struct QueryResponse {
    /// Synthesized answer text (or a fixed fallback).
    answer: String,
    /// Final reranked context chunks, most relevant first.
    chunks: Vec<RetrievedChunk>,
}

/// Answer a question from the indexed document.
async fn query<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError>
where
    S: ProcessingApi,
{
    let QueryRequest { question, k } = request;
    let outcome = service.query(question, k).await?;
    Ok(Json(QueryResponse {
        answer: outcome.answer,
        chunks: outcome.chunks,
    }))
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentListing>,
}

/// List stored document records.
async fn list_documents<S>(State(service): State<Arc<S>>) -> Json<DocumentsResponse>
where
    S: ProcessingApi,
{
    Json(DocumentsResponse {
        documents: service.list_documents(),
    })
}

/// Return a concise metrics snapshot with ingestion/query counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsResponse>
where
    S: ProcessingApi,
{
    let snapshot: MetricsSnapshot = service.metrics_snapshot();
    Json(MetricsResponse {
        documents_ingested: snapshot.documents_ingested,
        chunks_indexed: snapshot.chunks_indexed,
        queries_answered: snapshot.queries_answered,
        last_chunk_size: snapshot.last_chunk_size,
    })
}

/// Response body for `GET /metrics`.
#[derive(Serialize)]
struct MetricsResponse {
    documents_ingested: u64,
    chunks_indexed: u64,
    queries_answered: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_chunk_size: Option<u64>,
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ingest",
                method: "POST",
                path: "/documents",
                description: "Summarize, categorize, and index extracted document text. Response returns the assigned document id plus { \"chunks_indexed\": number, \"chunk_size\": number }.",
                request_example: Some(json!({
                    "text": "Extracted document contents",
                    "filename": "report.pdf"
                })),
            },
            CommandDescriptor {
                name: "query",
                method: "POST",
                path: "/query",
                description: "Answer a question from the indexed document. Response returns the synthesized answer and the reranked context chunks.",
                request_example: Some(json!({
                    "question": "What is another name for mitochondria?",
                    "k": 5
                })),
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/documents",
                description: "Return stored document records (id, filename, summary, category, date).",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion and query counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Ingest(IngestError),
    Retrieval(RetrievalError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the detailed kind and cause; surface only a safe generic message.
        let (status, message) = match &self {
            AppError::Ingest(IngestError::EmptyDocument) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "document contained no extractable text",
            ),
            AppError::Ingest(error) => {
                tracing::error!(error = %error, "Ingestion failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "document ingestion failed; see server logs",
                )
            }
            AppError::Retrieval(error) => {
                tracing::error!(error = %error, "Retrieval failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "query processing failed; see server logs",
                )
            }
        };
        (status, message).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self::Ingest(inner)
    }
}

impl From<RetrievalError> for AppError {
    fn from(inner: RetrievalError) -> Self {
        Self::Retrieval(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        IngestError, IngestOutcome, ProcessingApi, QueryOutcome, RetrievalError, RetrievedChunk,
    };
    use crate::store::DocumentListing;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_query_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let query = commands
            .iter()
            .find(|cmd| cmd.name == "query")
            .expect("query command present");

        assert_eq!(query.method, "POST");
        assert_eq!(query.path, "/query");
        assert!(query.description.to_lowercase().contains("answer"));

        // ensure catalog exposes multiple commands for host discovery
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn ingest_route_returns_record_fields() {
        let service = Arc::new(StubProcessingService::default());
        let app = create_router(service.clone());

        let payload = json!({
            "text": "Document body",
            "filename": "report.pdf"
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/documents")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["document_id"], "DOC_001");
        assert_eq!(json["category"], "Archives");
        assert_eq!(json["chunks_indexed"], 2);

        let calls = service.ingest_calls.lock().await.clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_deref(), Some("report.pdf"));
        assert_eq!(calls[0].1, "Document body");
    }

    #[tokio::test]
    async fn empty_document_maps_to_unprocessable_entity() {
        let service = Arc::new(StubProcessingService {
            reject_empty: true,
            ..Default::default()
        });
        let app = create_router(service);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/documents")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "text": "   " }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn query_route_returns_answer_and_chunks() {
        let service = Arc::new(StubProcessingService::default());
        let app = create_router(service.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/query")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({ "question": "What is X?", "k": 3 }).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["answer"], "Stub answer");
        assert_eq!(json["chunks"][0]["text"], "Stub chunk");

        let calls = service.query_calls.lock().await.clone();
        assert_eq!(calls, vec![("What is X?".to_string(), Some(3))]);
    }

    #[derive(Default)]
    struct StubProcessingService {
        reject_empty: bool,
        ingest_calls: Mutex<Vec<(Option<String>, String)>>,
        query_calls: Mutex<Vec<(String, Option<usize>)>>,
    }

    #[async_trait]
    impl ProcessingApi for StubProcessingService {
        async fn ingest_document(
            &self,
            filename: Option<String>,
            text: String,
        ) -> Result<IngestOutcome, IngestError> {
            if self.reject_empty && text.trim().is_empty() {
                return Err(IngestError::EmptyDocument);
            }
            self.ingest_calls.lock().await.push((filename, text));
            Ok(IngestOutcome {
                document_id: "DOC_001".into(),
                summary: "Stub summary".into(),
                category: "Archives".into(),
                chunk_count: 2,
                chunk_size: 800,
                skipped_duplicates: 0,
            })
        }

        async fn query(
            &self,
            question: String,
            k: Option<usize>,
        ) -> Result<QueryOutcome, RetrievalError> {
            self.query_calls.lock().await.push((question, k));
            Ok(QueryOutcome {
                answer: "Stub answer".into(),
                chunks: vec![RetrievedChunk {
                    text: "Stub chunk".into(),
                    distance: 0.5,
                    score: 0.9,
                }],
            })
        }

        fn list_documents(&self) -> Vec<DocumentListing> {
            Vec::new()
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_ingested: 0,
                chunks_indexed: 0,
                queries_answered: 0,
                last_chunk_size: None,
            }
        }
    }
}
