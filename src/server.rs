//! HTTP API for the question-answering service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/query` | Answer a question, optionally with conversation history |
//! | `POST` | `/reload` | Clear the index and re-ingest the documents root |
//! | `GET`  | `/status` | Number of indexed chunks |
//! | `DELETE` | `/clear` | Clear the index |
//! | `POST` | `/upload` | Add one base64-encoded document to the knowledge base |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `ingestion_error` (400),
//! `retrieval_error` (500), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::agent::Agent;
use crate::config::Config;
use crate::error::Error;
use crate::ingest;
use crate::loader::DocumentLoader;
use crate::models::{ChatResult, ConversationTurn};
use crate::splitter::TextSplitter;
use crate::store::VectorStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<VectorStore>,
    pub agent: Arc<Agent>,
    pub splitter: Arc<TextSplitter>,
    pub loader: Arc<DocumentLoader>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let (status, code) = match &e {
            Error::Config(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::Ingestion { .. } => (StatusCode::BAD_REQUEST, "ingestion_error"),
            Error::Embedding(_) | Error::Retrieval(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "retrieval_error")
            }
            Error::Generation { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        Self {
            status,
            code,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    conversation_history: Option<Vec<ConversationTurn>>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    chunk_count: usize,
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    status: &'static str,
    document_count: usize,
    chunk_count: usize,
    skipped: usize,
    message: String,
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    filename: String,
    content_base64: String,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    status: &'static str,
    filename: String,
    chunks: usize,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<ChatResult>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }

    let result = state
        .agent
        .chat(&req.query, req.conversation_history.as_deref())
        .await?;
    Ok(Json(result))
}

async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let report = ingest::reload(&state.store, &state.splitter, &state.loader).await?;

    Ok(Json(ReloadResponse {
        status: if report.document_count == 0 {
            "warning"
        } else {
            "success"
        },
        document_count: report.document_count,
        chunk_count: report.chunk_count,
        skipped: report.skipped,
        message: format!(
            "loaded {} documents into {} chunks ({} skipped)",
            report.document_count, report.chunk_count, report.skipped
        ),
    }))
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let chunk_count = state.store.count().await?;
    Ok(Json(StatusResponse {
        status: "running",
        chunk_count,
    }))
}

async fn clear(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.clear().await?;
    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "knowledge base cleared",
    })))
}

async fn upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    if req.filename.is_empty()
        || req.filename == ".."
        || req.filename.contains('/')
        || req.filename.contains('\\')
    {
        return Err(ApiError::bad_request("filename must be a bare file name"));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&req.content_base64)
        .map_err(|e| ApiError::bad_request(format!("invalid base64 content: {e}")))?;

    // File write and PDF/DOCX extraction are blocking; keep them off the
    // async runtime.
    let root = state.config.documents.root.clone();
    let filename = req.filename.clone();
    let loader = state.loader.clone();
    let doc = tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&root).map_err(|e| ApiError::internal(e.to_string()))?;
        let path = root.join(&filename);
        std::fs::write(&path, bytes).map_err(|e| ApiError::internal(e.to_string()))?;
        loader.load_document(&path).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;

    let report = ingest::index_documents(&state.store, &state.splitter, &[doc]).await?;

    Ok(Json(UploadResponse {
        status: "success",
        filename: req.filename,
        chunks: report.chunk_count,
    }))
}

/// Build the application router. Separated from [`run_server`] so tests can
/// drive handlers without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .route("/reload", post(reload))
        .route("/status", get(status))
        .route("/clear", delete(clear))
        .route("/upload", post(upload))
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until the process terminates.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.server.bind.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::error::Result;
    use crate::index::MemoryIndex;
    use crate::llm::{ChatMessage, ChatParams, LlmAdapter};
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| vec![t.chars().count() as f32, 1.0])
                .collect())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StaticLlm;

    #[async_trait]
    impl LlmAdapter for StaticLlm {
        async fn chat(&self, _messages: &[ChatMessage], _params: &ChatParams) -> Result<String> {
            Ok("stub answer".to_string())
        }

        fn model_name(&self) -> String {
            "stub/model".to_string()
        }
    }

    fn state(root: &Path) -> AppState {
        let mut config: Config = toml::from_str("").unwrap();
        config.documents.root = root.to_path_buf();

        let store = Arc::new(VectorStore::new(
            Arc::new(StubEmbedder),
            Arc::new(MemoryIndex::new()),
        ));
        let agent = Arc::new(Agent::new(
            store.clone(),
            Box::new(StaticLlm),
            config.retrieval.top_k,
            &config.llm,
        ));
        let splitter = Arc::new(TextSplitter::new(1000, 200).unwrap());
        let loader = Arc::new(DocumentLoader::new(root));

        AppState {
            config: Arc::new(config),
            store,
            agent,
            splitter,
            loader,
        }
    }

    fn encode(content: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(content)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let tmp = TempDir::new().unwrap();
        let state = state(tmp.path());

        let err = query(
            State(state),
            Json(QueryRequest {
                query: "   ".to_string(),
                conversation_history: None,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_bare_filenames() {
        let tmp = TempDir::new().unwrap();
        let state = state(tmp.path());

        for filename in ["a/b.txt", "..\\evil.txt", "..", ""] {
            let err = upload(
                State(state.clone()),
                Json(UploadRequest {
                    filename: filename.to_string(),
                    content_base64: encode("body"),
                }),
            )
            .await
            .unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "accepted {filename:?}");
            assert_eq!(err.code, "bad_request");
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_invalid_base64() {
        let tmp = TempDir::new().unwrap();
        let state = state(tmp.path());

        let err = upload(
            State(state),
            Json(UploadRequest {
                filename: "notes.txt".to_string(),
                content_base64: "not base64 at all!!".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
    }

    #[tokio::test]
    async fn test_upload_writes_and_indexes_document() {
        let tmp = TempDir::new().unwrap();
        let state = state(tmp.path());

        let response = upload(
            State(state.clone()),
            Json(UploadRequest {
                filename: "notes.txt".to_string(),
                content_base64: encode("uploaded document body"),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.0.status, "success");
        assert_eq!(response.0.filename, "notes.txt");
        assert_eq!(response.0.chunks, 1);
        assert!(tmp.path().join("notes.txt").exists());
        assert_eq!(state.store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reload_response_reports_counts() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "alpha body").unwrap();
        let state = state(tmp.path());

        let response = reload(State(state)).await.unwrap();
        assert_eq!(response.0.status, "success");
        assert_eq!(response.0.document_count, 1);
        assert_eq!(response.0.chunk_count, 1);
        assert_eq!(response.0.skipped, 0);
    }

    #[tokio::test]
    async fn test_reload_of_empty_root_warns() {
        let tmp = TempDir::new().unwrap();
        let state = state(tmp.path());

        let response = reload(State(state)).await.unwrap();
        assert_eq!(response.0.status, "warning");
        assert_eq!(response.0.document_count, 0);
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let api_err = ApiError::from(Error::Retrieval("index unavailable".to_string()));
        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(api_err.into_response()).await;
        assert_eq!(json["error"]["code"], "retrieval_error");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("index unavailable"));
    }

    #[test]
    fn test_error_variant_status_mapping() {
        let cases = [
            (Error::Config("bad".into()), StatusCode::BAD_REQUEST, "bad_request"),
            (
                Error::Ingestion {
                    path: "x.pdf".into(),
                    reason: "corrupt".into(),
                },
                StatusCode::BAD_REQUEST,
                "ingestion_error",
            ),
            (
                Error::Embedding("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "retrieval_error",
            ),
            (
                Error::Generation {
                    provider: "openai".into(),
                    reason: "quota".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];
        for (err, status, code) in cases {
            let api_err = ApiError::from(err);
            assert_eq!(api_err.status, status);
            assert_eq!(api_err.code, code);
        }
    }
}
