//! Core data models used throughout docqa.
//!
//! These types represent the documents, chunks, retrieval results, and
//! conversation turns that flow through the ingestion and answering pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Supported source document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Pdf,
    Docx,
    Md,
    Txt,
}

impl DocType {
    /// Map a lowercase file extension to a document type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Docx),
            "md" => Some(Self::Md),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

/// A loaded source document, immutable once constructed.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub source_path: PathBuf,
    pub content: String,
    pub doc_type: DocType,
}

/// Provenance metadata attached to every chunk.
///
/// `filename` + `chunk_index` is unique within one load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub source_path: PathBuf,
    pub doc_type: DocType,
    pub chunk_index: usize,
}

/// A bounded contiguous slice of a document's text, tagged with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A scored chunk returned from a similarity query, most similar first
/// (ascending distance). Produced fresh per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedResult {
    pub content: String,
    pub metadata: ChunkMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

/// Speaker role within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of dialogue history. The caller owns its history; the agent
/// only reads and windows a copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// The packaged outcome of one `chat()` call.
///
/// Invariant: `has_context` is true exactly when the answer was grounded on
/// a non-empty retrieved context, in which case `retrieved_docs` is the
/// evidence the context was assembled from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub answer: String,
    pub retrieved_docs: Vec<RetrievedResult>,
    pub has_context: bool,
}

/// Outcome of a full load-and-index pass.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Documents successfully loaded and indexed.
    pub document_count: usize,
    /// Chunks produced and indexed across all documents.
    pub chunk_count: usize,
    /// Files skipped because they could not be read or parsed.
    pub skipped: usize,
}
