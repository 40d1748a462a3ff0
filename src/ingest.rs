//! Ingestion pipeline orchestration.
//!
//! Coordinates the full load flow: documents root → loader → splitter →
//! embed + index. Unreadable files are skipped and counted; the report
//! carries document, chunk, and skip counts for the caller.

use tracing::info;

use crate::error::Result;
use crate::loader::DocumentLoader;
use crate::models::{Document, LoadReport};
use crate::splitter::TextSplitter;
use crate::store::VectorStore;

/// Split a batch of already-loaded documents and index the chunks.
pub async fn index_documents(
    store: &VectorStore,
    splitter: &TextSplitter,
    documents: &[Document],
) -> Result<LoadReport> {
    let chunks = splitter.split_documents(documents);
    store.add(&chunks).await?;

    Ok(LoadReport {
        document_count: documents.len(),
        chunk_count: chunks.len(),
        skipped: 0,
    })
}

/// Full reload: clear the index, load every document under the root, split,
/// embed, and index.
pub async fn reload(
    store: &VectorStore,
    splitter: &TextSplitter,
    loader: &DocumentLoader,
) -> Result<LoadReport> {
    store.clear().await?;

    let batch = loader.load_all();
    let mut report = index_documents(store, splitter, &batch.documents).await?;
    report.skipped = batch.skipped;

    info!(
        documents = report.document_count,
        chunks = report.chunk_count,
        skipped = report.skipped,
        "knowledge base reloaded"
    );
    Ok(report)
}
