//! Retrieval client: the bridge between chunks and the similarity index.
//!
//! [`VectorStore`] owns the two injected collaborators of the retrieval
//! path — an [`EmbeddingProvider`] and a [`VectorIndex`] — and exposes the
//! four operations the rest of the system needs: `add`, `query`, `clear`,
//! and `count`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::index::{IndexPoint, VectorIndex};
use crate::models::{Chunk, RetrievedResult};

pub struct VectorStore {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed and index a batch of chunks.
    ///
    /// Contents are embedded in a single batch call. Each chunk receives an
    /// identifier derived from its ingestion-order position, offset by the
    /// current index size so successive `add` calls never collide. An empty
    /// batch is a no-op.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            debug!("no chunks to add");
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "embedding batch returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let offset = self.index.count().await?;
        let points: Vec<IndexPoint> = chunks
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk, vector))| IndexPoint {
                id: format!("chunk-{}", offset + i),
                vector,
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
            })
            .collect();

        self.index.upsert(points).await?;
        info!(count = chunks.len(), "indexed chunks");
        Ok(())
    }

    /// Retrieve up to `top_k` chunks similar to `text`, ascending by
    /// distance.
    ///
    /// An embedding failure here is a retrieval failure: a grounded answer
    /// without retrieval would be a correctness violation, so the error is
    /// propagated rather than absorbed.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedResult>> {
        let query_vec = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| Error::Retrieval(e.to_string()))?;

        let scored = self.index.nearest(&query_vec, top_k).await?;

        Ok(scored
            .into_iter()
            .map(|p| RetrievedResult {
                content: p.content,
                metadata: p.metadata,
                distance: Some(p.distance),
            })
            .collect())
    }

    /// Full reset: destroy and recreate the backing collection. All
    /// previously issued chunk identifiers become invalid.
    pub async fn clear(&self) -> Result<()> {
        self.index.recreate().await?;
        info!("vector index cleared");
        Ok(())
    }

    /// Number of indexed chunks. Zero is a valid state — it demotes answers
    /// to non-grounded mode rather than blocking them.
    pub async fn count(&self) -> Result<usize> {
        self.index.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::models::{ChunkMetadata, DocType};
    use async_trait::async_trait;
    use std::path::PathBuf;

    /// Deterministic test embedder: maps text to a small vector from
    /// character statistics, so similar strings land close together.
    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let len = t.chars().count() as f32;
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
                    let spaces = t.chars().filter(|c| *c == ' ').count() as f32;
                    vec![len, vowels, spaces]
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn chunk(content: &str, filename: &str, index: usize) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                filename: filename.to_string(),
                source_path: PathBuf::from(filename),
                doc_type: DocType::Txt,
                chunk_index: index,
            },
        }
    }

    fn store() -> VectorStore {
        VectorStore::new(Arc::new(StubEmbedder), Arc::new(MemoryIndex::new()))
    }

    #[tokio::test]
    async fn test_add_empty_is_noop() {
        let store = store();
        store.add(&[]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_then_query_returns_results() {
        let store = store();
        store
            .add(&[
                chunk("rust ownership rules", "rust.md", 0),
                chunk("python garbage collection", "python.md", 0),
            ])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);

        let results = store.query("rust ownership", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        let d0 = results[0].distance.unwrap();
        let d1 = results[1].distance.unwrap();
        assert!(d0 <= d1, "results not ascending by distance");
    }

    #[tokio::test]
    async fn test_successive_adds_do_not_collide() {
        let store = store();
        store.add(&[chunk("first batch", "a.txt", 0)]).await.unwrap();
        store.add(&[chunk("second batch", "b.txt", 0)]).await.unwrap();
        // Positional ids are offset by the index size, so both survive.
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_then_query_returns_empty() {
        let store = store();
        store.add(&[chunk("something", "a.txt", 0)]).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.query("something", 3).await.unwrap().is_empty());
    }
}
