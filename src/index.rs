//! Similarity-index abstraction.
//!
//! The [`VectorIndex`] trait is the seam between the retrieval pipeline and
//! whatever nearest-neighbor engine backs it. The shipped implementation,
//! [`MemoryIndex`], is a brute-force cosine index behind a `RwLock` —
//! adequate for a per-process knowledge base and for tests.
//!
//! The index gives no ordering guarantee under concurrent `upsert` /
//! `recreate` / `nearest`; callers needing strict consistency must
//! serialize those operations themselves.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::ChunkMetadata;

/// A stored point: identifier, embedding vector, and the chunk it came from.
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A scored point returned from a nearest-neighbor query.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance (`1 - cosine similarity`), smaller is more similar.
    pub distance: f32,
}

/// Abstract nearest-neighbor store.
///
/// All operations are async: real backends are network services, and the
/// in-memory implementation returns immediately-ready futures.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace points by id.
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()>;

    /// Return up to `top_k` points ordered ascending by distance.
    async fn nearest(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredPoint>>;

    /// Destroy and recreate the backing collection. Identifiers issued
    /// before this call become invalid.
    async fn recreate(&self) -> Result<()>;

    /// Number of stored points.
    async fn count(&self) -> Result<usize>;
}

/// Brute-force in-memory cosine index.
pub struct MemoryIndex {
    points: RwLock<Vec<IndexPoint>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            points: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        let mut stored = self
            .points
            .write()
            .map_err(|_| Error::Retrieval("index lock poisoned".to_string()))?;
        for point in points {
            stored.retain(|p| p.id != point.id);
            stored.push(point);
        }
        Ok(())
    }

    async fn nearest(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredPoint>> {
        let stored = self
            .points
            .read()
            .map_err(|_| Error::Retrieval("index lock poisoned".to_string()))?;

        let mut scored: Vec<ScoredPoint> = stored
            .iter()
            .map(|p| ScoredPoint {
                content: p.content.clone(),
                metadata: p.metadata.clone(),
                distance: 1.0 - cosine_similarity(query, &p.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    async fn recreate(&self) -> Result<()> {
        let mut stored = self
            .points
            .write()
            .map_err(|_| Error::Retrieval("index lock poisoned".to_string()))?;
        stored.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let stored = self
            .points
            .read()
            .map_err(|_| Error::Retrieval("index lock poisoned".to_string()))?;
        Ok(stored.len())
    }
}
