//! Dense vector index seam.
//!
//! The retriever talks to vector storage through [`VectorIndex`] so the
//! production deployment can point at a managed vector database while
//! tests and single-node setups use the in-memory index. Failures here are
//! survivable: the retriever degrades to BM25-only.

use async_trait::async_trait;

use crate::error::{ForgeError, ForgeResult};

/// A scored hit from the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub pattern_id: String,
    /// Cosine similarity in [-1, 1].
    pub similarity: f64,
}

/// Read-only dense index keyed by pattern id. Implementations must
/// tolerate concurrent queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Score every indexed pattern against the query embedding, best first.
    async fn query(&self, embedding: &[f32], k: usize) -> ForgeResult<Vec<VectorHit>>;

    /// Number of indexed entries.
    async fn count(&self) -> ForgeResult<usize>;
}

/// Cosine similarity; 0.0 for mismatched or empty inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for i in 0..a.len() {
        let (x, y) = (a[i] as f64, b[i] as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

/// In-memory index over curated embeddings.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    entries: Vec<(String, Vec<f32>)>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern_id: impl Into<String>, embedding: Vec<f32>) {
        self.entries.push((pattern_id.into(), embedding));
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn query(&self, embedding: &[f32], k: usize) -> ForgeResult<Vec<VectorHit>> {
        let mut hits: Vec<VectorHit> = self
            .entries
            .iter()
            .map(|(id, vec)| VectorHit {
                pattern_id: id.clone(),
                similarity: cosine_similarity(embedding, vec),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.pattern_id.cmp(&b.pattern_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> ForgeResult<usize> {
        Ok(self.entries.len())
    }
}

/// Test double that always fails, standing in for an unreachable remote
/// index.
#[derive(Debug, Default)]
pub struct UnreachableVectorIndex;

#[async_trait]
impl VectorIndex for UnreachableVectorIndex {
    async fn query(&self, _embedding: &[f32], _k: usize) -> ForgeResult<Vec<VectorHit>> {
        Err(ForgeError::UpstreamUnavailable(
            "vector index: connection refused".into(),
        ))
    }

    async fn count(&self) -> ForgeResult<usize> {
        Err(ForgeError::UpstreamUnavailable(
            "vector index: connection refused".into(),
        ))
    }
}
