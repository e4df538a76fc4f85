//! Vector store abstraction for embedded chunks.
//!
//! Defines a trait for backend-agnostic storage and similarity search, with
//! a LanceDB implementation for persisted collections and an in-memory one.

pub mod lance;
pub mod memory;

pub use lance::LanceDbStore;
pub use memory::MemoryStore;

use crate::types::{ScoredChunk, StoredChunk};
use cookbook_core::AppResult;

/// Trait for vector store backends.
///
/// Implementations must support:
/// - Appending embedded chunks
/// - Top-k similarity search, best match first
/// - Row counts
/// - Clearing the collection
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Collection name.
    fn collection(&self) -> &str;

    /// Append rows, returning how many were written.
    async fn insert(&self, rows: &[StoredChunk]) -> AppResult<usize>;

    /// Return at most `k` chunks ordered by descending cosine similarity.
    async fn search(&self, query_embedding: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>>;

    /// Number of rows in the collection.
    async fn count(&self) -> AppResult<usize>;

    /// Remove every row, keeping the collection itself.
    async fn reset(&self) -> AppResult<()>;
}

/// Cosine similarity between two vectors; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Order by descending score (earlier chunks first on ties) and keep `k`.
pub(crate) fn rank(mut scored: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    scored.truncate(k);
    scored
}
