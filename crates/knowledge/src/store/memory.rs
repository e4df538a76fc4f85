//! In-memory vector store with exhaustive cosine search.

use super::{cosine_similarity, rank, VectorStore};
use crate::types::{ScoredChunk, StoredChunk};
use cookbook_core::AppResult;
use tokio::sync::RwLock;

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collection: String,
    rows: RwLock<Vec<StoredChunk>>,
}

impl MemoryStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            rows: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn insert(&self, rows: &[StoredChunk]) -> AppResult<usize> {
        self.rows.write().await.extend_from_slice(rows);
        Ok(rows.len())
    }

    async fn search(&self, query_embedding: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>> {
        let rows = self.rows.read().await;
        let scored = rows
            .iter()
            .map(|row| ScoredChunk {
                chunk: row.chunk.clone(),
                score: cosine_similarity(query_embedding, &row.embedding),
            })
            .collect();
        Ok(rank(scored, k))
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.rows.read().await.len())
    }

    async fn reset(&self) -> AppResult<()> {
        self.rows.write().await.clear();
        Ok(())
    }
}
