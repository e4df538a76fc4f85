//! Top-k similarity retrieval against the managed index.

use crate::index_manager::IndexManager;
use crate::types::RetrievalResult;
use cookbook_core::{AppError, AppResult};
use std::sync::Arc;

/// Looks up the chunks most similar to a question.
#[derive(Clone)]
pub struct Retriever {
    manager: Arc<IndexManager>,
}

impl Retriever {
    pub fn new(manager: Arc<IndexManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<IndexManager> {
        &self.manager
    }

    /// Return at most `k` chunks ordered by descending similarity.
    ///
    /// Fails with `NotReady` while no index has been built. An empty
    /// collection yields an empty result.
    pub async fn retrieve(&self, question: &str, k: usize) -> AppResult<RetrievalResult> {
        if k == 0 {
            return Err(AppError::InvalidInput("k must be at least 1".to_string()));
        }

        let handle = self.manager.get_handle().await?;
        let results = handle.similarity_search(question, k).await?;

        if let (Some(top), Some(lowest)) = (results.first(), results.last()) {
            tracing::info!(
                "Retrieved {} chunks (top score: {:.3}, lowest: {:.3})",
                results.len(),
                top.score,
                lowest.score
            );
        } else {
            tracing::info!("No chunks retrieved for question");
        }

        Ok(results)
    }
}
