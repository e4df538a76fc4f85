//! Retrieval bounds and ordering over a small recipe index.

use super::fakes::{manager_with, ready_dir, CountingOpener, RECIPES};
use crate::rag::Retriever;
use cookbook_core::AppError;
use std::sync::Arc;

fn assert_non_increasing(scores: &[f32]) {
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1], "scores out of order: {:?}", scores);
    }
}

#[tokio::test]
async fn test_returns_at_most_k_best_first() {
    let dir = ready_dir();
    let retriever = Retriever::new(manager_with(&dir, Arc::new(CountingOpener::new())));

    for k in [1, 2, 3] {
        let results = retriever.retrieve("how do I make bread?", k).await.unwrap();
        assert_eq!(results.len(), k);
        let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
        assert_non_increasing(&scores);
    }

    let all = retriever.retrieve("how do I make bread?", 50).await.unwrap();
    assert_eq!(all.len(), RECIPES.len());
}

#[tokio::test]
async fn test_relevant_recipe_ranks_first() {
    let dir = ready_dir();
    let retriever = Retriever::new(manager_with(&dir, Arc::new(CountingOpener::new())));

    let bread = retriever.retrieve("how do I make bread?", 3).await.unwrap();
    assert!(bread[0].chunk.text.starts_with("Recipe B"));

    let soup = retriever.retrieve("tomato soup with basil", 3).await.unwrap();
    assert!(soup[0].chunk.text.starts_with("Recipe C"));
}

#[tokio::test]
async fn test_empty_index_returns_nothing() {
    let dir = ready_dir();
    let retriever = Retriever::new(manager_with(&dir, Arc::new(CountingOpener::with_recipes(&[]))));

    let results = retriever.retrieve("how do I make bread?", 5).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_zero_k_is_invalid() {
    let dir = ready_dir();
    let opener = Arc::new(CountingOpener::new());
    let retriever = Retriever::new(manager_with(&dir, opener.clone()));

    assert!(matches!(
        retriever.retrieve("bread", 0).await,
        Err(AppError::InvalidInput(_))
    ));
    assert_eq!(opener.opens(), 0);
}
