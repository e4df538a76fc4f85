//! Index manager readiness and once-only construction.

use super::fakes::{manager_with, ready_dir, CountingOpener};
use crate::index_manager::{IndexLocation, IndexManager};
use crate::rag::Retriever;
use cookbook_core::AppError;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_handle_constructed_once() {
    let dir = ready_dir();
    let opener = Arc::new(CountingOpener::new());
    let manager = manager_with(&dir, opener.clone());

    assert!(manager.is_ready());
    manager.get_handle().await.unwrap();
    manager.get_handle().await.unwrap();
    manager.init().await.unwrap();

    assert_eq!(opener.opens(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_callers_share_one_construction() {
    let dir = ready_dir();
    let opener = Arc::new(CountingOpener::new());
    let manager = manager_with(&dir, opener.clone());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_handle().await.map(|_| ()) })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        task.unwrap().unwrap();
    }
    assert_eq!(opener.opens(), 1);
}

#[tokio::test]
async fn test_failed_construction_is_not_cached() {
    let dir = ready_dir();
    let opener = Arc::new(CountingOpener::failing_first());
    let manager = manager_with(&dir, opener.clone());

    assert!(matches!(
        manager.get_handle().await,
        Err(AppError::Knowledge(_))
    ));
    manager.get_handle().await.unwrap();
    manager.get_handle().await.unwrap();

    assert_eq!(opener.opens(), 2);
}

#[tokio::test]
async fn test_missing_index_is_not_ready() {
    let temp = TempDir::new().unwrap();
    let opener = Arc::new(CountingOpener::new());
    let manager = Arc::new(IndexManager::new(
        IndexLocation::new(temp.path().join("vectorstore/lancedb"), "cookbook-recipes"),
        opener.clone(),
    ));
    let retriever = Retriever::new(manager.clone());

    let err = retriever
        .retrieve("how do I make bread?", 5)
        .await
        .unwrap_err();
    assert!(err.is_not_ready());
    assert!(err.to_string().contains("cookbook ingest"));
    assert!(!manager.is_ready());
    assert_eq!(opener.opens(), 0);
}

#[tokio::test]
async fn test_empty_index_dir_is_not_ready() {
    let temp = TempDir::new().unwrap();
    let opener = Arc::new(CountingOpener::new());
    let manager = manager_with(&temp, opener.clone());

    assert!(!manager.is_ready());
    assert!(manager.get_handle().await.unwrap_err().is_not_ready());

    let stats = manager.stats().await.unwrap();
    assert!(!stats.ready);
    assert_eq!(stats.rows, 0);
}

#[tokio::test]
async fn test_stats_counts_rows() {
    let dir = ready_dir();
    let manager = manager_with(&dir, Arc::new(CountingOpener::new()));

    let stats = manager.stats().await.unwrap();
    assert!(stats.ready);
    assert_eq!(stats.rows, super::fakes::RECIPES.len());
    assert_eq!(stats.collection, "cookbook-recipes");
}
