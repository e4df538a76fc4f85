//! Lazily opened, process-wide index handle.
//!
//! The [`IndexManager`] is Unready until the first successful
//! [`IndexManager::get_handle`]; from then on it hands out the cached handle.
//! Opening is delegated to an [`IndexOpener`] and runs at most once, even
//! when several requests arrive before the index is open. A failed open is
//! not cached, so a later call retries after `cookbook ingest` has run.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::store::{LanceDbStore, VectorStore};
use crate::types::{IndexStats, RetrievalResult};
use cookbook_core::{AppConfig, AppError, AppResult, EmbeddingConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Where a persisted collection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLocation {
    pub persist_dir: PathBuf,
    pub collection: String,
}

impl IndexLocation {
    pub fn new(persist_dir: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            persist_dir: persist_dir.into(),
            collection: collection.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.index_dir(), config.index.collection.clone())
    }

    /// A location is usable only if the directory exists and has entries.
    pub fn check_ready(&self) -> AppResult<()> {
        if !has_entries(&self.persist_dir) {
            return Err(not_ready(&self.persist_dir));
        }
        Ok(())
    }

    /// Read row counts straight from LanceDB, without an embedder.
    pub async fn inspect(&self) -> AppResult<IndexStats> {
        let exists = self.check_ready().is_ok()
            && LanceDbStore::collection_exists(&self.persist_dir, &self.collection).await?;

        let rows = if exists {
            Some(
                LanceDbStore::open(&self.persist_dir, &self.collection)
                    .await?
                    .count()
                    .await?,
            )
        } else {
            None
        };

        Ok(IndexStats {
            collection: self.collection.clone(),
            location: self.persist_dir.clone(),
            ready: rows.is_some(),
            rows: rows.unwrap_or(0),
        })
    }
}

fn has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn not_ready(dir: &Path) -> AppError {
    AppError::NotReady(format!(
        "No cookbook index found at {}. Run `cookbook ingest` to build it.",
        dir.display()
    ))
}

/// An opened collection plus the embedder that produced its vectors.
#[derive(Clone)]
pub struct IndexHandle {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("collection", &self.store.collection())
            .field("embedder", &self.embedder.model_name())
            .finish()
    }
}

impl IndexHandle {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed `query` and return the `k` most similar chunks, best first.
    pub async fn similarity_search(&self, query: &str, k: usize) -> AppResult<RetrievalResult> {
        let embedding = self.embedder.embed(query).await?;
        self.store.search(&embedding, k).await
    }
}

/// Constructs an index handle for a location.
#[async_trait::async_trait]
pub trait IndexOpener: Send + Sync {
    async fn open(&self, location: &IndexLocation) -> AppResult<IndexHandle>;
}

/// Opens persisted LanceDB collections with the configured embedder.
#[derive(Debug, Clone)]
pub struct LanceDbOpener {
    embedding: EmbeddingConfig,
    api_key: Option<String>,
}

impl LanceDbOpener {
    pub fn new(embedding: EmbeddingConfig, api_key: Option<String>) -> Self {
        Self { embedding, api_key }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.embedding.clone(), config.api_key.clone())
    }
}

#[async_trait::async_trait]
impl IndexOpener for LanceDbOpener {
    async fn open(&self, location: &IndexLocation) -> AppResult<IndexHandle> {
        if !LanceDbStore::collection_exists(&location.persist_dir, &location.collection).await? {
            return Err(AppError::NotReady(format!(
                "Collection '{}' does not exist in {}. Run `cookbook ingest` to build it.",
                location.collection,
                location.persist_dir.display()
            )));
        }

        let store = LanceDbStore::open(&location.persist_dir, &location.collection).await?;
        let embedder = create_provider(&self.embedding, self.api_key.as_deref())?;

        if embedder.dimensions() != store.dimensions() {
            return Err(AppError::Config(format!(
                "Collection '{}' holds {}-dimensional vectors but embedding model '{}' produces {}. \
                 Re-run `cookbook ingest --fresh` or fix the embedding settings.",
                location.collection,
                store.dimensions(),
                embedder.model_name(),
                embedder.dimensions()
            )));
        }

        Ok(IndexHandle::new(Arc::new(store), embedder))
    }
}

/// Owns the index handle for the lifetime of the process.
pub struct IndexManager {
    location: IndexLocation,
    opener: Arc<dyn IndexOpener>,
    handle: OnceCell<IndexHandle>,
}

impl IndexManager {
    pub fn new(location: IndexLocation, opener: Arc<dyn IndexOpener>) -> Self {
        Self {
            location,
            opener,
            handle: OnceCell::new(),
        }
    }

    /// Manager over the configured LanceDB collection.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            IndexLocation::from_config(config),
            Arc::new(LanceDbOpener::from_config(config)),
        )
    }

    pub fn location(&self) -> &IndexLocation {
        &self.location
    }

    /// Return the cached handle, opening the index on first use.
    pub async fn get_handle(&self) -> AppResult<&IndexHandle> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle);
        }

        self.location.check_ready()?;

        self.handle
            .get_or_try_init(|| async {
                tracing::info!(
                    "Opening index '{}' at {}",
                    self.location.collection,
                    self.location.persist_dir.display()
                );
                self.opener.open(&self.location).await
            })
            .await
    }

    /// Open the index eagerly, e.g. before a command starts writing output.
    pub async fn init(&self) -> AppResult<()> {
        self.get_handle().await.map(|_| ())
    }

    /// Cheap readiness check that never opens the index.
    ///
    /// Not used by the CLI; it is for library callers such as a service
    /// reporting readiness without paying the first open.
    pub fn is_ready(&self) -> bool {
        self.handle.initialized() || self.location.check_ready().is_ok()
    }

    /// Row count and readiness of the managed collection.
    pub async fn stats(&self) -> AppResult<IndexStats> {
        let rows = match self.get_handle().await {
            Ok(handle) => Some(handle.store().count().await?),
            Err(e) if e.is_not_ready() => None,
            Err(e) => return Err(e),
        };

        Ok(IndexStats {
            collection: self.location.collection.clone(),
            location: self.location.persist_dir.clone(),
            ready: rows.is_some(),
            rows: rows.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_and_empty_locations_are_not_ready() {
        let temp = TempDir::new().unwrap();

        let missing = IndexLocation::new(temp.path().join("lancedb"), "cookbook-recipes");
        assert!(missing.check_ready().unwrap_err().is_not_ready());

        std::fs::create_dir_all(&missing.persist_dir).unwrap();
        let err = missing.check_ready().unwrap_err();
        assert!(err.is_not_ready());
        assert!(err.to_string().contains("cookbook ingest"));

        std::fs::write(missing.persist_dir.join("marker"), b"x").unwrap();
        assert!(missing.check_ready().is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lancedb_opener_missing_collection() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("lancedb");
        LanceDbStore::open_or_create(&dir, "other", 8).await.unwrap();

        let opener = LanceDbOpener::new(
            EmbeddingConfig {
                provider: "trigram".to_string(),
                dimensions: 8,
                ..Default::default()
            },
            None,
        );
        let manager = IndexManager::new(
            IndexLocation::new(&dir, "cookbook-recipes"),
            Arc::new(opener),
        );

        assert!(manager.is_ready());
        assert!(manager.get_handle().await.unwrap_err().is_not_ready());
        assert!(!manager.location().inspect().await.unwrap().ready);

        let stats = manager.stats().await.unwrap();
        assert!(!stats.ready);
        assert_eq!(stats.rows, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lancedb_opener_dimension_mismatch() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("lancedb");
        LanceDbStore::open_or_create(&dir, "cookbook-recipes", 16)
            .await
            .unwrap();

        let opener = LanceDbOpener::new(
            EmbeddingConfig {
                provider: "trigram".to_string(),
                dimensions: 8,
                ..Default::default()
            },
            None,
        );
        let manager = IndexManager::new(
            IndexLocation::new(&dir, "cookbook-recipes"),
            Arc::new(opener),
        );

        assert!(matches!(
            manager.get_handle().await,
            Err(AppError::Config(_))
        ));

        let inspected = manager.location().inspect().await.unwrap();
        assert!(inspected.ready);
        assert_eq!(inspected.rows, 0);
    }
}
