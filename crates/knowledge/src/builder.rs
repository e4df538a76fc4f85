//! Offline index construction.
//!
//! [`IndexBuilder`] embeds chunks in batches and writes them to a vector
//! store in one insert. [`ingest`] runs the whole offline pipeline from
//! source document to persisted collection. Every embedding call succeeds
//! before the collection is created, cleared or appended to, so a provider
//! failure leaves the index exactly as it was.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::loader::load_pages;
use crate::progress::ProgressReporter;
use crate::splitter::ChunkSplitter;
use crate::store::{LanceDbStore, VectorStore};
use crate::types::{BuildStats, Chunk, IngestOptions, IngestStats, StoredChunk};
use cookbook_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Instant;

/// Embeds chunks and writes them to a collection.
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    progress: ProgressReporter,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Embed every chunk, batch by batch. Nothing is written.
    pub async fn embed(&self, chunks: &[Chunk]) -> AppResult<Vec<StoredChunk>> {
        let total = chunks.len() as u64;
        let mut rows = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Provider returned {} embeddings for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            rows.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(chunk, embedding)| StoredChunk::new(chunk, embedding)),
            );
            self.progress
                .embed(rows.len() as u64, total, self.embedder.model_name());
        }

        Ok(rows)
    }

    /// Append already embedded rows in a single insert.
    pub async fn write(&self, store: &dyn VectorStore, rows: &[StoredChunk]) -> AppResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let written = store.insert(rows).await?;
        self.progress
            .index(written as u64, rows.len() as u64, store.collection());

        tracing::info!("Indexed {} chunks into '{}'", written, store.collection());
        Ok(written)
    }

    /// Embed and persist every chunk.
    ///
    /// All-or-nothing: an embedding failure on any batch aborts before the
    /// store is touched.
    pub async fn build(&self, store: &dyn VectorStore, chunks: &[Chunk]) -> AppResult<BuildStats> {
        let rows = self.embed(chunks).await?;
        let rows_written = self.write(store, &rows).await?;

        Ok(BuildStats {
            chunks_embedded: rows.len(),
            rows_written,
        })
    }
}

/// Load, split, embed and persist the source document.
///
/// Appends to an existing collection unless `options.fresh` is set. The
/// collection is only opened (or created) once every chunk is embedded.
pub async fn ingest(
    config: &AppConfig,
    options: IngestOptions,
    progress: ProgressReporter,
) -> AppResult<IngestStats> {
    let start = Instant::now();
    let source = options.source.unwrap_or_else(|| config.source_path());

    tracing::info!("Starting ingestion of {:?}", source);

    if config.embedding.provider.eq_ignore_ascii_case("openai") {
        config.require_credentials()?;
    }
    let embedder = create_provider(&config.embedding, config.api_key.as_deref())?;
    let splitter = ChunkSplitter::new(config.index.chunk_size, config.index.chunk_overlap)?;

    let pages = load_pages(&source)?;
    progress.load(pages.len() as u64, &source.to_string_lossy());

    let chunks = splitter.split_pages(&pages);
    progress.chunk(chunks.len() as u64, pages.len() as u64);

    if chunks.is_empty() {
        return Err(AppError::Knowledge(format!(
            "No text could be extracted from {:?}",
            source
        )));
    }

    let dimensions = embedder.dimensions();
    let builder =
        IndexBuilder::new(embedder, config.embedding.batch_size).with_progress(progress);
    let rows = builder.embed(&chunks).await?;

    let store = LanceDbStore::open_or_create(
        &config.index_dir(),
        &config.index.collection,
        dimensions,
    )
    .await?;

    if options.fresh {
        tracing::info!("Clearing collection '{}' before writing", config.index.collection);
        store.reset().await?;
    }

    let rows_written = builder.write(&store, &rows).await?;
    let total_rows = store.count().await?;

    let duration = start.elapsed();
    tracing::info!(
        "Ingestion completed: {} pages, {} chunks, {} rows in collection, {:.2}s",
        pages.len(),
        chunks.len(),
        total_rows,
        duration.as_secs_f64()
    );

    Ok(IngestStats {
        source,
        collection: config.index.collection.clone(),
        pages: pages.len(),
        chunks: chunks.len(),
        rows_written,
        total_rows,
        duration_secs: duration.as_secs_f64(),
    })
}
