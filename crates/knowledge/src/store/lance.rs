//! LanceDB-backed vector store.
//!
//! One table per collection inside the index directory. Rows hold the chunk
//! text, its page and position, the ingestion time and a fixed-size
//! embedding vector.

use super::{cosine_similarity, rank, VectorStore};
use crate::types::{Chunk, ScoredChunk, StoredChunk};
use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray, UInt32Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use cookbook_core::{AppError, AppResult};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;

/// LanceDB table holding one collection of embedded chunks.
pub struct LanceDbStore {
    table: Table,
    collection: String,
    dimensions: usize,
}

fn lance_err(context: &str) -> impl Fn(lancedb::Error) -> AppError + '_ {
    move |e| AppError::Knowledge(format!("{}: {}", context, e))
}

impl LanceDbStore {
    async fn connect(dir: &Path) -> AppResult<Connection> {
        let uri = dir.to_string_lossy().to_string();
        lancedb::connect(&uri)
            .execute()
            .await
            .map_err(lance_err("Failed to connect to LanceDB"))
    }

    /// Whether `dir` holds a table named `collection`.
    pub async fn collection_exists(dir: &Path, collection: &str) -> AppResult<bool> {
        if !dir.is_dir() {
            return Ok(false);
        }

        let conn = Self::connect(dir).await?;
        let names = conn
            .table_names()
            .execute()
            .await
            .map_err(lance_err("Failed to list tables"))?;
        Ok(names.iter().any(|name| name == collection))
    }

    /// Open an existing collection.
    pub async fn open(dir: &Path, collection: &str) -> AppResult<Self> {
        let conn = Self::connect(dir).await?;
        let table = conn
            .open_table(collection)
            .execute()
            .await
            .map_err(lance_err("Failed to open table"))?;

        let dimensions = embedding_dimensions(&table).await?;
        tracing::debug!(
            "Opened LanceDB collection '{}' at {:?} ({} dims)",
            collection,
            dir,
            dimensions
        );

        Ok(Self {
            table,
            collection: collection.to_string(),
            dimensions,
        })
    }

    /// Open a collection, creating the directory and an empty table if needed.
    pub async fn open_or_create(dir: &Path, collection: &str, dimensions: usize) -> AppResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::Knowledge(format!("Failed to create index directory {:?}: {}", dir, e))
        })?;

        if Self::collection_exists(dir, collection).await? {
            let store = Self::open(dir, collection).await?;
            if store.dimensions != dimensions {
                return Err(AppError::Knowledge(format!(
                    "Collection '{}' stores {}-dimensional embeddings but the provider produces {}. \
                     Remove {:?} and ingest again.",
                    collection, store.dimensions, dimensions, dir
                )));
            }
            return Ok(store);
        }

        let conn = Self::connect(dir).await?;
        let table = conn
            .create_empty_table(collection, Self::schema(dimensions))
            .execute()
            .await
            .map_err(lance_err("Failed to create table"))?;

        tracing::info!("Created LanceDB collection '{}' at {:?}", collection, dir);

        Ok(Self {
            table,
            collection: collection.to_string(),
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn schema(dimensions: usize) -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("source_page", DataType::UInt32, false),
            Field::new("chunk_index", DataType::UInt32, false),
            // Unix seconds
            Field::new("ingested_at", DataType::Int64, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimensions as i32,
                ),
                false,
            ),
        ]))
    }

    fn to_batch(&self, rows: &[StoredChunk]) -> AppResult<RecordBatch> {
        if let Some(bad) = rows.iter().find(|r| r.embedding.len() != self.dimensions) {
            return Err(AppError::Knowledge(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                bad.embedding.len()
            )));
        }

        let ids = StringArray::from_iter_values(rows.iter().map(|r| r.id.as_str()));
        let texts = StringArray::from_iter_values(rows.iter().map(|r| r.chunk.text.as_str()));
        let pages = UInt32Array::from_iter_values(rows.iter().map(|r| r.chunk.source_page));
        let indices = UInt32Array::from_iter_values(rows.iter().map(|r| r.chunk.chunk_index));
        let ingested = Int64Array::from_iter_values(rows.iter().map(|r| r.ingested_at.timestamp()));
        let embeddings = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            rows.iter()
                .map(|r| Some(r.embedding.iter().copied().map(Some))),
            self.dimensions as i32,
        );

        RecordBatch::try_new(
            Self::schema(self.dimensions),
            vec![
                Arc::new(ids),
                Arc::new(texts),
                Arc::new(pages),
                Arc::new(indices),
                Arc::new(ingested),
                Arc::new(embeddings),
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create RecordBatch: {}", e)))
    }
}

async fn embedding_dimensions(table: &Table) -> AppResult<usize> {
    let schema = table
        .schema()
        .await
        .map_err(lance_err("Failed to read table schema"))?;

    match schema.field_with_name("embedding").map(|f| f.data_type()) {
        Ok(DataType::FixedSizeList(_, size)) => Ok(*size as usize),
        _ => Err(AppError::Knowledge(
            "Table has no fixed-size embedding column".to_string(),
        )),
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| AppError::Knowledge(format!("Invalid {} column", name)))
}

/// Convert result rows into chunks scored against the query vector.
fn score_batch(batch: &RecordBatch, query_embedding: &[f32]) -> AppResult<Vec<ScoredChunk>> {
    let texts = column::<StringArray>(batch, "text")?;
    let pages = column::<UInt32Array>(batch, "source_page")?;
    let indices = column::<UInt32Array>(batch, "chunk_index")?;
    let embeddings = column::<FixedSizeListArray>(batch, "embedding")?;

    let mut scored = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let values = embeddings.value(row);
        let floats = values
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| AppError::Knowledge("Invalid embedding values".to_string()))?;

        scored.push(ScoredChunk {
            chunk: Chunk {
                text: texts.value(row).to_string(),
                source_page: pages.value(row),
                chunk_index: indices.value(row),
            },
            score: cosine_similarity(query_embedding, floats.values()),
        });
    }
    Ok(scored)
}

#[async_trait::async_trait]
impl VectorStore for LanceDbStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn insert(&self, rows: &[StoredChunk]) -> AppResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let batch = self.to_batch(rows)?;
        let schema = batch.schema();
        self.table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(lance_err("Failed to add rows"))?;

        tracing::debug!("Inserted {} rows into '{}'", rows.len(), self.collection);
        Ok(rows.len())
    }

    async fn search(&self, query_embedding: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>> {
        if query_embedding.len() != self.dimensions {
            return Err(AppError::Knowledge(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                query_embedding.len()
            )));
        }
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .nearest_to(query_embedding.to_vec())
            .map_err(lance_err("Failed to create query"))?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(lance_err("Failed to execute search"))?
            .try_collect()
            .await
            .map_err(lance_err("Failed to collect results"))?;

        let mut scored = Vec::new();
        for batch in &batches {
            scored.extend(score_batch(batch, query_embedding)?);
        }

        tracing::debug!("Retrieved {} chunks (requested top-{})", scored.len(), k);
        Ok(rank(scored, k))
    }

    async fn count(&self) -> AppResult<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(lance_err("Failed to count rows"))
    }

    async fn reset(&self) -> AppResult<()> {
        if self.count().await? > 0 {
            self.table
                .delete("id IS NOT NULL")
                .await
                .map_err(lance_err("Failed to reset collection"))?;
        }
        tracing::info!("Reset collection '{}'", self.collection);
        Ok(())
    }
}
