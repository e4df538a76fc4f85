//! Domain types shared across the ingestion and answering pipelines.

use chrono::{DateTime, Utc};
use cookbook_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// One page of extracted document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number in the source document
    pub number: u32,
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// A bounded span of document text; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,

    /// Page the chunk was cut from
    pub source_page: u32,

    /// 0-based position in the document's chunk sequence
    pub chunk_index: u32,
}

/// A chunk as persisted in the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
    pub ingested_at: DateTime<Utc>,
}

impl StoredChunk {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chunk,
            embedding,
            ingested_at: Utc::now(),
        }
    }
}

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Ranked retrieval output: at most k chunks, best first.
pub type RetrievalResult = Vec<ScoredChunk>;

/// One prior question/answer exchange supplied by the caller.
///
/// Both fields are required when deserializing; entries are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
}

impl HistoryEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// An entry with neither a question nor an answer carries nothing.
    pub fn is_blank(&self) -> bool {
        self.question.trim().is_empty() && self.answer.trim().is_empty()
    }
}

/// Parse a JSON array of history entries, rejecting malformed payloads.
pub fn parse_history(json: &str) -> AppResult<Vec<HistoryEntry>> {
    serde_json::from_str(json)
        .map_err(|e| AppError::InvalidInput(format!("Malformed conversation history: {}", e)))
}

/// A question for the answering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,

    #[serde(default = "default_top_k")]
    pub k: usize,

    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            k: DEFAULT_TOP_K,
            history: Vec::new(),
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    /// Reject blank questions and k = 0.
    pub fn validate(&self) -> AppResult<()> {
        if self.question.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Question cannot be empty".to_string(),
            ));
        }
        if self.k == 0 {
            return Err(AppError::InvalidInput("k must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// The pipeline's batch answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Outcome of one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub chunks_embedded: usize,
    pub rows_written: usize,
}

/// Options for an ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Document to ingest; the configured source when unset
    pub source: Option<PathBuf>,

    /// Clear the collection before writing
    pub fresh: bool,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub source: PathBuf,
    pub collection: String,
    pub pages: usize,
    pub chunks: usize,
    pub rows_written: usize,

    /// Rows in the collection after the run (appends accumulate)
    pub total_rows: usize,
    pub duration_secs: f64,
}

/// Snapshot of a persisted collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub collection: String,
    pub location: PathBuf,
    pub ready: bool,
    pub rows: usize,
}
