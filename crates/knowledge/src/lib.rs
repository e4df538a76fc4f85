//! Cookbook knowledge base and answering pipeline.
//!
//! Offline, [`ingest`] loads the source document, splits it into
//! overlapping chunks, embeds them and appends them to a LanceDB collection.
//! Online, the [`IndexManager`] opens that collection once per process and
//! the [`RagPipeline`] answers questions over it, in one piece or streamed.

pub mod builder;
pub mod embeddings;
pub mod index_manager;
pub mod loader;
pub mod progress;
pub mod rag;
pub mod splitter;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use builder::{ingest, IndexBuilder};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index_manager::{IndexHandle, IndexLocation, IndexManager, IndexOpener, LanceDbOpener};
pub use loader::load_pages;
pub use progress::{Phase, ProgressEvent, ProgressReporter};
pub use rag::{format_context, format_history, AnswerGenerator, AnswerStream, RagPipeline, Retriever};
pub use splitter::ChunkSplitter;
pub use store::{LanceDbStore, MemoryStore, VectorStore};
pub use types::{
    parse_history, AskRequest, AskResponse, BuildStats, Chunk, HistoryEntry, IndexStats,
    IngestOptions, IngestStats, Page, RetrievalResult, ScoredChunk, StoredChunk,
};
