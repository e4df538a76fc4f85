//! Embedding providers.
//!
//! Ingestion embeds chunks in batches; retrieval embeds the question with
//! the same provider so both live in one vector space.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
