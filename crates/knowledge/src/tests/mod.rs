//! Cross-module tests for the answering pipeline.

mod index_lifecycle;
mod retrieval_ranking;
