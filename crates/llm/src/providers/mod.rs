//! Completion provider implementations.

pub mod ollama;
pub mod openai;

pub use ollama::{OllamaClient, DEFAULT_OLLAMA_BASE_URL};
pub use openai::{OpenAiClient, DEFAULT_OPENAI_BASE_URL};
