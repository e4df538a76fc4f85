//! Completion providers for the cookbook assistant.
//!
//! A provider-agnostic [`LlmClient`] trait with batch and streaming
//! completion, implemented for:
//! - **OpenAI**: chat completions over HTTPS with SSE streaming (default)
//! - **Ollama**: local models with newline-delimited JSON streaming
//!
//! # Example
//! ```no_run
//! use cookbook_llm::{create_client, LlmRequest};
//!
//! # async fn example() -> cookbook_core::AppResult<()> {
//! let client = create_client("ollama", None, None)?;
//! let request = LlmRequest::new("How do I proof yeast?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod sse;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
