//! Error types for the cookbook assistant.
//!
//! A single enum covers every failure category the pipeline can surface:
//! configuration, index readiness, generation, embedding, storage and the
//! ambient I/O / serialization failures.

use thiserror::Error;

/// Unified error type for the cookbook assistant.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Errors are represented and propagated, never turned into panics.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors, including missing provider credentials
    #[error("Configuration error: {0}")]
    Config(String),

    /// The vector index has not been built (missing or empty location)
    #[error("Index not ready: {0}")]
    NotReady(String),

    /// Completion provider failures (auth, network, rate limit, bad stream)
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Embedding provider failures
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Malformed caller input (blank question, k = 0, bad history)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vector store and document loading errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt definition and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error means the index must be (re)built before serving.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, AppError::NotReady(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
