//! Retrieval-augmented answering.
//!
//! Per request: the [`Retriever`] pulls the top-k chunks from the managed
//! index, the context assembler formats them together with the recent
//! conversation, and the [`AnswerGenerator`] renders the answer prompt and
//! calls the completion provider, in one piece or as an [`AnswerStream`].

pub mod context;
pub mod generator;
pub mod pipeline;
pub mod retriever;
pub mod stream;

pub use context::{format_context, format_history, HISTORY_WINDOW};
pub use generator::AnswerGenerator;
pub use pipeline::RagPipeline;
pub use retriever::Retriever;
pub use stream::AnswerStream;
