//! Command handlers for the cookbook CLI.

pub mod ask;
pub mod health;
pub mod ingest;
pub mod stats;

pub use ask::AskCommand;
pub use health::HealthCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;

use cookbook_core::{AppError, AppResult};

/// Pretty-print a JSON value to stdout.
pub(crate) fn print_json(value: &serde_json::Value) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
