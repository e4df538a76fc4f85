//! Ingest command handler.
//!
//! Loads the source document, chunks and embeds it, and appends the result
//! to the configured collection.

use super::print_json;
use clap::Args;
use cookbook_core::{config::AppConfig, AppResult};
use cookbook_knowledge::{ingest, IngestOptions, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Build or extend the cookbook index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Source document (default: configured source, data/source/COOKBOOK.pdf)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Clear the collection before ingesting
    #[arg(long)]
    pub fresh: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");
        tracing::debug!("Ingest options: {:?}", self);

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
        };

        let options = IngestOptions {
            source: self.source.clone(),
            fresh: self.fresh,
        };
        let stats = ingest(config, options, progress).await?;

        if self.json {
            return print_json(&serde_json::json!({
                "source": stats.source,
                "collection": stats.collection,
                "pages": stats.pages,
                "chunks": stats.chunks,
                "rowsWritten": stats.rows_written,
                "totalRows": stats.total_rows,
                "durationSecs": stats.duration_secs,
            }));
        }

        println!(
            "Ingested {} pages into {} chunks in {:.2}s; collection '{}' now holds {} rows",
            stats.pages, stats.chunks, stats.duration_secs, stats.collection, stats.total_rows
        );
        Ok(())
    }
}
