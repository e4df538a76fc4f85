//! Stats command handler.
//!
//! Reports the configured collection, where it lives and how many rows it
//! holds. Reads LanceDB directly, so no provider credentials are needed.

use super::print_json;
use clap::Args;
use cookbook_core::{config::AppConfig, AppResult};
use cookbook_knowledge::IndexLocation;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let stats = IndexLocation::from_config(config).inspect().await?;

        if self.json {
            return print_json(&serde_json::json!({
                "collection": stats.collection,
                "location": stats.location,
                "ready": stats.ready,
                "rows": stats.rows,
            }));
        }

        println!("Collection: {}", stats.collection);
        println!("Location:   {}", stats.location.display());
        if stats.ready {
            println!("Rows:       {}", stats.rows);
        } else {
            println!("Status:     not built (run `cookbook ingest`)");
        }
        Ok(())
    }
}
