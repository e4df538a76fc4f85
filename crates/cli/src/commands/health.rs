//! Health command handler.

use clap::Args;
use cookbook_core::AppResult;

/// Report liveness; does not touch the index
#[derive(Args, Debug)]
pub struct HealthCommand {}

impl HealthCommand {
    pub fn execute(&self) -> AppResult<()> {
        println!("{}", serde_json::json!({ "status": "ok" }));
        Ok(())
    }
}
