//! Ask command handler.
//!
//! Answers one question against the cookbook index, streaming by default.
//! Ctrl-C stops the stream after the current fragment.

use super::print_json;
use clap::Args;
use cookbook_core::{config::AppConfig, AppError, AppResult};
use cookbook_knowledge::{parse_history, AskRequest, HistoryEntry, IndexManager, RagPipeline};
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ask a question about the cookbook
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of chunks to retrieve (default: configured topK)
    #[arg(short = 'k', long)]
    pub k: Option<usize>,

    /// JSON file with prior exchanges: [{"question": ..., "answer": ...}]
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        config.require_credentials()?;

        let history = match &self.history {
            Some(path) => load_history(path)?,
            None => Vec::new(),
        };
        let request = AskRequest::new(self.question.clone())
            .with_k(self.k.unwrap_or(config.index.top_k))
            .with_history(history);
        request.validate()?;

        let manager = Arc::new(IndexManager::from_config(config));
        let pipeline = RagPipeline::from_config(config, manager.clone())?;

        // Surface NotReady before anything is printed.
        manager.init().await?;

        if self.no_stream || self.json {
            self.handle_non_streaming(&pipeline, &request).await
        } else {
            self.handle_streaming(&pipeline, &request).await
        }
    }

    async fn handle_non_streaming(&self, pipeline: &RagPipeline, request: &AskRequest) -> AppResult<()> {
        let response = pipeline.ask(request).await?;

        if self.json {
            print_json(&serde_json::json!({ "answer": response.answer }))
        } else {
            println!("{}", response.answer);
            Ok(())
        }
    }

    async fn handle_streaming(&self, pipeline: &RagPipeline, request: &AskRequest) -> AppResult<()> {
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted; stopping answer stream");
                    cancel.cancel();
                }
            })
        };

        let result = async {
            let mut stream = pipeline.ask_stream(request, cancel.clone()).await?;
            let mut stdout = std::io::stdout();
            while let Some(fragment) = stream.next().await {
                print!("{}", fragment?);
                stdout.flush().ok();
            }
            println!();
            Ok::<_, AppError>(())
        }
        .await;

        watcher.abort();
        if cancel.is_cancelled() {
            eprintln!("(answer interrupted)");
        }
        result
    }
}

fn load_history(path: &Path) -> AppResult<Vec<HistoryEntry>> {
    let json = std::fs::read_to_string(path)?;
    let history = parse_history(&json)?;
    tracing::debug!("Loaded {} history entries from {:?}", history.len(), path);
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_history_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.json");
        std::fs::write(
            &path,
            r#"[{"question": "Any breakfast ideas?", "answer": "Recipe A: pancakes."}]"#,
        )
        .unwrap();

        let history = load_history(&path).unwrap();
        assert_eq!(history, vec![HistoryEntry::new("Any breakfast ideas?", "Recipe A: pancakes.")]);
    }

    #[tokio::test]
    async fn test_unbuilt_index_fails_before_streaming() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp.path().to_path_buf(),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let command = AskCommand {
            question: "how do I make bread?".to_string(),
            k: None,
            history: None,
            no_stream: false,
            json: false,
        };

        let err = command.execute(&config).await.unwrap_err();
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_load_history_rejects_bad_entries() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.json");
        std::fs::write(&path, r#"[{"answer": "no question"}]"#).unwrap();

        assert!(matches!(load_history(&path), Err(AppError::InvalidInput(_))));
        assert!(matches!(
            load_history(&temp.path().join("missing.json")),
            Err(AppError::Io(_))
        ));
    }
}
