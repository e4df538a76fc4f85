//! Cookbook CLI
//!
//! Builds the cookbook index and answers questions about it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, HealthCommand, IngestCommand, StatsCommand};
use cookbook_core::{config::AppConfig, logging, AppResult, LogFormat};
use std::path::PathBuf;

/// Cookbook assistant - answers cooking questions from your cookbook
#[derive(Parser, Debug)]
#[command(name = "cookbook")]
#[command(about = "Answers cooking questions from an indexed cookbook", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "COOKBOOK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "COOKBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Completion provider (openai, ollama)
    #[arg(short, long, global = true, env = "COOKBOOK_PROVIDER")]
    provider: Option<String>,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "COOKBOOK_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build or extend the cookbook index from the source document
    Ingest(IngestCommand),

    /// Ask a question about the cookbook
    Ask(AskCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Liveness check
    Health(HealthCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Ask(_) => "ask",
            Commands::Stats(_) => "stats",
            Commands::Health(_) => "health",
        }
    }
}

/// Defaults, then config file and environment, then CLI flags.
fn resolve_config(cli: &Cli) -> AppResult<AppConfig> {
    let base = if cli.workspace.is_none() && cli.config.is_none() {
        AppConfig::load()?
    } else {
        let mut config = AppConfig::default();
        if let Some(workspace) = &cli.workspace {
            config.workspace = workspace.clone();
        }
        config.config_file = cli.config.clone();
        config.apply_file_and_env()?
    };

    let config = base.with_overrides(
        cli.workspace.clone(),
        cli.config.clone(),
        cli.provider.clone(),
        cli.model.clone(),
        cli.log_level.clone(),
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Health must answer even when configuration is broken.
    if let Commands::Health(cmd) = &cli.command {
        return cmd.execute();
    }

    let config = resolve_config(&cli)?;

    logging::init_logging(config.log_level.as_deref(), config.log_format, config.no_color)?;

    tracing::info!("Cookbook CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} ({})", config.provider, config.model);
    tracing::debug!(
        "Embeddings: {} ({}, {} dims)",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.dimensions
    );

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Health(cmd) => cmd.execute(),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_flags() {
        let cli = Cli::try_parse_from([
            "cookbook",
            "--log-format",
            "json",
            "ask",
            "how do I make bread?",
            "-k",
            "3",
            "--no-stream",
        ])
        .unwrap();

        assert_eq!(cli.log_format, Some(LogFormat::Json));
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.question, "how do I make bread?");
                assert_eq!(cmd.k, Some(3));
                assert!(cmd.no_stream);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ingest_flags() {
        let cli = Cli::try_parse_from(["cookbook", "ingest", "--source", "book.pdf", "--fresh"])
            .unwrap();
        match cli.command {
            Commands::Ingest(cmd) => {
                assert_eq!(cmd.source, Some(PathBuf::from("book.pdf")));
                assert!(cmd.fresh);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
