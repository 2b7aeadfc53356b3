//! faqdesk CLI
//!
//! Grounded customer-support answers over a local FAQ corpus.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, SearchCommand, StatsCommand};
use faqdesk_core::{
    config::AppConfig,
    logging::{self, LogFormat},
};
use std::path::PathBuf;

/// faqdesk - FAQ support assistant with retrieval and confidence scoring
#[derive(Parser, Debug)]
#[command(name = "faqdesk")]
#[command(about = "FAQ support assistant with retrieval and confidence scoring", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory of FAQ documents (default: ./.knowledge_sources)
    #[arg(long, global = true, env = "FAQDESK_CORPUS_DIR")]
    corpus: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "FAQDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Generation provider (ollama, anthropic)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive multi-turn support chat
    Chat(ChatCommand),

    /// Answer a single question
    Ask(AskCommand),

    /// Show the chunks retrieved for a query
    Search(SearchCommand),

    /// Show knowledge base statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(
            cli.corpus,
            cli.provider,
            cli.model,
            cli.log_level,
            cli.verbose,
            cli.no_color,
        );

    if cli.log_json {
        config.log_format = LogFormat::Json;
    }

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        config.log_format,
    )?;
    config.validate()?;

    tracing::info!("faqdesk starting");
    tracing::debug!("Corpus: {:?}", config.corpus_dir);
    tracing::debug!("Provider: {}", config.llm.provider);
    tracing::debug!("Model: {}", config.llm.model_name());

    let command_name = match &cli.command {
        Commands::Chat(_) => "chat",
        Commands::Ask(_) => "ask",
        Commands::Search(_) => "search",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}
