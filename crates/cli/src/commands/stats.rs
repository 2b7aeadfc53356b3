//! Stats command handler.
//!
//! Loads the corpus and reports what was indexed.

use clap::Args;
use faqdesk_core::{config::AppConfig, AppResult};
use faqdesk_knowledge::KnowledgeBase;

/// Show knowledge base statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let knowledge = KnowledgeBase::from_config(config).await?;
        let stats = knowledge.get_stats();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        println!("Corpus:      {}", config.corpus_dir.display());
        println!("Chunks:      {}", stats.total_chunks);
        println!("Sources:     {}", stats.total_sources);
        println!(
            "Embeddings:  {} / {} ({} dimensions)",
            stats.embedding_provider, stats.embedding_model, stats.embedding_dimensions
        );
        for source in &stats.sources {
            println!("  - {}", source);
        }

        Ok(())
    }
}
