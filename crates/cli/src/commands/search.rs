//! Search command handler.

use clap::Args;
use faqdesk_core::{config::AppConfig, AppResult};
use faqdesk_knowledge::KnowledgeBase;

/// Show the chunks retrieved for a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of results (default: retrieval.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum similarity score (default: retrieval.similarityThreshold)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");
        tracing::debug!("Search options: {:?}", self);

        let knowledge = KnowledgeBase::from_config(config).await?;
        let top_k = self.top_k.unwrap_or_else(|| knowledge.default_top_k());
        let threshold = self
            .threshold
            .unwrap_or_else(|| knowledge.default_similarity_threshold());

        let results = knowledge.search_with(&self.query, top_k, threshold).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }

        if results.is_empty() {
            println!("No chunks scored at or above {:.2}", threshold);
            return Ok(());
        }

        for (i, result) in results.iter().enumerate() {
            println!(
                "{}. [{:.3}] {} > {} (#{})",
                i + 1,
                result.similarity_score,
                result.source_id,
                result.heading,
                result.sequence_index
            );
            println!("   {}", preview(&result.content, 160));
        }

        Ok(())
    }
}

/// First `max` chars on one line.
fn preview(content: &str, max: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("a\n\nb  c", 10), "a b c");
        assert_eq!(preview("abcdef ghij", 6), "abcdef...");
    }
}
