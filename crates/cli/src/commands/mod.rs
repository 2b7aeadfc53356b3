//! Command handlers for the faqdesk CLI.

pub mod ask;
pub mod chat;
pub mod search;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;

use faqdesk_assistant::{
    ConfidenceEvaluator, ConfidenceResult, ConversationOrchestrator, GenerationSettings,
    SessionConfig, SessionStore,
};
use faqdesk_core::{config::AppConfig, AppResult};
use faqdesk_knowledge::KnowledgeBase;
use faqdesk_llm::create_client;
use faqdesk_prompt::{load_templates, PromptBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Load the corpus and wire every service a turn needs.
pub(crate) async fn build_orchestrator(config: &AppConfig) -> AppResult<ConversationOrchestrator> {
    let api_key = config.resolve_api_key();
    let llm = create_client(
        &config.llm.provider,
        config.llm.endpoint.as_deref(),
        api_key.as_deref(),
        Duration::from_secs(config.llm.timeout_secs),
    )?;

    let templates = load_templates(config.prompts_dir.as_deref())?;
    let prompts = PromptBuilder::new(&templates)?;

    let knowledge = KnowledgeBase::from_config(config).await?;
    let sessions = SessionStore::new(SessionConfig::from(&config.sessions));

    Ok(ConversationOrchestrator::new(
        Arc::new(knowledge),
        Arc::new(sessions),
        llm,
        prompts,
        ConfidenceEvaluator::new(config.confidence.threshold),
        GenerationSettings::from(&config.llm),
    ))
}

/// Footer line shown after an answer.
pub(crate) fn confidence_footer(confidence: &ConfidenceResult, sources: usize) -> String {
    let mut footer = format!(
        "[confidence {:.2} / threshold {:.2}, {} sources]",
        confidence.score, confidence.threshold, sources
    );
    if confidence.needs_escalation {
        footer.push_str("\n[low confidence: escalate to a human agent]");
    }
    footer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_without_escalation() {
        let confidence = ConfidenceEvaluator::new(0.6).evaluate("", &[]);
        let shown = ConfidenceResult {
            score: 0.75,
            needs_escalation: false,
            ..confidence
        };
        assert_eq!(
            confidence_footer(&shown, 3),
            "[confidence 0.75 / threshold 0.60, 3 sources]"
        );
    }

    #[test]
    fn test_footer_with_escalation() {
        // no context and an empty answer always scores below 0.6
        let confidence = ConfidenceEvaluator::new(0.6).evaluate("", &[]);
        assert!(confidence.needs_escalation);
        assert!(confidence_footer(&confidence, 0).ends_with("escalate to a human agent]"));
    }
}
