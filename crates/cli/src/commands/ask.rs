//! Ask command handler.
//!
//! Answers one question in a fresh session.

use super::{build_orchestrator, confidence_footer};
use clap::Args;
use faqdesk_core::{config::AppConfig, AppResult};
use futures::StreamExt;
use std::io::Write;

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Output the full response (answer, confidence, sources) as JSON
    #[arg(long)]
    pub json: bool,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let orchestrator = build_orchestrator(config).await?;

        // JSON output needs the scored response, so it always uses full mode
        if self.json || self.no_stream {
            let response = orchestrator.chat(None, &self.question).await?;

            if self.json {
                let json = serde_json::to_string_pretty(&response)?;
                println!("{}", json);
            } else {
                println!("{}", response.answer);
                eprintln!(
                    "{}",
                    confidence_footer(&response.confidence_result(), response.sources.len())
                );
            }
            return Ok(());
        }

        let mut stream = orchestrator.chat_stream(None, &self.question).await?;
        let mut stdout = std::io::stdout();

        while let Some(increment) = stream.next().await {
            let text = increment?;
            print!("{}", text);
            stdout.flush().ok();
        }
        println!();

        let confidence = orchestrator
            .evaluator()
            .evaluate(stream.answer(), stream.context());
        eprintln!("{}", confidence_footer(&confidence, stream.context().len()));

        Ok(())
    }
}
