//! Chat command handler.
//!
//! Interactive multi-turn session over stdin. Answers stream by default and
//! Ctrl-C cancels the answer in flight without recording the turn.

use super::{build_orchestrator, confidence_footer};
use clap::Args;
use faqdesk_assistant::ConversationOrchestrator;
use faqdesk_core::{config::AppConfig, AppResult};
use faqdesk_llm::Role;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive multi-turn support chat
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Resume an existing session id instead of starting a new one
    #[arg(long)]
    pub session: Option<String>,

    /// Wait for whole answers instead of streaming them
    #[arg(long)]
    pub no_stream: bool,
}

/// What a line of input asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    NewSession,
    History,
    Unknown(&'a str),
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/new" => Input::NewSession,
        "/history" => Input::History,
        _ if line.starts_with('/') => Input::Unknown(line),
        _ => Input::Message(line),
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let orchestrator = build_orchestrator(config).await?;
        let mut session_id = self
            .session
            .clone()
            .unwrap_or_else(|| orchestrator.sessions().create_session());

        let pruner = config.sessions.idle_ttl_secs.map(|secs| {
            let sessions = Arc::clone(orchestrator.sessions());
            let period = Duration::from_secs(secs.clamp(1, 60));
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    interval.tick().await;
                    sessions.prune_idle().await;
                }
            })
        });

        println!("faqdesk chat. Commands: /new, /history, /quit");
        println!("Session {}", session_id);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush().ok();

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                println!();
                break;
            };

            match parse_input(&line) {
                Input::Empty => continue,
                Input::Quit => break,
                Input::NewSession => {
                    session_id = orchestrator.sessions().create_session();
                    println!("Session {}", session_id);
                }
                Input::History => {
                    for message in orchestrator.sessions().get_history(&session_id).await {
                        let speaker = match message.role {
                            Role::User => "you",
                            Role::Assistant => "assistant",
                        };
                        println!("{}: {}", speaker, message.content);
                    }
                }
                Input::Unknown(command) => {
                    println!("Unknown command {}. Try /new, /history or /quit", command);
                }
                Input::Message(message) => {
                    let turn = if self.no_stream {
                        full_turn(&orchestrator, &session_id, message).await
                    } else {
                        streamed_turn(&orchestrator, &session_id, message).await
                    };

                    // a failed turn ends that turn only
                    if let Err(e) = turn {
                        if !e.is_recoverable() {
                            return Err(e);
                        }
                        tracing::warn!("Turn failed: {}", e);
                        eprintln!("error: {}", e);
                    }
                }
            }
        }

        if let Some(pruner) = pruner {
            pruner.abort();
        }

        Ok(())
    }
}

async fn full_turn(
    orchestrator: &ConversationOrchestrator,
    session_id: &str,
    message: &str,
) -> AppResult<()> {
    let response = tokio::select! {
        response = orchestrator.chat(Some(session_id), message) => response?,
        _ = tokio::signal::ctrl_c() => {
            println!("\n[cancelled]");
            return Ok(());
        }
    };

    println!("{}", response.answer);
    println!(
        "{}",
        confidence_footer(&response.confidence_result(), response.sources.len())
    );
    Ok(())
}

async fn streamed_turn(
    orchestrator: &ConversationOrchestrator,
    session_id: &str,
    message: &str,
) -> AppResult<()> {
    let mut stream = orchestrator.chat_stream(Some(session_id), message).await?;
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            increment = stream.next() => match increment {
                Some(text) => {
                    print!("{}", text?);
                    stdout.flush().ok();
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                // dropping the stream releases the session without a write
                println!("\n[cancelled]");
                return Ok(());
            }
        }
    }
    println!();

    let confidence = orchestrator
        .evaluator()
        .evaluate(stream.answer(), stream.context());
    println!("{}", confidence_footer(&confidence, stream.context().len()));
    Ok(())
}
