//! One conversational turn: retrieve, ground, generate, score, remember.

use crate::confidence::{ConfidenceBreakdown, ConfidenceEvaluator, ConfidenceResult};
use crate::session::{SessionGuard, SessionStore};
use faqdesk_core::config::LlmSettings;
use faqdesk_core::{AppError, AppResult};
use faqdesk_knowledge::{KnowledgeBase, RetrievalResult};
use faqdesk_llm::{ChatMessage, LlmClient, LlmRequest, LlmStream};
use faqdesk_prompt::{GroundingSource, PromptBuilder};
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

/// Model parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&LlmSettings> for GenerationSettings {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model_name().to_string(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

/// Result of a full-mode turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    pub confidence: f64,
    pub threshold: f64,
    pub needs_escalation: bool,
    pub breakdown: ConfidenceBreakdown,
    pub sources: Vec<RetrievalResult>,
}

impl ChatResponse {
    pub fn confidence_result(&self) -> ConfidenceResult {
        ConfidenceResult {
            score: self.confidence,
            threshold: self.threshold,
            needs_escalation: self.needs_escalation,
            breakdown: self.breakdown,
        }
    }
}

/// Everything a turn needs once the session is held and retrieval is done.
struct PreparedTurn {
    guard: SessionGuard,
    conversation: Vec<ChatMessage>,
    context: Vec<RetrievalResult>,
    request: LlmRequest,
}

/// Drives turns against shared, explicitly injected services.
pub struct ConversationOrchestrator {
    knowledge: Arc<KnowledgeBase>,
    sessions: Arc<SessionStore>,
    llm: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    evaluator: ConfidenceEvaluator,
    generation: GenerationSettings,
}

impl ConversationOrchestrator {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        sessions: Arc<SessionStore>,
        llm: Arc<dyn LlmClient>,
        prompts: PromptBuilder,
        evaluator: ConfidenceEvaluator,
        generation: GenerationSettings,
    ) -> Self {
        Self {
            knowledge,
            sessions,
            llm,
            prompts,
            evaluator,
            generation,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn evaluator(&self) -> &ConfidenceEvaluator {
        &self.evaluator
    }

    /// Full mode: generate the whole answer, score it, and record the turn.
    ///
    /// A missing or empty `session_id` starts a new session. On
    /// `GenerationFailed` the session history is left as it was.
    pub async fn chat(&self, session_id: Option<&str>, message: &str) -> AppResult<ChatResponse> {
        let PreparedTurn {
            mut guard,
            mut conversation,
            context,
            request,
        } = self.prepare(session_id, message).await?;

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::GenerationFailed(e.to_string()))?;

        let answer = response.content.trim().to_string();
        if answer.is_empty() {
            return Err(AppError::GenerationFailed(
                "Generation returned an empty answer".to_string(),
            ));
        }

        let confidence = self.evaluator.evaluate(&answer, &context);

        conversation.push(ChatMessage::assistant(answer.clone()));
        guard.replace_history(conversation);

        tracing::info!(
            "Session {}: answered with confidence {:.2} (escalate: {}, {} sources, {} tokens)",
            guard.id(),
            confidence.score,
            confidence.needs_escalation,
            context.len(),
            response.usage.total_tokens
        );

        Ok(ChatResponse {
            session_id: guard.id().to_string(),
            answer,
            confidence: confidence.score,
            threshold: confidence.threshold,
            needs_escalation: confidence.needs_escalation,
            breakdown: confidence.breakdown,
            sources: context,
        })
    }

    /// Stream mode: forward text increments as they arrive.
    ///
    /// The session stays locked until the returned stream completes or is
    /// dropped. History is written only on normal completion; scoring is left
    /// to the caller through [`TurnStream::answer`] and [`TurnStream::context`].
    pub async fn chat_stream(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> AppResult<TurnStream> {
        let PreparedTurn {
            guard,
            conversation,
            context,
            request,
        } = self.prepare(session_id, message).await?;

        let upstream = self
            .llm
            .stream(&request.with_streaming())
            .await
            .map_err(|e| AppError::GenerationFailed(e.to_string()))?;

        Ok(TurnStream {
            session_id: guard.id().to_string(),
            upstream,
            guard: Some(guard),
            conversation,
            context,
            answer: String::new(),
            upstream_done: false,
            state: TurnState::Streaming,
        })
    }

    async fn prepare(&self, session_id: Option<&str>, message: &str) -> AppResult<PreparedTurn> {
        if message.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Message is required and must be a non-empty string".to_string(),
            ));
        }

        let session_id = match session_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id.to_string(),
            None => self.sessions.create_session(),
        };

        let guard = self.sessions.lock(&session_id).await;
        let history = guard.history().to_vec();

        tracing::debug!("Session {}: {} prior messages", session_id, history.len());

        let context = self.knowledge.search(message).await;
        let sources: Vec<GroundingSource> = context
            .iter()
            .enumerate()
            .map(|(i, r)| {
                GroundingSource::new(i + 1, &r.source_id, &r.heading, r.similarity_score, &r.content)
            })
            .collect();
        let instructions = self.prompts.build_instructions(&sources)?;

        let mut conversation = history;
        conversation.push(ChatMessage::user(message));

        let request = LlmRequest::new(&self.generation.model, conversation.clone())
            .with_system(instructions)
            .with_max_tokens(self.generation.max_tokens)
            .with_temperature(self.generation.temperature);

        Ok(PreparedTurn {
            guard,
            conversation,
            context,
            request,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    Streaming,
    Completed,
    Failed,
}

/// Incremental answer for one turn.
///
/// Yields text increments in generation order. Upstream failures are yielded
/// once as `GenerationFailed`, after which the stream ends.
pub struct TurnStream {
    session_id: String,
    upstream: LlmStream,
    guard: Option<SessionGuard>,
    conversation: Vec<ChatMessage>,
    context: Vec<RetrievalResult>,
    answer: String,
    upstream_done: bool,
    state: TurnState,
}

impl TurnStream {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Text received so far; the full answer once complete.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Chunks the answer was grounded on.
    pub fn context(&self) -> &[RetrievalResult] {
        &self.context
    }

    /// Whether the stream finished normally and the turn was recorded.
    pub fn is_complete(&self) -> bool {
        self.state == TurnState::Completed
    }

    fn complete(&mut self) -> Option<AppResult<String>> {
        let mut guard = self.guard.take()?;

        if self.answer.trim().is_empty() {
            self.state = TurnState::Failed;
            return Some(Err(AppError::GenerationFailed(
                "Generation returned an empty answer".to_string(),
            )));
        }

        let mut conversation = std::mem::take(&mut self.conversation);
        conversation.push(ChatMessage::assistant(self.answer.trim()));
        guard.replace_history(conversation);
        self.state = TurnState::Completed;

        tracing::info!(
            "Session {}: streamed answer complete ({} chars, {} sources)",
            self.session_id,
            self.answer.chars().count(),
            self.context.len()
        );
        tracing::debug!("Session {} answer: {}", self.session_id, self.answer);

        None
    }

    fn fail(&mut self, error: AppError) -> AppError {
        self.state = TurnState::Failed;
        self.guard = None;
        tracing::warn!("Session {}: generation failed: {}", self.session_id, error);
        AppError::GenerationFailed(error.to_string())
    }
}

impl Stream for TurnStream {
    type Item = AppResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.state != TurnState::Streaming {
            return Poll::Ready(None);
        }
        if this.upstream_done {
            return Poll::Ready(this.complete());
        }

        loop {
            match ready!(this.upstream.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    this.upstream_done = chunk.done;
                    if !chunk.content.is_empty() {
                        this.answer.push_str(&chunk.content);
                        return Poll::Ready(Some(Ok(chunk.content)));
                    }
                    if chunk.done {
                        return Poll::Ready(this.complete());
                    }
                }
                Some(Err(e)) => return Poll::Ready(Some(Err(this.fail(e)))),
                None => return Poll::Ready(this.complete()),
            }
        }
    }
}
