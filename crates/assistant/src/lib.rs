//! Conversational support assistant for faqdesk.
//!
//! Ties the knowledge base, prompt builder and LLM client together into
//! multi-turn, grounded answers with a confidence score.

pub mod confidence;
pub mod orchestrator;
pub mod session;

// Re-export commonly used types
pub use confidence::{ConfidenceBreakdown, ConfidenceEvaluator, ConfidenceResult, DEFAULT_THRESHOLD};
pub use orchestrator::{ChatResponse, ConversationOrchestrator, GenerationSettings, TurnStream};
pub use session::{Session, SessionConfig, SessionGuard, SessionStore};
