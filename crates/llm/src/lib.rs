//! Generation clients for faqdesk.
//!
//! Provider-agnostic abstraction over chat-style language models, with
//! single-shot and streaming entry points.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Anthropic**: Hosted Messages API
//!
//! # Example
//! ```no_run
//! use faqdesk_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("llama3.2", vec![ChatMessage::user("Hello, world!")]);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{
    ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage, Role,
};
pub use factory::create_client;
pub use providers::{AnthropicClient, OllamaClient};
pub use types::ProviderType;
