//! Embedding capability for the knowledge base.
//!
//! Provider-agnostic batch embedding with a local hashing provider and an
//! Ollama-backed neural provider.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{HashProvider, OllamaProvider};
