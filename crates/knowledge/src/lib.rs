//! Knowledge base for faqdesk.
//!
//! Loads a directory of documents, cuts them into heading-aware chunks,
//! embeds them once and answers top-k similarity queries from memory.

pub mod chunker;
pub mod embeddings;
pub mod knowledge_base;
pub mod types;
pub mod vector_index;

// Re-export commonly used types
pub use chunker::chunk_document;
pub use embeddings::{create_provider, EmbeddingProvider, HashProvider, OllamaProvider};
pub use knowledge_base::KnowledgeBase;
pub use types::{Chunk, KnowledgeStats, RetrievalResult};
pub use vector_index::VectorIndex;
