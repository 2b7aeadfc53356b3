//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// One retrievable unit of a corpus document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, including the `"<heading>: "` prefix
    pub content: String,

    /// Originating document (file name)
    pub source_id: String,

    /// Section heading the chunk was cut from
    pub heading: String,

    /// Ordering hint within a document. Not unique.
    pub sequence_index: usize,

    /// Attached once by the vector index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(
        content: impl Into<String>,
        source_id: impl Into<String>,
        heading: impl Into<String>,
        sequence_index: usize,
    ) -> Self {
        Self {
            content: content.into(),
            source_id: source_id.into(),
            heading: heading.into(),
            sequence_index,
            embedding: None,
        }
    }
}

/// A chunk snapshot paired with its similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub content: String,
    pub source_id: String,
    pub heading: String,
    pub sequence_index: usize,
    pub similarity_score: f32,
}

impl RetrievalResult {
    pub(crate) fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            content: chunk.content.clone(),
            source_id: chunk.source_id.clone(),
            heading: chunk.heading.clone(),
            sequence_index: chunk.sequence_index,
            similarity_score,
        }
    }
}

/// Read-only summary of a loaded knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub total_chunks: usize,
    pub total_sources: usize,
    pub embedding_dimensions: usize,

    /// Distinct source ids, sorted
    pub sources: Vec<String>,

    pub embedding_provider: String,
    pub embedding_model: String,
}
