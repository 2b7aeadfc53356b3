//! Prompt types for faqdesk.

use serde::{Deserialize, Serialize};

/// A template override loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// The pair of generation instructions used per turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    /// Used when retrieval returns nothing; tells the model to acknowledge
    /// the gap and announce a human follow-up.
    pub no_context: String,

    /// Used when retrieval returns chunks; iterates `sources`.
    pub grounded: String,
}

/// One retrieved chunk as rendered into the grounded instructions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundingSource {
    /// 1-based position in the ranking
    pub rank: usize,

    /// Originating document
    #[serde(rename = "sourceId")]
    pub source_id: String,

    /// Section heading of the chunk
    pub heading: String,

    /// Similarity formatted to two decimals
    pub relevance: String,

    /// Chunk text
    pub content: String,
}

impl GroundingSource {
    pub fn new(
        rank: usize,
        source_id: impl Into<String>,
        heading: impl Into<String>,
        score: f32,
        content: impl Into<String>,
    ) -> Self {
        Self {
            rank,
            source_id: source_id.into(),
            heading: heading.into(),
            relevance: format!("{:.2}", score),
            content: content.into(),
        }
    }
}
