//! Error types for faqdesk.
//!
//! One error enum covers configuration, I/O and provider failures as well as
//! the retrieval taxonomy: corpus loading, index misuse, generation failures
//! and rejected input.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for faqdesk.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors (transport, protocol, parsing)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base and embedding errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The corpus directory does not exist. Fatal at startup.
    #[error("Knowledge base directory not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    /// The corpus directory holds no eligible documents. Fatal at startup.
    #[error("No eligible documents found in {}", .0.display())]
    EmptyCorpus(PathBuf),

    /// The vector index was queried before any embeddings were stored.
    #[error("Vector index is not initialized")]
    NotInitialized,

    /// An embedding's dimensionality disagrees with the index.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The generation service failed for this turn. History is left untouched.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Malformed user input, rejected before any retrieval work.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the error ends a single turn rather than the whole process.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::GenerationFailed(_) | AppError::InvalidInput(_) | AppError::Llm(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AppError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 384, got 768"
        );
    }

    #[test]
    fn test_corpus_errors_include_path() {
        let err = AppError::EmptyCorpus(PathBuf::from("/tmp/kb"));
        assert!(err.to_string().contains("/tmp/kb"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_generation_failed_is_recoverable() {
        assert!(AppError::GenerationFailed("timeout".to_string()).is_recoverable());
        assert!(!AppError::NotInitialized.is_recoverable());
    }
}
