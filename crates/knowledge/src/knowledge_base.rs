//! Corpus loading and search.

use crate::chunker::chunk_document;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::types::{Chunk, KnowledgeStats, RetrievalResult};
use crate::vector_index::VectorIndex;
use faqdesk_core::config::RetrievalSettings;
use faqdesk_core::{AppConfig, AppError, AppResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// File extensions treated as corpus documents.
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// A loaded, immutable corpus with its vector index.
///
/// Built once at startup and shared behind an `Arc`; every method takes
/// `&self`.
#[derive(Debug)]
pub struct KnowledgeBase {
    index: VectorIndex,
    provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    similarity_threshold: f32,
}

impl KnowledgeBase {
    /// Load the corpus directory named by the configuration.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let provider = create_provider(&config.embedding)?;
        Self::load(&config.corpus_dir, provider, &config.retrieval).await
    }

    /// Load every eligible document in `dir`, chunk it and build the index.
    ///
    /// # Errors
    /// - `CorpusNotFound` if `dir` is not a directory
    /// - `EmptyCorpus` if it holds no `.md`, `.markdown` or `.txt` file
    /// - embedding provider errors, which abort the whole load
    pub async fn load(
        dir: &Path,
        provider: Arc<dyn EmbeddingProvider>,
        settings: &RetrievalSettings,
    ) -> AppResult<Self> {
        let start = Instant::now();

        if !dir.is_dir() {
            return Err(AppError::CorpusNotFound(dir.to_path_buf()));
        }

        let documents = discover_documents(dir);
        if documents.is_empty() {
            return Err(AppError::EmptyCorpus(dir.to_path_buf()));
        }

        tracing::info!("Found {} documents in {:?}", documents.len(), dir);

        let mut chunks: Vec<Chunk> = Vec::new();
        for path in &documents {
            let Some(source_id) = path.file_name().map(|n| n.to_string_lossy().to_string())
            else {
                continue;
            };

            let bytes = std::fs::read(path)?;
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    tracing::warn!("Skipping {:?}: not valid UTF-8", path);
                    continue;
                }
            };

            let document_chunks =
                chunk_document(&source_id, &text, settings.chunk_size, settings.chunk_overlap);
            tracing::debug!("{}: {} chunks", source_id, document_chunks.len());
            chunks.extend(document_chunks);
        }

        if chunks.is_empty() {
            tracing::warn!("Corpus in {:?} produced no chunks", dir);
        }

        let index = VectorIndex::build(chunks, provider.as_ref()).await?;

        tracing::info!(
            "Knowledge base loaded: {} chunks from {} documents in {:.2}s",
            index.len(),
            documents.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(Self {
            index,
            provider,
            top_k: settings.top_k,
            similarity_threshold: settings.similarity_threshold,
        })
    }

    /// Search with the configured `top_k` and similarity threshold.
    pub async fn search(&self, query: &str) -> Vec<RetrievalResult> {
        self.search_with(query, self.top_k, self.similarity_threshold)
            .await
    }

    /// Search with explicit limits.
    ///
    /// Never fails: index misuse and embedding errors are logged and yield no
    /// results.
    pub async fn search_with(
        &self,
        query: &str,
        top_k: usize,
        similarity_threshold: f32,
    ) -> Vec<RetrievalResult> {
        match self
            .index
            .query(query, self.provider.as_ref(), top_k, similarity_threshold)
            .await
        {
            Ok(results) => {
                tracing::info!("Search query: '{}' - found {} relevant chunks", query, results.len());
                results
            }
            Err(AppError::NotInitialized) => {
                tracing::error!("Knowledge base not initialized");
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Search failed for '{}': {}", query, e);
                Vec::new()
            }
        }
    }

    /// Distinct source ids, sorted.
    pub fn sources(&self) -> Vec<String> {
        self.index
            .chunks()
            .iter()
            .map(|c| c.source_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Chunk at `index` in load order.
    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.index.chunk(index)
    }

    pub fn get_stats(&self) -> KnowledgeStats {
        let sources = self.sources();
        KnowledgeStats {
            total_chunks: self.index.len(),
            total_sources: sources.len(),
            embedding_dimensions: self.index.dimensions(),
            sources,
            embedding_provider: self.provider.provider_name().to_string(),
            embedding_model: self.provider.model_name().to_string(),
        }
    }

    pub fn default_top_k(&self) -> usize {
        self.top_k
    }

    pub fn default_similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }
}

/// Eligible documents directly inside `dir`, in file-name order.
fn discover_documents(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashProvider;
    use std::fs;
    use tempfile::TempDir;

    fn provider() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashProvider::new("trigram-v1", 384))
    }

    fn settings() -> RetrievalSettings {
        RetrievalSettings::default()
    }

    fn write_corpus(dir: &Path) {
        fs::write(
            dir.join("billing.md"),
            "# Refunds\nOur refund policy allows returns within 30 days.\n\n# Invoices\nInvoices are emailed monthly.\n",
        )
        .unwrap();
        fs::write(
            dir.join("account.txt"),
            "# Password Reset\nClick forgot password on the login page.\n",
        )
        .unwrap();
        fs::write(dir.join("notes.pdf"), "ignored").unwrap();
        fs::create_dir(dir.join("nested")).unwrap();
        fs::write(dir.join("nested").join("deep.md"), "# Deep\nNot loaded.").unwrap();
    }

    #[tokio::test]
    async fn test_missing_dir_is_corpus_not_found() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent");
        let result = KnowledgeBase::load(&missing, provider(), &settings()).await;
        assert!(matches!(result, Err(AppError::CorpusNotFound(p)) if p == missing));
    }

    #[tokio::test]
    async fn test_empty_dir_is_empty_corpus() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("readme.pdf"), "not a document").unwrap();
        let result = KnowledgeBase::load(temp.path(), provider(), &settings()).await;
        assert!(matches!(result, Err(AppError::EmptyCorpus(_))));
    }

    #[tokio::test]
    async fn test_load_and_stats() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());

        let kb = KnowledgeBase::load(temp.path(), provider(), &settings())
            .await
            .unwrap();
        let stats = kb.get_stats();

        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.total_sources, 2);
        assert_eq!(stats.embedding_dimensions, 384);
        assert_eq!(stats.sources, vec!["account.txt", "billing.md"]);
        assert_eq!(stats.embedding_provider, "hash");

        // documents are processed in file-name order
        assert_eq!(kb.chunk(0).map(|c| c.source_id.as_str()), Some("account.txt"));
        assert!(kb.chunk(3).is_none());
    }

    #[tokio::test]
    async fn test_refund_policy_scenario() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());
        let kb = KnowledgeBase::load(temp.path(), provider(), &settings())
            .await
            .unwrap();

        let results = kb.search_with("refund policy", 5, 0.3).await;
        assert!(!results.is_empty());
        assert!(results[0]
            .content
            .contains("Our refund policy allows returns within 30 days"));
        assert_eq!(results[0].source_id, "billing.md");
        assert_eq!(results[0].heading, "Refunds");
    }

    #[tokio::test]
    async fn test_threshold_and_top_k_respected() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());
        let kb = KnowledgeBase::load(temp.path(), provider(), &settings())
            .await
            .unwrap();

        let results = kb.search_with("refund policy", 1, -1.0).await;
        assert_eq!(results.len(), 1);

        let results = kb.search_with("refund policy", 5, 0.3).await;
        assert!(results.iter().all(|r| r.similarity_score >= 0.3));
    }

    #[tokio::test]
    async fn test_search_results_nest_across_top_k() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());
        let kb = KnowledgeBase::load(temp.path(), provider(), &settings())
            .await
            .unwrap();

        for query in ["refund policy", "reset my password", "monthly invoices"] {
            let all = kb.search_with(query, 3, -1.0).await;
            assert_eq!(all.len(), 3);
            for k in 1..=3 {
                assert_eq!(kb.search_with(query, k, -1.0).await, all[..k].to_vec());
            }
        }
    }

    #[tokio::test]
    async fn test_whitespace_query_does_not_fail() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());
        let kb = KnowledgeBase::load(temp.path(), provider(), &settings())
            .await
            .unwrap();

        // zero query vector scores 0.0 everywhere, below the default threshold
        assert!(kb.search("   ").await.is_empty());
    }

    #[tokio::test]
    async fn test_corpus_of_empty_files_searches_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("blank.md"), "\n\n").unwrap();
        let kb = KnowledgeBase::load(temp.path(), provider(), &settings())
            .await
            .unwrap();

        assert_eq!(kb.get_stats().total_chunks, 0);
        assert!(kb.search("anything").await.is_empty());
    }
}
