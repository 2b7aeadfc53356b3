//! In-memory vector index over knowledge chunks.
//!
//! The index is built once, all-or-nothing, and is read-only afterwards so it
//! can be shared across tasks without locking.

use crate::embeddings::EmbeddingProvider;
use crate::types::{Chunk, RetrievalResult};
use faqdesk_core::{AppError, AppResult};

/// Chunks with their embeddings, in insertion order.
#[derive(Debug, Default)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    dimensions: usize,
}

impl VectorIndex {
    /// Embed every chunk with a single batch call and store the results.
    ///
    /// Fails without building anything if the provider returns the wrong
    /// number of vectors or vectors of differing dimensionality.
    pub async fn build(
        mut chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
    ) -> AppResult<Self> {
        if chunks.is_empty() {
            return Ok(Self::default());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

        tracing::info!(
            "Embedding {} chunks using provider '{}' (model: {})",
            texts.len(),
            provider.provider_name(),
            provider.model_name()
        );

        let embeddings = provider.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings[0].len();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(AppError::DimensionMismatch {
                expected: dimensions,
                actual: bad.len(),
            });
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = Some(embedding);
        }

        tracing::debug!("Built vector index: {} entries, {} dimensions", chunks.len(), dimensions);

        Ok(Self { chunks, dimensions })
    }

    /// Embed `text` and rank stored chunks against it.
    pub async fn query(
        &self,
        text: &str,
        provider: &dyn EmbeddingProvider,
        top_k: usize,
        similarity_threshold: f32,
    ) -> AppResult<Vec<RetrievalResult>> {
        if self.chunks.is_empty() {
            return Err(AppError::NotInitialized);
        }

        let query = provider.embed(text).await?;
        self.query_vector(&query, top_k, similarity_threshold)
    }

    /// Rank stored chunks by cosine similarity to `query`.
    ///
    /// Ranking is descending and stable, so earlier-inserted chunks win ties.
    /// The list is truncated to `top_k` before entries strictly below
    /// `similarity_threshold` are discarded.
    pub fn query_vector(
        &self,
        query: &[f32],
        top_k: usize,
        similarity_threshold: f32,
    ) -> AppResult<Vec<RetrievalResult>> {
        if self.chunks.is_empty() {
            return Err(AppError::NotInitialized);
        }
        if query.len() != self.dimensions {
            return Err(AppError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| {
                chunk
                    .embedding
                    .as_deref()
                    .map(|embedding| (i, cosine_similarity(query, embedding)))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .filter(|(_, score)| *score >= similarity_threshold)
            .map(|(i, score)| RetrievalResult::from_chunk(&self.chunks[i], score))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimensionality shared by every stored vector, 0 when empty.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Returns preset vectors keyed by exact text.
    #[derive(Debug)]
    struct FixedProvider {
        vectors: HashMap<String, Vec<f32>>,
        dimensions: usize,
    }

    impl FixedProvider {
        fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                dimensions: entries[0].1.len(),
                vectors: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    self.vectors
                        .get(t)
                        .cloned()
                        .unwrap_or_else(|| vec![0.0; self.dimensions])
                })
                .collect())
        }
    }

    /// Returns fewer vectors than requested.
    #[derive(Debug)]
    struct ShortProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn provider_name(&self) -> &str {
            "short"
        }

        fn model_name(&self) -> &str {
            "short"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]])
        }
    }

    fn chunk(content: &str) -> Chunk {
        Chunk::new(content, "faq.md", "FAQ", 0)
    }

    async fn sample_index() -> (VectorIndex, FixedProvider) {
        let provider = FixedProvider::new(&[
            ("alpha", vec![1.0, 0.0]),
            ("beta", vec![0.8, 0.6]),
            ("gamma", vec![0.0, 1.0]),
            ("alpha twin", vec![1.0, 0.0]),
            ("query", vec![1.0, 0.0]),
        ]);
        let chunks = vec![chunk("alpha"), chunk("beta"), chunk("gamma"), chunk("alpha twin")];
        let index = VectorIndex::build(chunks, &provider).await.unwrap();
        (index, provider)
    }

    #[tokio::test]
    async fn test_build_attaches_embeddings() {
        let (index, _) = sample_index().await;
        assert_eq!(index.len(), 4);
        assert_eq!(index.dimensions(), 2);
        assert!(index.chunks().iter().all(|c| c.embedding.is_some()));
        assert_eq!(index.chunk(1).map(|c| c.content.as_str()), Some("beta"));
        assert!(index.chunk(9).is_none());
    }

    #[tokio::test]
    async fn test_query_descending_with_stable_ties() {
        let (index, provider) = sample_index().await;
        let results = index.query("query", &provider, 10, -1.0).await.unwrap();

        let order: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(order, vec!["alpha", "alpha twin", "beta", "gamma"]);
        for pair in results.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
        }
    }

    #[tokio::test]
    async fn test_truncate_then_threshold() {
        let (index, provider) = sample_index().await;

        let results = index.query("query", &provider, 2, 0.0).await.unwrap();
        assert_eq!(results.len(), 2);

        // beta scores 0.8, gamma scores 0.0
        let results = index.query("query", &provider, 4, 0.5).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.similarity_score >= 0.5));

        // exactly at threshold is kept
        let results = index.query_vector(&[1.0, 0.0], 1, 1.0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "alpha");
    }

    #[tokio::test]
    async fn test_smaller_top_k_is_rank_prefix() {
        let (index, provider) = sample_index().await;
        let full = index.query("query", &provider, 4, -1.0).await.unwrap();

        for k in 0..=4 {
            let partial = index.query("query", &provider, k, -1.0).await.unwrap();
            assert_eq!(partial, full[..k].to_vec(), "top_k {}", k);
        }
    }

    #[test]
    fn test_nan_scores_do_not_break_ranking() {
        let mut chunks = vec![chunk("nan"), chunk("one"), chunk("half")];
        chunks[0].embedding = Some(vec![f32::NAN, 0.0]);
        chunks[1].embedding = Some(vec![1.0, 0.0]);
        chunks[2].embedding = Some(vec![0.5, 0.5]);
        let index = VectorIndex { chunks, dimensions: 2 };

        let results = index.query_vector(&[1.0, 0.0], 3, -1.0).unwrap();
        // NaN never clears a threshold
        let order: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(order, vec!["one", "half"]);
    }

    #[tokio::test]
    async fn test_zero_query_vector_scores_zero() {
        let (index, provider) = sample_index().await;
        let results = index.query("unknown text", &provider, 4, -1.0).await.unwrap();
        assert!(results.iter().all(|r| r.similarity_score == 0.0));
        // ties keep insertion order
        assert_eq!(results[0].content, "alpha");
    }

    #[tokio::test]
    async fn test_empty_index_not_initialized() {
        let provider = FixedProvider::new(&[("query", vec![1.0, 0.0])]);
        let index = VectorIndex::build(Vec::new(), &provider).await.unwrap();
        assert!(index.is_empty());
        assert!(matches!(
            index.query("query", &provider, 5, 0.0).await,
            Err(AppError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let (index, _) = sample_index().await;
        let result = index.query_vector(&[1.0, 0.0, 0.0], 5, 0.0);
        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_mixed_dimensions() {
        let provider = FixedProvider::new(&[("a", vec![1.0, 0.0]), ("b", vec![1.0, 0.0, 0.0])]);
        let result = VectorIndex::build(vec![chunk("a"), chunk("b")], &provider).await;
        assert!(matches!(result, Err(AppError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_build_rejects_short_batch() {
        let result = VectorIndex::build(vec![chunk("a"), chunk("b")], &ShortProvider).await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
