//! Dense retrieval: embed the query, then ask the vector index.

use std::sync::Arc;

use tracing::{debug, warn};

use driftlog_core::{Embedder, RankedResult, Result, SearchFilters, VectorIndex};

/// Embedding-similarity retriever over a vector index.
pub struct DenseRetriever<E: ?Sized, V: ?Sized> {
    embedder: Arc<E>,
    index: Arc<V>,
}

impl<E, V> DenseRetriever<E, V>
where
    E: Embedder + ?Sized,
    V: VectorIndex + ?Sized,
{
    pub fn new(embedder: Arc<E>, index: Arc<V>) -> Self {
        Self { embedder, index }
    }

    /// Return up to `top_k` chunks by descending cosine similarity.
    ///
    /// An embedding failure or an empty query vector yields no results.
    /// Errors from the vector index itself are returned to the caller.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<RankedResult>> {
        let embedding = match self.embedder.embed_query(query).await {
            Ok(embedding) if !embedding.is_empty() => embedding,
            Ok(_) => {
                warn!("Query embedding was empty; skipping dense search");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!("Query embedding failed, skipping dense search: {}", e);
                return Ok(Vec::new());
            }
        };

        let hits = self.index.vector_search(&embedding, top_k, filters).await?;
        debug!("Dense search returned {} hits", hits.len());

        Ok(hits
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(rank, hit)| RankedResult::dense(hit.chunk, hit.similarity, rank + 1))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use driftlog_core::{Chunk, Document, DocumentInput, DriftlogError, VectorHit};

    struct FixedEmbedder(Result<Vec<f32>>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| Vec::new()).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(DriftlogError::embedding("provider down")),
            }
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    /// Returns canned hits, or fails.
    struct FakeIndex(Option<Vec<VectorHit>>);

    #[async_trait]
    impl VectorIndex for FakeIndex {
        async fn vector_search(
            &self,
            _embedding: &[f32],
            limit: usize,
            _filters: &SearchFilters,
        ) -> Result<Vec<VectorHit>> {
            match &self.0 {
                Some(hits) => Ok(hits.iter().take(limit).cloned().collect()),
                None => Err(DriftlogError::database("connection lost")),
            }
        }
    }

    fn hit(content: &str, similarity: f64) -> VectorHit {
        let doc = Document::new(DocumentInput {
            content: content.to_string(),
            source: None,
            location: None,
            country: None,
            tags: None,
        });
        VectorHit {
            chunk: Chunk::new(&doc, 0, content),
            similarity,
        }
    }

    #[tokio::test]
    async fn test_ranks_hits_in_order() {
        let retriever = DenseRetriever::new(
            Arc::new(FixedEmbedder(Ok(vec![1.0, 0.0]))),
            Arc::new(FakeIndex(Some(vec![hit("a", 0.9), hit("b", 0.5), hit("c", 0.1)]))),
        );

        let results = retriever
            .search("q", 2, &SearchFilters::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "a");
        assert_eq!(results[0].dense_rank, Some(1));
        assert_eq!(results[0].similarity_score, Some(0.9));
        assert_eq!(results[1].dense_rank, Some(2));
        assert!(results[1].sparse_rank.is_none());
    }

    #[tokio::test]
    async fn test_empty_embedding_degrades() {
        let retriever = DenseRetriever::new(
            Arc::new(FixedEmbedder(Ok(Vec::new()))),
            Arc::new(FakeIndex(None)),
        );

        let results = retriever
            .search("q", 5, &SearchFilters::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_error_degrades() {
        let retriever = DenseRetriever::new(
            Arc::new(FixedEmbedder(Err(DriftlogError::internal("unused")))),
            Arc::new(FakeIndex(None)),
        );

        let results = retriever
            .search("q", 5, &SearchFilters::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_index_error_propagates() {
        let retriever = DenseRetriever::new(
            Arc::new(FixedEmbedder(Ok(vec![1.0, 0.0]))),
            Arc::new(FakeIndex(None)),
        );

        let err = retriever
            .search("q", 5, &SearchFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
