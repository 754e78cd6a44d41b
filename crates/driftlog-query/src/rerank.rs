//! Second-pass relevance scoring over fused candidates.

use std::sync::Arc;

use tracing::{debug, error, warn};

use driftlog_core::{RankedResult, RelevanceScorer};

/// What happened during a rerank call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankStatus {
    /// The relevance model ordered the candidates.
    Applied,
    /// The relevance model failed; fused order was kept.
    Fallback,
    /// Nothing to rerank.
    Skipped,
}

/// Output of [`Reranker::rerank`].
#[derive(Debug, Clone)]
pub struct Reranked {
    pub results: Vec<RankedResult>,
    pub status: RerankStatus,
}

/// Reranker with a fused-order fallback.
pub struct Reranker<R: ?Sized> {
    scorer: Arc<R>,
}

impl<R> Reranker<R>
where
    R: RelevanceScorer + ?Sized,
{
    pub fn new(scorer: Arc<R>) -> Self {
        Self { scorer }
    }

    /// Reorder `candidates` by relevance to `query`, keeping at most `top_n`.
    ///
    /// Never fails: if the relevance model errors, the first `top_n`
    /// candidates are returned in their existing order with a rerank score
    /// of zero.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RankedResult>,
        top_n: usize,
    ) -> Reranked {
        if candidates.is_empty() || top_n == 0 {
            return Reranked {
                results: Vec::new(),
                status: RerankStatus::Skipped,
            };
        }

        let requested = top_n.min(candidates.len());
        let documents: Vec<&str> = candidates
            .iter()
            .map(|c| c.chunk.content.as_str())
            .collect();

        let scores = match self.scorer.score(query, &documents, requested).await {
            Ok(scores) => scores,
            Err(e) => {
                error!("Rerank failed, falling back to fused order: {}", e);
                return Reranked {
                    results: fallback(candidates, top_n),
                    status: RerankStatus::Fallback,
                };
            }
        };

        let mut slots: Vec<Option<RankedResult>> = candidates.into_iter().map(Some).collect();
        let mut results = Vec::with_capacity(requested);
        for entry in scores {
            let Some(slot) = slots.get_mut(entry.index) else {
                warn!(
                    "Relevance model returned out-of-range index {}; ignoring",
                    entry.index
                );
                continue;
            };
            let Some(mut result) = slot.take() else {
                warn!("Relevance model returned index {} twice; ignoring", entry.index);
                continue;
            };
            result.rerank_score = Some(entry.relevance_score);
            results.push(result);
            if results.len() == top_n {
                break;
            }
        }

        debug!("Reranked to {} results", results.len());

        Reranked {
            results,
            status: RerankStatus::Applied,
        }
    }
}

fn fallback(candidates: Vec<RankedResult>, top_n: usize) -> Vec<RankedResult> {
    candidates
        .into_iter()
        .take(top_n)
        .map(|mut c| {
            c.rerank_score = Some(0.0);
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use driftlog_core::{
        Chunk, Document, DocumentInput, DriftlogError, RelevanceScore, Result,
    };

    struct FailingScorer;

    #[async_trait]
    impl RelevanceScorer for FailingScorer {
        async fn score(&self, _: &str, _: &[&str], _: usize) -> Result<Vec<RelevanceScore>> {
            Err(DriftlogError::rerank("service unavailable"))
        }
    }

    /// Returns fixed scores and counts calls.
    struct FixedScorer {
        scores: Vec<RelevanceScore>,
        calls: AtomicUsize,
    }

    impl FixedScorer {
        fn new(pairs: &[(usize, f64)]) -> Self {
            Self {
                scores: pairs
                    .iter()
                    .map(|&(index, relevance_score)| RelevanceScore {
                        index,
                        relevance_score,
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RelevanceScorer for FixedScorer {
        async fn score(&self, _: &str, _: &[&str], _: usize) -> Result<Vec<RelevanceScore>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores.clone())
        }
    }

    fn candidates(n: usize) -> Vec<RankedResult> {
        let doc = Document::new(DocumentInput {
            content: "doc".to_string(),
            source: None,
            location: None,
            country: None,
            tags: None,
        });
        (0..n)
            .map(|i| {
                let mut r =
                    RankedResult::dense(Chunk::new(&doc, i as u32, &format!("c{}", i)), 0.5, i + 1);
                r.rrf_score = Some(1.0 / (61 + i) as f64);
                r
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fallback_returns_prefix_with_zero_scores() {
        let reranker = Reranker::new(Arc::new(FailingScorer));
        let input = candidates(8);

        let out = reranker.rerank("q", input.clone(), 5).await;

        assert_eq!(out.status, RerankStatus::Fallback);
        assert_eq!(out.results.len(), 5);
        for (got, want) in out.results.iter().zip(&input) {
            assert_eq!(got.chunk.id, want.chunk.id);
            assert_eq!(got.rrf_score, want.rrf_score);
            assert_eq!(got.rerank_score, Some(0.0));
        }
    }

    #[tokio::test]
    async fn test_applies_provider_order() {
        let scorer = Arc::new(FixedScorer::new(&[(2, 0.95), (0, 0.40)]));
        let reranker = Reranker::new(scorer.clone());
        let input = candidates(3);

        let out = reranker.rerank("q", input.clone(), 2).await;

        assert_eq!(out.status, RerankStatus::Applied);
        assert_eq!(out.results.len(), 2);
        assert_eq!(out.results[0].chunk.id, input[2].chunk.id);
        assert_eq!(out.results[0].rerank_score, Some(0.95));
        // Earlier fields carried through.
        assert_eq!(out.results[0].rrf_score, input[2].rrf_score);
        assert_eq!(out.results[0].dense_rank, Some(3));
        assert_eq!(out.results[1].chunk.id, input[0].chunk.id);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ignores_bad_indices_and_truncates() {
        let scorer = Arc::new(FixedScorer::new(&[(7, 0.9), (1, 0.8), (1, 0.7), (0, 0.6), (2, 0.5)]));
        let reranker = Reranker::new(scorer);

        let out = reranker.rerank("q", candidates(3), 2).await;

        let scores: Vec<Option<f64>> = out.results.iter().map(|r| r.rerank_score).collect();
        assert_eq!(scores, vec![Some(0.8), Some(0.6)]);
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_scorer() {
        let scorer = Arc::new(FixedScorer::new(&[(0, 1.0)]));
        let reranker = Reranker::new(scorer.clone());

        let out = reranker.rerank("q", Vec::new(), 5).await;

        assert_eq!(out.status, RerankStatus::Skipped);
        assert!(out.results.is_empty());
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }
}
