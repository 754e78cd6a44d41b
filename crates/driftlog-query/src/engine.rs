//! Query engine for hybrid retrieval and grounded answers.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use driftlog_core::{
    AnswerResult, ChunkSource, DriftlogConfig, Embedder, Generator, RankedResult,
    RelevanceScorer, Result, SearchFilters, VectorIndex,
};

use crate::dense::DenseRetriever;
use crate::fusion::{reciprocal_rank_fusion, FusionStats};
use crate::lexical::LexicalIndex;
use crate::prompts::NO_ANSWER;
use crate::rerank::{RerankStatus, Reranker};
use crate::synthesis::{AnswerSynthesizer, DEFAULT_EXCERPT_CHARS};

/// Configuration for the query pipeline.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Candidates requested from the dense path.
    pub dense_top_k: usize,

    /// Candidates requested from the lexical path.
    pub sparse_top_k: usize,

    /// RRF damping constant.
    pub rrf_k: u32,

    /// Candidates kept after fusion.
    pub fused_top_k: usize,

    /// Chunks shown to the generator.
    pub rerank_top_n: usize,

    /// Generation output budget.
    pub max_tokens: u32,

    /// Citation excerpt length in characters.
    pub excerpt_chars: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            dense_top_k: 20,
            sparse_top_k: 20,
            rrf_k: 60,
            fused_top_k: 20,
            rerank_top_n: 5,
            max_tokens: 1024,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl From<&DriftlogConfig> for QueryConfig {
    fn from(config: &DriftlogConfig) -> Self {
        Self {
            dense_top_k: config.retrieval.dense_top_k,
            sparse_top_k: config.retrieval.sparse_top_k,
            rrf_k: config.retrieval.rrf_k,
            fused_top_k: config.retrieval.fused_top_k,
            rerank_top_n: config.retrieval.rerank_top_n,
            max_tokens: config.generation.max_tokens,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// Which retrieval paths produced hits and how reranking went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalStrategy {
    pub dense: bool,
    pub sparse: bool,
    pub rerank: RerankStatus,
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths = match (self.dense, self.sparse) {
            (true, true) => "dense+sparse",
            (true, false) => "dense",
            (false, true) => "sparse",
            (false, false) => return write!(f, "none"),
        };
        write!(f, "{}+rrf", paths)?;
        match self.rerank {
            RerankStatus::Applied => write!(f, "+rerank"),
            RerankStatus::Fallback => write!(f, "+rerank_fallback"),
            RerankStatus::Skipped => Ok(()),
        }
    }
}

/// Ranked candidates without generation.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Reranked (or fallback-ordered) chunks, best first.
    pub results: Vec<RankedResult>,

    /// Candidates that came out of fusion.
    pub chunks_retrieved: usize,

    pub fusion: FusionStats,
    pub strategy: RetrievalStrategy,
}

/// A grounded answer plus pipeline diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub answer: AnswerResult,
    pub retrieval_strategy: String,
    pub latency_ms: u64,
}

/// Hybrid retrieval and answer engine.
///
/// Runs dense and lexical search concurrently, fuses the two rankings with
/// RRF, reranks the fused list, and synthesizes a cited answer.
pub struct QueryEngine<S: ?Sized, E: ?Sized, R: ?Sized, G: ?Sized> {
    /// Vector index and lexical corpus source.
    store: Arc<S>,

    lexical: Arc<LexicalIndex>,
    dense: DenseRetriever<E, S>,
    reranker: Reranker<R>,
    synthesizer: AnswerSynthesizer<G>,
    config: QueryConfig,
}

impl<S, E, R, G> QueryEngine<S, E, R, G>
where
    S: VectorIndex + ChunkSource + ?Sized,
    E: Embedder + ?Sized,
    R: RelevanceScorer + ?Sized,
    G: Generator + ?Sized,
{
    /// Create a new query engine with an unbuilt lexical index.
    pub fn new(
        store: Arc<S>,
        embedder: Arc<E>,
        scorer: Arc<R>,
        generator: Arc<G>,
        config: QueryConfig,
    ) -> Self {
        Self {
            dense: DenseRetriever::new(embedder, store.clone()),
            store,
            lexical: Arc::new(LexicalIndex::new()),
            reranker: Reranker::new(scorer),
            synthesizer: AnswerSynthesizer::new(generator, config.max_tokens)
                .with_excerpt_chars(config.excerpt_chars),
            config,
        }
    }

    /// Reload every chunk from the store and swap in a fresh lexical index.
    pub async fn rebuild_lexical_index(&self) -> Result<usize> {
        self.lexical.rebuild_from(self.store.as_ref()).await
    }

    /// Retrieve, fuse, and rerank candidates for `question`.
    pub async fn retrieve(&self, question: &str, filters: &SearchFilters) -> Result<Retrieval> {
        let (dense, sparse) = tokio::join!(
            self.dense.search(question, self.config.dense_top_k, filters),
            async {
                self.lexical
                    .search_filtered(question, self.config.sparse_top_k, filters)
            }
        );
        let dense = dense?;

        debug!(
            "Dense search returned {} results, sparse search returned {} results",
            dense.len(),
            sparse.len()
        );

        let has_dense = !dense.is_empty();
        let has_sparse = !sparse.is_empty();

        if !has_dense && !has_sparse {
            return Ok(Retrieval {
                results: Vec::new(),
                chunks_retrieved: 0,
                fusion: FusionStats::default(),
                strategy: RetrievalStrategy {
                    dense: false,
                    sparse: false,
                    rerank: RerankStatus::Skipped,
                },
            });
        }

        let (fused, fusion) =
            reciprocal_rank_fusion(dense, sparse, self.config.rrf_k, self.config.fused_top_k);
        let chunks_retrieved = fused.len();

        let reranked = self
            .reranker
            .rerank(question, fused, self.config.rerank_top_n)
            .await;

        Ok(Retrieval {
            results: reranked.results,
            chunks_retrieved,
            fusion,
            strategy: RetrievalStrategy {
                dense: has_dense,
                sparse: has_sparse,
                rerank: reranked.status,
            },
        })
    }

    /// Answer `question` from the knowledge base.
    ///
    /// When retrieval finds nothing the fixed refusal is returned and the
    /// generator is never called.
    pub async fn query(&self, question: &str, filters: &SearchFilters) -> Result<QueryResponse> {
        let start = Instant::now();

        info!("Answering: {:?}", question);

        let retrieval = self.retrieve(question, filters).await?;

        let answer = if retrieval.results.is_empty() {
            info!("No context retrieved; returning refusal");
            AnswerResult {
                answer: NO_ANSWER.to_string(),
                confidence: 0.0,
                citations: Vec::new(),
                chunks_retrieved: retrieval.chunks_retrieved,
                chunks_after_rerank: 0,
            }
        } else {
            self.synthesizer
                .synthesize(question, &retrieval.results, retrieval.chunks_retrieved)
                .await?
        };

        let latency_ms = start.elapsed().as_millis() as u64;

        info!(
            "Query completed in {}ms, strategy={}, citations={}",
            latency_ms,
            retrieval.strategy,
            answer.citations.len()
        );

        Ok(QueryResponse {
            answer,
            retrieval_strategy: retrieval.strategy.to_string(),
            latency_ms,
        })
    }
}
