//! driftlog-query - Hybrid retrieval and grounded answers
//!
//! This crate is the query side of driftlog. It combines dense (embedding)
//! and sparse (BM25) retrieval with Reciprocal Rank Fusion, reranks the
//! fused candidates, and synthesizes an answer whose claims cite numbered
//! context passages.
//!
//! # Pipeline
//!
//! - [`DenseRetriever`] and [`LexicalIndex`] search independently
//! - [`reciprocal_rank_fusion`] merges the two rankings
//! - [`Reranker`] reorders the fused list, falling back to fused order
//! - [`AnswerSynthesizer`] prompts the generator and validates citations
//!
//! [`IngestPipeline`] handles the write side: chunk, embed, persist.
//!
//! # Example
//!
//! ```rust,ignore
//! use driftlog_query::{QueryConfig, QueryEngine};
//! use std::sync::Arc;
//!
//! let engine = QueryEngine::new(store, embedder, reranker, generator, QueryConfig::default());
//! engine.rebuild_lexical_index().await?;
//! let response = engine.query("Best time to visit Kyoto temples?", &filters).await?;
//! ```

mod dense;
mod engine;
mod fusion;
mod ingest;
mod lexical;
mod prompts;
mod rerank;
mod synthesis;

pub use dense::DenseRetriever;
pub use engine::{QueryConfig, QueryEngine, QueryResponse, Retrieval, RetrievalStrategy};
pub use fusion::{reciprocal_rank_fusion, FusionStats, DEFAULT_RRF_K};
pub use ingest::{IngestOutcome, IngestPipeline};
pub use lexical::{tokenize, LexicalIndex};
pub use prompts::{build_user_prompt, NO_ANSWER, SYSTEM_PROMPT};
pub use rerank::{RerankStatus, Reranked, Reranker};
pub use synthesis::{confidence, excerpt, parse_citations, AnswerSynthesizer, DEFAULT_EXCERPT_CHARS};

// Re-export for convenience
pub use driftlog_core::{AnswerResult, Citation, RankedResult, SearchFilters};
