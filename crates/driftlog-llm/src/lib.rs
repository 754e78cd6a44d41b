//! driftlog-llm - Model provider clients
//!
//! This crate provides HTTP clients for the three model capabilities the
//! query pipeline consumes:
//!
//! - [`OpenAiEmbedder`]: text embeddings (OpenAI-compatible `/embeddings`)
//! - [`CohereReranker`]: relevance scoring (Cohere `/v2/rerank`)
//! - [`AnthropicGenerator`]: answer generation (Anthropic `/v1/messages`)
//!
//! Each client makes exactly one request per call and never retries.
//! [`MockEmbedder`] is a deterministic offline embedder for tests.

mod embed;
mod generate;
mod http;
mod rerank;

pub use embed::{MockEmbedder, OpenAiEmbedder};
pub use generate::AnthropicGenerator;
pub use rerank::CohereReranker;

// Re-export the capability traits for convenience
pub use driftlog_core::{Embedder, Generator, RelevanceScorer};
