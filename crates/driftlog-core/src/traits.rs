//! Core traits defining the interfaces between components.
//!
//! The query pipeline only ever talks to storage and to the model
//! providers through these traits.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Chunk, Document, SearchFilters, Stats};

/// A chunk returned by a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub chunk: Chunk,

    /// `1 - cosine distance`.
    pub similarity: f64,
}

/// Nearest-neighbour query over chunk embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `limit` chunks with a non-null embedding that satisfy
    /// `filters`, ordered by ascending cosine distance to `embedding`.
    async fn vector_search(
        &self,
        embedding: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<VectorHit>>;
}

/// Full read of the chunk corpus, used to (re)build the lexical index.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    async fn load_chunks(&self) -> Result<Vec<Chunk>>;
}

/// Storage layer trait.
#[async_trait]
pub trait Store: VectorIndex + ChunkSource {
    // Document operations
    async fn insert_document(&self, doc: &Document) -> Result<()>;
    async fn find_document_by_hash(&self, content_hash: &str) -> Result<Option<Document>>;
    async fn delete_document(&self, id: Uuid) -> Result<()>;

    // Chunk operations

    /// Persist chunks. `embeddings[i]` belongs to `chunks[i]`; chunks past
    /// the end of `embeddings`, or with an empty vector, are stored without
    /// one. Vectors whose dimension differs from the rest of the batch or
    /// from those already stored are rejected.
    async fn insert_chunks(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()>;

    // Stats
    async fn get_stats(&self) -> Result<Stats>;
}

/// Embedding model trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts, same length and order as the input.
    ///
    /// An empty input returns an empty output.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;
}

/// One entry of a relevance model's ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceScore {
    /// Position of the document in the request.
    pub index: usize,
    pub relevance_score: f64,
}

/// Relevance model used for reranking.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score `documents` against `query`, returning at most `top_n`
    /// entries ordered by descending relevance.
    async fn score(&self, query: &str, documents: &[&str], top_n: usize)
        -> Result<Vec<RelevanceScore>>;
}

/// A single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System instruction.
    pub system: String,

    /// User message: numbered context followed by the question.
    pub user: String,

    pub temperature: f32,

    /// Output budget in tokens.
    pub max_tokens: u32,
}

/// Text generation model.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Chunking configuration.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,

    /// Characters carried over between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
        }
    }
}

/// Chunking strategy trait.
pub trait Chunker: Send + Sync {
    /// Split text content into chunk texts, in document order.
    fn chunk(&self, content: &str, config: &ChunkConfig) -> Result<Vec<String>>;
}
