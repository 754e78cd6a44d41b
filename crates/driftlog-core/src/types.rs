//! Core domain types for driftlog.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Semantic tags attached to every chunk of a document at ingestion time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Where the text came from (guide name, blog, URL).
    #[serde(default)]
    pub source: Option<String>,

    /// City or region the text is about.
    #[serde(default)]
    pub location: Option<String>,

    /// Country the text is about.
    #[serde(default)]
    pub country: Option<String>,

    /// Free-form tags ("food", "budget", ...).
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ChunkMetadata {
    /// Source label as shown to the generator and in citations.
    pub fn source_label(&self) -> &str {
        non_empty(self.source.as_deref()).unwrap_or("Unknown")
    }

    /// Location label as shown to the generator and in citations.
    pub fn location_label(&self) -> &str {
        non_empty(self.location.as_deref()).unwrap_or("N/A")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A document as submitted for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub content: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A persisted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: Uuid,

    /// Full raw text.
    pub content: String,

    /// Metadata copied onto every chunk of this document.
    pub metadata: ChunkMetadata,

    /// Blake3 hash of the content, hex encoded, for deduplication.
    pub content_hash: String,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,
}

impl Document {
    /// Create a new document from an ingestion request.
    pub fn new(input: DocumentInput) -> Self {
        let content_hash = Self::hash_content(&input.content);

        Self {
            id: Uuid::new_v4(),
            metadata: ChunkMetadata {
                source: input.source,
                location: input.location,
                country: input.country,
                tags: input.tags.unwrap_or_default(),
            },
            content: input.content,
            content_hash,
            created_at: now_millis(),
        }
    }

    /// Hex-encoded blake3 hash of some content.
    pub fn hash_content(content: &str) -> String {
        hex::encode(blake3::hash(content.as_bytes()).as_bytes())
    }
}

/// A retrievable unit of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier, stable across every pipeline stage.
    pub id: Uuid,

    /// Owning document.
    pub document_id: Uuid,

    /// Position within the document (0-based).
    pub chunk_index: u32,

    /// Chunk text.
    pub content: String,

    /// Semantic tags, read-only at query time.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk belonging to `document`.
    pub fn new(document: &Document, chunk_index: u32, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document.id,
            chunk_index,
            content: content.to_string(),
            metadata: document.metadata.clone(),
        }
    }
}

/// Optional metadata restrictions on a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Matches when the chunk carries at least one of these tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl SearchFilters {
    /// Tags to intersect with, if any. An empty list is no restriction.
    pub fn tag_filter(&self) -> Option<&[String]> {
        self.tags.as_deref().filter(|t| !t.is_empty())
    }

    /// True when no field restricts the result set.
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.country.is_none() && self.tag_filter().is_none()
    }

    /// Check whether chunk metadata satisfies every present filter.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if let Some(location) = &self.location {
            if metadata.location.as_ref() != Some(location) {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if metadata.country.as_ref() != Some(country) {
                return false;
            }
        }
        if let Some(tags) = self.tag_filter() {
            if !metadata.tags.iter().any(|t| tags.contains(t)) {
                return false;
            }
        }
        true
    }
}

/// Retrieval path that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalSource {
    Dense,
    Sparse,
}

impl std::fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dense => write!(f, "dense"),
            Self::Sparse => write!(f, "sparse"),
        }
    }
}

/// A chunk plus the scores and provenance accumulated through the pipeline.
///
/// Each stage fills in its own score field; earlier fields are carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub chunk: Chunk,

    /// Cosine similarity from the dense path, in (-1, 1].
    pub similarity_score: Option<f64>,

    /// BM25 score from the sparse path.
    pub score: Option<f64>,

    /// Reciprocal rank fusion score. Ordering key only.
    pub rrf_score: Option<f64>,

    /// Relevance model score, typically in [0, 1].
    pub rerank_score: Option<f64>,

    /// 1-based position in the dense list, if present there.
    pub dense_rank: Option<usize>,

    /// 1-based position in the sparse list, if present there.
    pub sparse_rank: Option<usize>,
}

impl RankedResult {
    /// Wrap a chunk with no scores yet.
    pub fn new(chunk: Chunk) -> Self {
        Self {
            chunk,
            similarity_score: None,
            score: None,
            rrf_score: None,
            rerank_score: None,
            dense_rank: None,
            sparse_rank: None,
        }
    }

    /// A dense hit at the given 1-based rank.
    pub fn dense(chunk: Chunk, similarity: f64, rank: usize) -> Self {
        Self {
            similarity_score: Some(similarity),
            dense_rank: Some(rank),
            ..Self::new(chunk)
        }
    }

    /// A sparse hit at the given 1-based rank.
    pub fn sparse(chunk: Chunk, score: f64, rank: usize) -> Self {
        Self {
            score: Some(score),
            sparse_rank: Some(rank),
            ..Self::new(chunk)
        }
    }

    /// Retrieval paths that produced this result, dense first.
    pub fn sources(&self) -> Vec<RetrievalSource> {
        let mut sources = Vec::with_capacity(2);
        if self.dense_rank.is_some() {
            sources.push(RetrievalSource::Dense);
        }
        if self.sparse_rank.is_some() {
            sources.push(RetrievalSource::Sparse);
        }
        sources
    }
}

/// A reference from the answer text to a context block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based position of the block in the generator's context.
    pub index: usize,
    pub chunk_id: Uuid,
    pub source: String,
    pub location: String,
    pub excerpt: String,
}

/// A grounded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,

    /// Mean rerank score of the cited chunks, rounded to 4 places.
    pub confidence: f64,

    /// Citations in ascending index order.
    pub citations: Vec<Citation>,

    /// Candidates that came out of fusion.
    pub chunks_retrieved: usize,

    /// Chunks shown to the generator.
    pub chunks_after_rerank: usize,
}

/// Statistics about the knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Number of documents.
    pub documents: u64,

    /// Number of chunks.
    pub chunks: u64,

    /// Number of chunks carrying an embedding.
    pub embeddings: u64,

    /// Database size in bytes.
    pub storage_bytes: u64,
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(location: &str, country: &str, tags: &[&str]) -> ChunkMetadata {
        ChunkMetadata {
            source: Some("guide".to_string()),
            location: Some(location.to_string()),
            country: Some(country.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_metadata_labels_default() {
        let meta = ChunkMetadata::default();
        assert_eq!(meta.source_label(), "Unknown");
        assert_eq!(meta.location_label(), "N/A");

        let meta = ChunkMetadata {
            source: Some(String::new()),
            location: Some("Lisbon".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.source_label(), "Unknown");
        assert_eq!(meta.location_label(), "Lisbon");
    }

    #[test]
    fn test_filters_match_exact_fields() {
        let meta = metadata("Kyoto", "Japan", &["temples"]);

        assert!(SearchFilters::default().matches(&meta));
        assert!(SearchFilters {
            location: Some("Kyoto".to_string()),
            country: Some("Japan".to_string()),
            tags: None,
        }
        .matches(&meta));
        assert!(!SearchFilters {
            location: Some("kyoto".to_string()),
            ..Default::default()
        }
        .matches(&meta));
        assert!(!SearchFilters {
            country: Some("China".to_string()),
            ..Default::default()
        }
        .matches(&meta));
    }

    #[test]
    fn test_filters_tags_intersect() {
        let meta = metadata("Kyoto", "Japan", &["temples", "food"]);

        let hit = SearchFilters {
            tags: Some(vec!["nightlife".to_string(), "food".to_string()]),
            ..Default::default()
        };
        assert!(hit.matches(&meta));

        let miss = SearchFilters {
            tags: Some(vec!["nightlife".to_string()]),
            ..Default::default()
        };
        assert!(!miss.matches(&meta));

        // An empty tag list restricts nothing.
        let empty = SearchFilters {
            tags: Some(Vec::new()),
            ..Default::default()
        };
        assert!(empty.is_empty());
        assert!(empty.matches(&meta));
    }

    #[test]
    fn test_document_hash_and_chunk_metadata() {
        let doc = Document::new(DocumentInput {
            content: "Street food in Bangkok".to_string(),
            source: Some("blog".to_string()),
            location: Some("Bangkok".to_string()),
            country: Some("Thailand".to_string()),
            tags: None,
        });
        assert_eq!(doc.content_hash, Document::hash_content("Street food in Bangkok"));
        assert_ne!(doc.content_hash, Document::hash_content("Street food in Hanoi"));
        assert_eq!(doc.content_hash.len(), 64);

        let chunk = Chunk::new(&doc, 0, "Street food");
        assert_eq!(chunk.document_id, doc.id);
        assert_eq!(chunk.metadata.location.as_deref(), Some("Bangkok"));
        assert!(chunk.metadata.tags.is_empty());
    }

    #[test]
    fn test_ranked_result_sources() {
        let doc = Document::new(DocumentInput {
            content: "x".to_string(),
            source: None,
            location: None,
            country: None,
            tags: None,
        });
        let chunk = Chunk::new(&doc, 0, "x");

        let mut result = RankedResult::dense(chunk.clone(), 0.9, 1);
        assert_eq!(result.sources(), vec![RetrievalSource::Dense]);

        result.sparse_rank = Some(3);
        assert_eq!(
            result.sources(),
            vec![RetrievalSource::Dense, RetrievalSource::Sparse]
        );

        let sparse = RankedResult::sparse(chunk, 2.5, 1);
        assert_eq!(sparse.sources(), vec![RetrievalSource::Sparse]);
        assert_eq!(sparse.score, Some(2.5));
    }
}
