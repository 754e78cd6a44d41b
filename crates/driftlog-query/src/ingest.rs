//! Document ingestion: dedupe, chunk, embed, persist.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use driftlog_core::{
    Chunk, ChunkConfig, Chunker, Document, DocumentInput, DriftlogError, Embedder, Result, Store,
};

/// Result of ingesting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    /// The new document, or the existing one with identical content.
    pub document_id: Uuid,

    /// Chunks written; zero when skipped.
    pub chunks: usize,

    /// True when identical content was already stored.
    pub duplicate: bool,
}

/// Turns raw documents into embedded, persisted chunks.
///
/// The lexical index is not touched here; rebuild it once a batch is done.
pub struct IngestPipeline<S: ?Sized, E: ?Sized> {
    store: Arc<S>,
    embedder: Arc<E>,
    chunker: Arc<dyn Chunker>,
    chunk_config: ChunkConfig,
}

impl<S, E> IngestPipeline<S, E>
where
    S: Store + ?Sized,
    E: Embedder + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        embedder: Arc<E>,
        chunker: Arc<dyn Chunker>,
        chunk_config: ChunkConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            chunker,
            chunk_config,
        }
    }

    /// Ingest one document.
    pub async fn ingest(&self, input: DocumentInput) -> Result<IngestOutcome> {
        if input.content.trim().is_empty() {
            return Err(DriftlogError::invalid_argument("Document content is empty"));
        }

        let hash = Document::hash_content(&input.content);
        if let Some(existing) = self.store.find_document_by_hash(&hash).await? {
            info!("Skipping duplicate document {}", existing.id);
            return Ok(IngestOutcome {
                document_id: existing.id,
                chunks: 0,
                duplicate: true,
            });
        }

        let doc = Document::new(input);
        let texts = self.chunker.chunk(&doc.content, &self.chunk_config)?;
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(&doc, i as u32, text))
            .collect();

        // Embed before writing anything so a provider failure leaves no trace.
        let refs: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_documents(&refs).await?;
        if embeddings.len() != chunks.len() {
            warn!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            );
        }

        self.store.insert_document(&doc).await?;
        if let Err(e) = self.store.insert_chunks(&chunks, &embeddings).await {
            // Don't leave a chunkless document behind to block a retry via dedupe.
            if let Err(cleanup) = self.store.delete_document(doc.id).await {
                warn!("Failed to remove document {} after error: {}", doc.id, cleanup);
            }
            return Err(e);
        }

        info!("Ingested document {} as {} chunks", doc.id, chunks.len());

        Ok(IngestOutcome {
            document_id: doc.id,
            chunks: chunks.len(),
            duplicate: false,
        })
    }

    /// Ingest documents in order, stopping at the first error.
    pub async fn ingest_all(&self, inputs: Vec<DocumentInput>) -> Result<Vec<IngestOutcome>> {
        let mut outcomes = Vec::with_capacity(inputs.len());
        for input in inputs {
            outcomes.push(self.ingest(input).await?);
        }
        Ok(outcomes)
    }
}
