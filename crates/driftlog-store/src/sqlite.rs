//! SQLite-based storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};
use uuid::Uuid;

use driftlog_core::{
    Chunk, ChunkMetadata, ChunkSource, Document, DriftlogError, Result, SearchFilters, Stats,
    Store, VectorHit, VectorIndex,
};

use crate::schema::SCHEMA;

/// SQLite-based store implementation.
///
/// Embeddings live in a BLOB column next to each chunk and nearest-neighbour
/// queries are answered by an exact cosine scan over the rows that pass the
/// metadata filters.
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DriftlogError::database(format!("Failed to open database: {}", e)))?;

        Self::init(conn, path)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DriftlogError::database(format!("Failed to open in-memory database: {}", e))
        })?;

        Self::init(conn, Path::new(":memory:"))
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, path: &Path) -> Result<Self> {
        Self::configure_connection(&conn)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| DriftlogError::database(format!("Failed to initialize schema: {}", e)))?;

        info!("Database opened at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Configure SQLite connection for optimal performance.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA busy_timeout = 30000;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(|e| DriftlogError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Override the busy timeout set at open time.
    pub fn set_busy_timeout(&self, timeout_ms: u32) -> Result<()> {
        self.with_conn(|conn| {
            conn.busy_timeout(std::time::Duration::from_millis(timeout_ms as u64))
                .map_err(|e| DriftlogError::database(e.to_string()))
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DriftlogError::database(e.to_string()))?;
        f(&conn)
    }
}

#[async_trait]
impl VectorIndex for SqliteStore {
    async fn vector_search(
        &self,
        embedding: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<VectorHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r#"
            SELECT id, document_id, chunk_index, content, metadata, embedding
            FROM chunks
            WHERE embedding IS NOT NULL
            "#,
        );
        let mut args: Vec<String> = Vec::new();
        if let Some(location) = &filters.location {
            args.push(location.clone());
            sql.push_str(&format!(
                " AND json_extract(metadata, '$.location') = ?{}",
                args.len()
            ));
        }
        if let Some(country) = &filters.country {
            args.push(country.clone());
            sql.push_str(&format!(
                " AND json_extract(metadata, '$.country') = ?{}",
                args.len()
            ));
        }
        sql.push_str(" ORDER BY rowid");

        let rows = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| DriftlogError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params_from_iter(args.iter()), |row| {
                    let chunk = Self::row_to_chunk(row)?;
                    let bytes: Vec<u8> = row.get(5)?;
                    Ok((chunk, bytes))
                })
                .map_err(|e| DriftlogError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| DriftlogError::database(e.to_string()))?;

            Ok(rows)
        })?;

        let mut scored = Vec::with_capacity(rows.len());
        for (chunk, bytes) in rows {
            if !filters.matches(&chunk.metadata) {
                continue;
            }
            let stored = Self::bytes_to_vec(&bytes);
            let Some(distance) = cosine_distance(embedding, &stored) else {
                warn!(
                    "Skipping chunk {}: embedding has {} dimensions, query has {}",
                    chunk.id,
                    stored.len(),
                    embedding.len()
                );
                continue;
            };
            scored.push((chunk, distance));
        }

        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        debug!("Vector search matched {} chunks", scored.len());

        Ok(scored
            .into_iter()
            .map(|(chunk, distance)| VectorHit {
                chunk,
                similarity: 1.0 - distance,
            })
            .collect())
    }
}

#[async_trait]
impl ChunkSource for SqliteStore {
    async fn load_chunks(&self) -> Result<Vec<Chunk>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT c.id, c.document_id, c.chunk_index, c.content, c.metadata
                    FROM chunks c
                    JOIN documents d ON d.id = c.document_id
                    ORDER BY d.rowid, c.chunk_index
                    "#,
                )
                .map_err(|e| DriftlogError::database(e.to_string()))?;

            let chunks = stmt
                .query_map([], |row| Self::row_to_chunk(row))
                .map_err(|e| DriftlogError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| DriftlogError::database(e.to_string()))?;

            Ok(chunks)
        })
    }
}

#[async_trait]
impl Store for SqliteStore {
    // Document operations

    async fn insert_document(&self, doc: &Document) -> Result<()> {
        let tags = serde_json::to_string(&doc.metadata.tags)?;

        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO documents (id, content, source, location, country, tags,
                                       content_hash, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    doc.id.to_string(),
                    doc.content,
                    doc.metadata.source,
                    doc.metadata.location,
                    doc.metadata.country,
                    tags,
                    doc.content_hash,
                    doc.created_at as i64,
                ],
            )
            .map_err(|e| DriftlogError::database(format!("Failed to insert document: {}", e)))?;

            debug!("Inserted document: {}", doc.id);
            Ok(())
        })
    }

    async fn find_document_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        self.query_document_by_hash(content_hash)
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            // Chunks are deleted by CASCADE
            let deleted = conn
                .execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])
                .map_err(|e| DriftlogError::database(e.to_string()))?;

            if deleted == 0 {
                return Err(DriftlogError::DocumentNotFound { id: id.to_string() });
            }

            debug!("Deleted document: {}", id);
            Ok(())
        })
    }

    // Chunk operations

    async fn insert_chunks(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        // Missing or empty vectors are stored as NULL.
        let batch_dimension = embeddings.iter().map(Vec::len).find(|&len| len > 0);
        if let Some(expected) = batch_dimension {
            if let Some(bad) = embeddings.iter().find(|e| !e.is_empty() && e.len() != expected) {
                return Err(DriftlogError::invalid_argument(format!(
                    "Embedding dimension mismatch within batch: expected {}, got {}",
                    expected,
                    bad.len()
                )));
            }
        }

        let rows = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let metadata = serde_json::to_string(&chunk.metadata)?;
                let embedding = embeddings
                    .get(i)
                    .filter(|e| !e.is_empty())
                    .map(|e| Self::vec_to_bytes(e));
                Ok((chunk, metadata, embedding))
            })
            .collect::<Result<Vec<_>>>()?;
        let created_at = driftlog_core::now_millis() as i64;

        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| DriftlogError::database(e.to_string()))?;

            if let Some(expected) = batch_dimension {
                if let Some(stored) = Self::stored_dimension(&tx)? {
                    if stored != expected {
                        return Err(DriftlogError::invalid_argument(format!(
                            "Embedding dimension mismatch: store holds {}, batch has {}",
                            stored, expected
                        )));
                    }
                }
            }

            {
                let mut stmt = tx
                    .prepare(
                        r#"
                        INSERT INTO chunks (id, document_id, chunk_index, content, metadata,
                                            embedding, created_at)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                        "#,
                    )
                    .map_err(|e| DriftlogError::database(e.to_string()))?;

                for (chunk, metadata, embedding) in &rows {
                    stmt.execute(params![
                        chunk.id.to_string(),
                        chunk.document_id.to_string(),
                        chunk.chunk_index,
                        chunk.content,
                        metadata,
                        embedding,
                        created_at,
                    ])
                    .map_err(|e| {
                        DriftlogError::database(format!("Failed to insert chunk: {}", e))
                    })?;
                }
            }

            tx.commit()
                .map_err(|e| DriftlogError::database(e.to_string()))?;

            debug!("Inserted {} chunks", rows.len());
            Ok(())
        })
    }

    // Stats

    async fn get_stats(&self) -> Result<Stats> {
        self.with_conn(|conn| {
            let count = |sql: &str| -> Result<u64> {
                conn.query_row(sql, [], |row| row.get(0))
                    .map_err(|e| DriftlogError::database(e.to_string()))
            };

            let documents = count("SELECT COUNT(*) FROM documents")?;
            let chunks = count("SELECT COUNT(*) FROM chunks")?;
            let embeddings = count("SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL")?;

            // Get page count and page size to estimate storage
            let page_count: u64 = conn
                .query_row("PRAGMA page_count", [], |row| row.get(0))
                .unwrap_or(0);
            let page_size: u64 = conn
                .query_row("PRAGMA page_size", [], |row| row.get(0))
                .unwrap_or(4096);

            Ok(Stats {
                documents,
                chunks,
                embeddings,
                storage_bytes: page_count * page_size,
            })
        })
    }
}

// Helper methods
impl SqliteStore {
    /// Fetch the document stored under `content_hash`, if any.
    fn query_document_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, content, source, location, country, tags, content_hash, created_at
                    FROM documents WHERE content_hash = ?1
                    "#,
                )
                .map_err(|e| DriftlogError::database(e.to_string()))?;

            let result = stmt
                .query_row(params![content_hash], |row| Self::row_to_document(row))
                .optional()
                .map_err(|e| DriftlogError::database(e.to_string()))?;

            Ok(result)
        })
    }

    /// Convert a row to a Document.
    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
        let id_str: String = row.get(0)?;
        let tags_str: String = row.get(5)?;

        Ok(Document {
            id: parse_uuid(0, &id_str)?,
            content: row.get(1)?,
            metadata: ChunkMetadata {
                source: row.get(2)?,
                location: row.get(3)?,
                country: row.get(4)?,
                tags: parse_json(5, &tags_str)?,
            },
            content_hash: row.get(6)?,
            created_at: row.get::<_, i64>(7)? as u64,
        })
    }

    /// Convert a row to a Chunk.
    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chunk> {
        let id_str: String = row.get(0)?;
        let document_id_str: String = row.get(1)?;
        let metadata_str: String = row.get(4)?;

        Ok(Chunk {
            id: parse_uuid(0, &id_str)?,
            document_id: parse_uuid(1, &document_id_str)?,
            chunk_index: row.get(2)?,
            content: row.get(3)?,
            metadata: parse_json(4, &metadata_str)?,
        })
    }

    /// Dimension of the embeddings already stored, if there are any.
    fn stored_dimension(conn: &Connection) -> Result<Option<usize>> {
        let bytes: Option<i64> = conn
            .query_row(
                "SELECT length(embedding) FROM chunks WHERE embedding IS NOT NULL LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DriftlogError::database(e.to_string()))?;

        Ok(bytes.map(|b| b as usize / 4))
    }

    /// Convert f32 vector to bytes (little-endian).
    fn vec_to_bytes(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Convert little-endian bytes back to an f32 vector.
    fn bytes_to_vec(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }
}

fn parse_uuid(column: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(column: usize, value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Cosine distance in [0, 2]. `None` when the dimensions differ.
///
/// A zero vector has no direction; it is treated as orthogonal to everything.
fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(1.0);
    }

    Some(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftlog_core::DocumentInput;

    fn document(content: &str, location: &str, country: &str, tags: &[&str]) -> Document {
        Document::new(DocumentInput {
            content: content.to_string(),
            source: Some("guide".to_string()),
            location: Some(location.to_string()),
            country: Some(country.to_string()),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        })
    }

    async fn seed(store: &SqliteStore) -> (Document, Vec<Chunk>) {
        let doc = document("Kyoto temples and food", "Kyoto", "Japan", &["temples", "food"]);
        store.insert_document(&doc).await.unwrap();

        let chunks = vec![
            Chunk::new(&doc, 0, "Kinkaku-ji is a gold temple"),
            Chunk::new(&doc, 1, "Nishiki market has street food"),
            Chunk::new(&doc, 2, "No embedding for this one"),
        ];
        let embeddings = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        store.insert_chunks(&chunks, &embeddings).await.unwrap();

        (doc, chunks)
    }

    #[tokio::test]
    async fn test_open_memory() {
        let store = SqliteStore::open_memory().unwrap();
        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.documents, 0);
        assert_eq!(stats.chunks, 0);
    }

    #[tokio::test]
    async fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("driftlog.db");

        let store = SqliteStore::open(&path).unwrap();
        store.set_busy_timeout(1000).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_document_crud() {
        let store = SqliteStore::open_memory().unwrap();

        let doc = document("Lisbon trams", "Lisbon", "Portugal", &["transport"]);
        let doc_id = doc.id;
        store.insert_document(&doc).await.unwrap();

        let by_hash = store
            .find_document_by_hash(&doc.content_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_hash.id, doc_id);
        assert_eq!(by_hash.content, "Lisbon trams");
        assert_eq!(by_hash.metadata.tags, vec!["transport".to_string()]);

        store.delete_document(doc_id).await.unwrap();
        assert!(store
            .find_document_by_hash(&doc.content_hash)
            .await
            .unwrap()
            .is_none());

        let err = store.delete_document(doc_id).await.unwrap_err();
        assert_eq!(err.error_code(), "DOCUMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_duplicate_content_rejected() {
        let store = SqliteStore::open_memory().unwrap();

        store
            .insert_document(&document("same", "Rome", "Italy", &[]))
            .await
            .unwrap();
        let err = store
            .insert_document(&document("same", "Rome", "Italy", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }

    #[tokio::test]
    async fn test_chunks_and_cascade() {
        let store = SqliteStore::open_memory().unwrap();
        let (doc, chunks) = seed(&store).await;

        let retrieved = store.load_chunks().await.unwrap();
        assert_eq!(retrieved.len(), 3);
        assert_eq!(retrieved[0].id, chunks[0].id);
        assert_eq!(retrieved[1].metadata.location.as_deref(), Some("Kyoto"));

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.embeddings, 2);

        store.delete_document(doc.id).await.unwrap();
        assert!(store.load_chunks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_chunks_in_document_order() {
        let store = SqliteStore::open_memory().unwrap();
        let (_, chunks) = seed(&store).await;

        let loaded = store.load_chunks().await.unwrap();
        let ids: Vec<Uuid> = loaded.iter().map(|c| c.id).collect();
        let expected: Vec<Uuid> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_vector_search_orders_by_distance() {
        let store = SqliteStore::open_memory().unwrap();
        let (_, chunks) = seed(&store).await;

        let hits = store
            .vector_search(&[0.2, 1.0, 0.0], 10, &SearchFilters::default())
            .await
            .unwrap();

        // The chunk without an embedding is never returned.
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.id, chunks[1].id);
        assert_eq!(hits[1].chunk.id, chunks[0].id);
        assert!(hits[0].similarity > hits[1].similarity);
        assert!(hits[0].similarity <= 1.0);

        let exact = store
            .vector_search(&[1.0, 0.0, 0.0], 1, &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert!((exact[0].similarity - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_vector_search_filters() {
        let store = SqliteStore::open_memory().unwrap();
        seed(&store).await;

        let other = document("Paris cafes", "Paris", "France", &["food"]);
        store.insert_document(&other).await.unwrap();
        let paris = Chunk::new(&other, 0, "Cafe de Flore");
        store
            .insert_chunks(&[paris.clone()], &[vec![0.0, 1.0, 0.0]])
            .await
            .unwrap();

        let by_country = SearchFilters {
            country: Some("France".to_string()),
            ..Default::default()
        };
        let hits = store.vector_search(&[0.0, 1.0, 0.0], 10, &by_country).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, paris.id);

        let by_tag = SearchFilters {
            tags: Some(vec!["food".to_string()]),
            ..Default::default()
        };
        let hits = store.vector_search(&[0.0, 1.0, 0.0], 10, &by_tag).await.unwrap();
        assert_eq!(hits.len(), 3);

        let no_match = SearchFilters {
            location: Some("Kyoto".to_string()),
            tags: Some(vec!["nightlife".to_string()]),
            ..Default::default()
        };
        let hits = store.vector_search(&[0.0, 1.0, 0.0], 10, &no_match).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_empty_embedding_stored_as_null() {
        let store = SqliteStore::open_memory().unwrap();
        let doc = document("Kyoto at dawn", "Kyoto", "Japan", &[]);
        store.insert_document(&doc).await.unwrap();

        let chunks = vec![Chunk::new(&doc, 0, "Temples"), Chunk::new(&doc, 1, "Dawn")];
        store
            .insert_chunks(&chunks, &[vec![1.0, 0.0], Vec::new()])
            .await
            .unwrap();

        assert_eq!(store.get_stats().await.unwrap().embeddings, 1);

        let hits = store
            .vector_search(&[1.0, 0.0], 5, &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, chunks[0].id);
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected_on_insert() {
        let store = SqliteStore::open_memory().unwrap();
        let (doc, _) = seed(&store).await;

        let late = Chunk::new(&doc, 3, "Gion at night");
        let err = store
            .insert_chunks(&[late.clone()], &[vec![1.0, 0.0]])
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");

        let mixed = [Chunk::new(&doc, 4, "a"), Chunk::new(&doc, 5, "b")];
        let err = store
            .insert_chunks(&mixed, &[vec![1.0, 0.0, 0.0], vec![1.0]])
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");

        // Nothing from either rejected batch was written.
        assert_eq!(store.get_stats().await.unwrap().chunks, 3);
    }

    #[tokio::test]
    async fn test_vector_search_skips_mismatched_rows() {
        let store = SqliteStore::open_memory().unwrap();
        let (_, chunks) = seed(&store).await;

        // A row written before dimensions were checked.
        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE chunks SET embedding = ?1 WHERE id = ?2",
                    params![SqliteStore::vec_to_bytes(&[1.0]), chunks[1].id.to_string()],
                )
                .map_err(|e| DriftlogError::database(e.to_string()))
            })
            .unwrap();

        let hits = store
            .vector_search(&[1.0, 0.0, 0.0], 10, &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, chunks[0].id);

        let none = store
            .vector_search(&[1.0, 0.0], 10, &SearchFilters::default())
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_an_error() {
        let store = SqliteStore::open_memory().unwrap();
        let (doc, chunks) = seed(&store).await;

        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE chunks SET metadata = 'not json' WHERE id = ?1",
                    params![chunks[0].id.to_string()],
                )
                .map_err(|e| DriftlogError::database(e.to_string()))?;
                conn.execute(
                    "UPDATE documents SET tags = '{broken' WHERE id = ?1",
                    params![doc.id.to_string()],
                )
                .map_err(|e| DriftlogError::database(e.to_string()))
            })
            .unwrap();

        let err = store.load_chunks().await.unwrap_err();
        assert_eq!(err.error_code(), "DATABASE_ERROR");

        let err = store
            .find_document_by_hash(&doc.content_hash)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_cosine_distance() {
        assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]), Some(0.0));
        assert_eq!(cosine_distance(&[1.0, 0.0], &[0.0, 1.0]), Some(1.0));
        assert_eq!(cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]), Some(2.0));
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), Some(1.0));
        assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn test_vec_bytes_roundtrip() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(SqliteStore::bytes_to_vec(&SqliteStore::vec_to_bytes(&v)), v);
    }
}
