//! driftlog-store - SQLite storage layer
//!
//! This crate provides persistent storage for documents, chunks, and their
//! embeddings, and answers the nearest-neighbour queries of the dense
//! retrieval path.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

// Re-export schema for testing/migrations
pub use schema::{SCHEMA, SCHEMA_VERSION};
