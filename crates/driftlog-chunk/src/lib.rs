//! driftlog-chunk - Chunking strategies
//!
//! This crate splits ingested documents into overlapping, size-bounded
//! pieces for embedding and lexical indexing.
//!
//! # Example
//!
//! ```rust
//! use driftlog_chunk::{ChunkConfig, Chunker, RecursiveChunker};
//!
//! let chunker = RecursiveChunker::new();
//! let chunks = chunker.chunk("Hello world", &ChunkConfig::default()).unwrap();
//! assert_eq!(chunks, vec!["Hello world".to_string()]);
//! ```

mod recursive;

pub use recursive::RecursiveChunker;

// Re-export types for convenience
pub use driftlog_core::{ChunkConfig, Chunker};
