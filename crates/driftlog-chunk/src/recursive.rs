//! Recursive character chunker.
//!
//! Splits text by trying progressively smaller separators until every piece
//! fits within the configured size, then greedily merges neighbouring pieces
//! back together with a sliding overlap.

use std::collections::VecDeque;

use tracing::warn;

use driftlog_core::{ChunkConfig, Chunker, DriftlogError, Result};

/// Separators in the order they are tried. The empty separator splits into
/// single characters and always succeeds.
const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Recursive chunker that splits text by multiple separators.
///
/// Tries each separator in order until chunks are small enough:
/// 1. Double newline (paragraph breaks)
/// 2. Single newline
/// 3. Word boundaries (space)
/// 4. Character (last resort)
///
/// All lengths are measured in characters.
pub struct RecursiveChunker {
    separators: Vec<&'static str>,
}

impl RecursiveChunker {
    /// Create a new recursive chunker with the default separators.
    pub fn new() -> Self {
        Self {
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }

    /// Create a chunker with custom separators, tried in order.
    pub fn with_separators(separators: Vec<&'static str>) -> Self {
        Self { separators }
    }

    /// Recursively split `text`, starting from the first separator that
    /// occurs in it.
    fn split_text(&self, text: &str, separators: &[&str], config: &ChunkConfig) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces = split_by_separator(text, separator);

        let mut output = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < config.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                output.extend(merge_pieces(&small, separator, config));
                small.clear();
            }

            if remaining.is_empty() {
                output.push(piece.to_string());
            } else {
                output.extend(self.split_text(piece, remaining, config));
            }
        }

        if !small.is_empty() {
            output.extend(merge_pieces(&small, separator, config));
        }

        output
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, content: &str, config: &ChunkConfig) -> Result<Vec<String>> {
        if config.chunk_size == 0 {
            return Err(DriftlogError::chunking("chunk_size must be positive"));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(DriftlogError::chunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }

        Ok(self.split_text(content, &self.separators, config))
    }
}

/// Split text by a separator, dropping empty pieces.
fn split_by_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        // Character-level split as last resort
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    text.split(separator).filter(|s| !s.is_empty()).collect()
}

/// Greedily join pieces into chunks of at most `chunk_size` characters,
/// carrying up to `chunk_overlap` characters into the next chunk.
fn merge_pieces(pieces: &[&str], separator: &str, config: &ChunkConfig) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        let joiner = if window.is_empty() { 0 } else { sep_len };

        if total + len + joiner > config.chunk_size {
            if total > config.chunk_size {
                warn!(
                    "Created a chunk of size {}, which is longer than the specified {}",
                    total, config.chunk_size
                );
            }

            if !window.is_empty() {
                push_joined(&mut chunks, &window, separator);

                // Trim the front of the window down to the overlap budget.
                while total > config.chunk_overlap
                    || (total > 0
                        && total + len + if window.is_empty() { 0 } else { sep_len }
                            > config.chunk_size)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
                }
            }
        }

        let joiner = if window.is_empty() { 0 } else { sep_len };
        window.push_back(piece);
        total += len + joiner;
    }

    push_joined(&mut chunks, &window, separator);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
