//! In-memory BM25 index over chunk text.
//!
//! The index is built wholesale from a [`ChunkSource`] and published as an
//! immutable snapshot. Readers clone the current snapshot handle, so a
//! concurrent rebuild never exposes a half-built structure.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use regex::Regex;
use tracing::{debug, info, warn};

use driftlog_core::{Chunk, ChunkSource, RankedResult, Result, SearchFilters};

/// BM25 term-frequency saturation.
const K1: f64 = 1.5;
/// BM25 length normalization.
const B: f64 = 0.75;
/// Floor for negative IDF values, as a fraction of the average IDF.
const EPSILON: f64 = 0.25;

/// Lowercase `text` and extract maximal runs of word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    static WORD: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(word) = WORD.get_or_init(|| Regex::new(r"\w+").ok()) else {
        return Vec::new();
    };

    let lower = text.to_lowercase();
    word.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

/// A fully built BM25 structure. Never mutated after construction.
struct Snapshot {
    chunks: Vec<Chunk>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Snapshot {
    fn build(chunks: Vec<Chunk>) -> Self {
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lens = Vec::with_capacity(chunks.len());
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for chunk in &chunks {
            let tokens = tokenize(&chunk.content);
            doc_lens.push(tokens.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_default() += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_default() += 1;
            }
            term_freqs.push(freqs);
        }

        let corpus_size = chunks.len() as f64;
        let avgdl = if chunks.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f64 / corpus_size
        };

        // Okapi IDF; terms in more than half the corpus go negative and are
        // floored to a fraction of the mean.
        let mut idf = HashMap::with_capacity(doc_freqs.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, freq) in doc_freqs {
            let freq = freq as f64;
            let value = (corpus_size - freq + 0.5).ln() - (freq + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }
        if !idf.is_empty() {
            let floor = EPSILON * idf_sum / idf.len() as f64;
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            chunks,
            term_freqs,
            doc_lens,
            avgdl,
            idf,
        }
    }

    /// Score every chunk against the query, in corpus order.
    ///
    /// Chunks sharing no term with the query score 0.0 and are still
    /// returned.
    fn score(&self, query_tokens: &[String]) -> Vec<(usize, f64)> {
        if self.avgdl == 0.0 {
            return (0..self.chunks.len()).map(|i| (i, 0.0)).collect();
        }

        self.term_freqs
            .iter()
            .enumerate()
            .map(|(i, freqs)| {
                let norm = K1 * (1.0 - B + B * self.doc_lens[i] as f64 / self.avgdl);

                // Repeated query terms count once per occurrence.
                let score: f64 = query_tokens
                    .iter()
                    .filter_map(|term| {
                        let tf = *freqs.get(term)? as f64;
                        let idf = self.idf.get(term).copied().unwrap_or(0.0);
                        Some(idf * (tf * (K1 + 1.0)) / (tf + norm))
                    })
                    .sum();
                (i, score)
            })
            .collect()
    }
}

/// Shared, rebuildable lexical index.
///
/// Starts unbuilt. [`LexicalIndex::build`] replaces the whole structure in a
/// single swap.
#[derive(Default)]
pub struct LexicalIndex {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl LexicalIndex {
    /// Create an unbuilt index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a corpus, replacing any previous state.
    pub fn build(&self, chunks: Vec<Chunk>) {
        let count = chunks.len();
        let snapshot = Arc::new(Snapshot::build(chunks));

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(snapshot);

        info!("Lexical index built over {} chunks", count);
    }

    /// Reload the full corpus from `source` and rebuild.
    pub async fn rebuild_from<C>(&self, source: &C) -> Result<usize>
    where
        C: ChunkSource + ?Sized,
    {
        let chunks = source.load_chunks().await?;
        let count = chunks.len();
        self.build(chunks);
        Ok(count)
    }

    pub fn is_built(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Number of indexed chunks, zero when unbuilt.
    pub fn len(&self) -> usize {
        self.snapshot().map(|s| s.chunks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return up to `top_k` chunks by descending BM25 score.
    ///
    /// Every indexed chunk is a candidate, so the result holds
    /// `min(top_k, len)` entries unless the query has no word characters.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<RankedResult> {
        self.search_filtered(query, top_k, &SearchFilters::default())
    }

    /// Like [`LexicalIndex::search`], keeping only chunks whose metadata
    /// satisfies `filters`. Filtering happens before truncation.
    pub fn search_filtered(
        &self,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Vec<RankedResult> {
        let Some(snapshot) = self.snapshot() else {
            warn!("Lexical index not built; returning no sparse results");
            return Vec::new();
        };

        let tokens = tokenize(query);
        if tokens.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = snapshot
            .score(&tokens)
            .into_iter()
            .filter(|(i, _)| filters.matches(&snapshot.chunks[*i].metadata))
            .collect();

        // Stable: equal scores keep corpus order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        debug!("Sparse search returned {} chunks", scored.len());

        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (i, score))| {
                RankedResult::sparse(snapshot.chunks[i].clone(), score, rank + 1)
            })
            .collect()
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
