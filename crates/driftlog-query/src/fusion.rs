//! Reciprocal Rank Fusion (RRF) for combining search results.

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use driftlog_core::RankedResult;

/// RRF constant (commonly 60).
/// Higher values flatten the difference between neighbouring ranks.
pub const DEFAULT_RRF_K: u32 = 60;

/// How the fused set splits across the two retrieval paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusionStats {
    pub dense_only: usize,
    pub sparse_only: usize,
    pub both: usize,
}

/// Fuse dense and sparse result lists using Reciprocal Rank Fusion.
///
/// RRF score = Σ 1 / (k + rank) over each list a chunk appears in, with
/// 1-based ranks taken from list position.
///
/// When a chunk appears in both lists, its payload comes from the list that
/// ranks it higher (dense on a tie). Output is sorted by fused score
/// descending and truncated to `top_k`; equal scores keep first-seen order,
/// dense list first.
pub fn reciprocal_rank_fusion(
    dense: Vec<RankedResult>,
    sparse: Vec<RankedResult>,
    k: u32,
    top_k: usize,
) -> (Vec<RankedResult>, FusionStats) {
    let k = k as f64;
    let mut fused: Vec<RankedResult> = Vec::with_capacity(dense.len() + sparse.len());
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for (i, mut result) in dense.into_iter().enumerate() {
        let rank = i + 1;
        if positions.contains_key(&result.chunk.id) {
            continue;
        }
        result.dense_rank = Some(rank);
        result.sparse_rank = None;
        result.rrf_score = Some(1.0 / (k + rank as f64));
        positions.insert(result.chunk.id, fused.len());
        fused.push(result);
    }

    for (i, mut result) in sparse.into_iter().enumerate() {
        let rank = i + 1;
        let contribution = 1.0 / (k + rank as f64);

        match positions.get(&result.chunk.id).copied() {
            Some(pos) => {
                let existing = &mut fused[pos];
                if existing.sparse_rank.is_some() {
                    continue;
                }
                let dense_rank = existing.dense_rank.unwrap_or(usize::MAX);
                if rank < dense_rank {
                    // Sparse ranks it higher: take its payload, keep dense provenance.
                    result.similarity_score = existing.similarity_score;
                    result.dense_rank = existing.dense_rank;
                    result.rrf_score = existing.rrf_score;
                    *existing = result;
                } else {
                    existing.score = result.score;
                }
                existing.sparse_rank = Some(rank);
                existing.rrf_score = Some(existing.rrf_score.unwrap_or(0.0) + contribution);
            }
            None => {
                result.dense_rank = None;
                result.sparse_rank = Some(rank);
                result.rrf_score = Some(contribution);
                positions.insert(result.chunk.id, fused.len());
                fused.push(result);
            }
        }
    }

    let stats = fusion_stats(&fused);
    info!(
        dense_only = stats.dense_only,
        sparse_only = stats.sparse_only,
        both = stats.both,
        "Fusion stats"
    );

    // Stable sort by score descending
    fused.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fused.truncate(top_k);

    (fused, stats)
}

fn fusion_stats(fused: &[RankedResult]) -> FusionStats {
    let mut stats = FusionStats::default();
    for result in fused {
        match (result.dense_rank.is_some(), result.sparse_rank.is_some()) {
            (true, true) => stats.both += 1,
            (true, false) => stats.dense_only += 1,
            (false, true) => stats.sparse_only += 1,
            (false, false) => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftlog_core::{Chunk, Document, DocumentInput, RetrievalSource};

    fn chunks(n: usize) -> Vec<Chunk> {
        let doc = Document::new(DocumentInput {
            content: "doc".to_string(),
            source: None,
            location: None,
            country: None,
            tags: None,
        });
        (0..n)
            .map(|i| Chunk::new(&doc, i as u32, &format!("chunk {}", i)))
            .collect()
    }

    fn dense_list(chunks: &[Chunk]) -> Vec<RankedResult> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, c)| RankedResult::dense(c.clone(), 0.9 - i as f64 * 0.1, i + 1))
            .collect()
    }

    fn sparse_list(chunks: &[Chunk]) -> Vec<RankedResult> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, c)| RankedResult::sparse(c.clone(), 10.0 - i as f64, i + 1))
            .collect()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
    }

    #[test]
    fn test_rrf_single_list() {
        let c = chunks(3);
        let (fused, stats) = reciprocal_rank_fusion(dense_list(&c), Vec::new(), 60, 10);

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].chunk.id, c[0].id);
        assert_close(fused[0].rrf_score.unwrap(), 1.0 / 61.0);
        assert_close(fused[2].rrf_score.unwrap(), 1.0 / 63.0);
        assert_eq!(
            stats,
            FusionStats {
                dense_only: 3,
                sparse_only: 0,
                both: 0
            }
        );
    }

    #[test]
    fn test_rrf_exact_scores() {
        let c = chunks(4);
        // dense: a b c   sparse: b a d
        let dense = dense_list(&[c[0].clone(), c[1].clone(), c[2].clone()]);
        let sparse = sparse_list(&[c[1].clone(), c[0].clone(), c[3].clone()]);

        let (fused, stats) = reciprocal_rank_fusion(dense, sparse, 60, 10);

        let score_of = |id: Uuid| {
            fused
                .iter()
                .find(|r| r.chunk.id == id)
                .and_then(|r| r.rrf_score)
                .unwrap()
        };
        assert_close(score_of(c[0].id), 1.0 / 61.0 + 1.0 / 62.0);
        assert_close(score_of(c[1].id), 1.0 / 62.0 + 1.0 / 61.0);
        assert_close(score_of(c[2].id), 1.0 / 63.0);
        assert_close(score_of(c[3].id), 1.0 / 63.0);

        assert_eq!(fused.len(), 4);
        assert_eq!(
            stats,
            FusionStats {
                dense_only: 1,
                sparse_only: 1,
                both: 2
            }
        );
        for pair in fused.windows(2) {
            assert!(pair[0].rrf_score >= pair[1].rrf_score);
        }
    }

    #[test]
    fn test_provenance_and_payload() {
        let c = chunks(2);
        let dense = dense_list(&[c[0].clone(), c[1].clone()]);
        let mut sparse = sparse_list(&[c[1].clone()]);
        sparse[0].chunk.content = "sparse payload".to_string();

        let (fused, _) = reciprocal_rank_fusion(dense, sparse, 60, 10);

        let b = fused.iter().find(|r| r.chunk.id == c[1].id).unwrap();
        // Sparse rank 1 beats dense rank 2.
        assert_eq!(b.chunk.content, "sparse payload");
        assert_eq!(b.dense_rank, Some(2));
        assert_eq!(b.sparse_rank, Some(1));
        assert_close(b.similarity_score.unwrap(), 0.8);
        assert_eq!(b.score, Some(10.0));
        assert_eq!(
            b.sources(),
            vec![RetrievalSource::Dense, RetrievalSource::Sparse]
        );
        assert_eq!(fused[0].chunk.id, c[1].id);
    }

    #[test]
    fn test_tie_prefers_dense_payload() {
        let c = chunks(1);
        let dense = dense_list(&c);
        let mut sparse = sparse_list(&c);
        sparse[0].chunk.content = "sparse payload".to_string();

        let (fused, _) = reciprocal_rank_fusion(dense, sparse, 60, 10);

        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].chunk.content, "chunk 0");
        assert_eq!(fused[0].score, Some(10.0));
        assert_close(fused[0].rrf_score.unwrap(), 2.0 / 61.0);
    }

    #[test]
    fn test_rrf_truncation() {
        let c = chunks(6);
        let dense = dense_list(&c[..4]);
        let sparse = sparse_list(&c[2..]);

        let (fused, _) = reciprocal_rank_fusion(dense, sparse, 60, 3);

        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_output_size_is_union_capped() {
        let c = chunks(5);
        let (fused, _) =
            reciprocal_rank_fusion(dense_list(&c[..3]), sparse_list(&c[1..5]), 60, 20);
        assert_eq!(fused.len(), 5);
    }

    #[test]
    fn test_deterministic() {
        let c = chunks(8);
        let dense = dense_list(&c[..5]);
        let sparse = sparse_list(&c[3..]);

        let (first, _) = reciprocal_rank_fusion(dense.clone(), sparse.clone(), 60, 20);
        let (second, _) = reciprocal_rank_fusion(dense, sparse, 60, 20);

        assert_eq!(first, second);
        // Equal-score singletons: dense entries precede sparse entries.
        let ids: Vec<Uuid> = first.iter().map(|r| r.chunk.id).collect();
        let c2 = ids.iter().position(|id| *id == c[2].id).unwrap();
        let c5 = ids.iter().position(|id| *id == c[5].id).unwrap();
        assert!(c2 < c5);
    }

    #[test]
    fn test_empty_inputs() {
        let (fused, stats) = reciprocal_rank_fusion(Vec::new(), Vec::new(), 60, 20);
        assert!(fused.is_empty());
        assert_eq!(stats, FusionStats::default());
    }
}
