//! Weighted score fusion.
//!
//! BM25 and cosine scores are min-max normalized over the candidate set,
//! then combined as `w_bm25 · bm25_norm + w_sem · semantic_norm`. Per-method
//! ranks are computed over the full candidate set before any truncation so
//! explanations can report true positions.

use serde::{Deserialize, Serialize};

/// Fusion weights. Product defaults are 0.3 lexical / 0.7 semantic; kept
/// configurable since the split is a stated goal, not a derived constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub bm25: f64,
    pub semantic: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            bm25: 0.3,
            semantic: 0.7,
        }
    }
}

impl FusionWeights {
    /// Degraded mode when the vector index is unreachable.
    pub fn bm25_only() -> Self {
        Self {
            bm25: 1.0,
            semantic: 0.0,
        }
    }
}

/// Raw per-method scores for one candidate pattern.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub pattern_id: String,
    pub bm25_raw: f64,
    pub semantic_raw: f64,
}

/// Fused score with normalized components and pre-truncation ranks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedScore {
    pub pattern_id: String,
    pub bm25: f64,
    pub semantic: f64,
    pub weighted: f64,
    /// 1-based rank among all candidates by BM25 score.
    pub bm25_rank: usize,
    /// 1-based rank among all candidates by semantic score.
    pub semantic_rank: usize,
}

/// Min-max normalize in place. A degenerate spread (all values equal) maps
/// to 1.0 when the shared value is positive and 0.0 otherwise, so an
/// all-tied method neither boosts nor penalizes relative order.
fn min_max_normalize(values: &mut [f64]) {
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.iter() {
        min = min.min(*v);
        max = max.max(*v);
    }
    let spread = max - min;
    for v in values.iter_mut() {
        *v = if spread > f64::EPSILON {
            (*v - min) / spread
        } else if max > 0.0 {
            1.0
        } else {
            0.0
        };
    }
}

/// 1-based ranks for `values` sorted descending; ties resolve by pattern id
/// so ranks are deterministic.
fn ranks_desc(ids: &[&str], values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ids[a].cmp(ids[b]))
    });
    let mut ranks = vec![0usize; values.len()];
    for (position, idx) in order.into_iter().enumerate() {
        ranks[idx] = position + 1;
    }
    ranks
}

/// Fuse the full candidate set. The result is sorted by weighted score
/// descending, ties broken by lower BM25 rank then alphabetical pattern id.
/// Truncation to top-k happens at the caller, after ranks are fixed.
pub fn fuse(candidates: &[Candidate], weights: &FusionWeights) -> Vec<FusedScore> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let ids: Vec<&str> = candidates.iter().map(|c| c.pattern_id.as_str()).collect();
    let mut bm25: Vec<f64> = candidates.iter().map(|c| c.bm25_raw).collect();
    let mut semantic: Vec<f64> = candidates.iter().map(|c| c.semantic_raw).collect();

    let bm25_ranks = ranks_desc(&ids, &bm25);
    let semantic_ranks = ranks_desc(&ids, &semantic);

    min_max_normalize(&mut bm25);
    min_max_normalize(&mut semantic);

    let mut fused: Vec<FusedScore> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| FusedScore {
            pattern_id: c.pattern_id.clone(),
            bm25: bm25[i],
            semantic: semantic[i],
            weighted: weights.bm25 * bm25[i] + weights.semantic * semantic[i],
            bm25_rank: bm25_ranks[i],
            semantic_rank: semantic_ranks[i],
        })
        .collect();

    fused.sort_by(|a, b| {
        b.weighted
            .partial_cmp(&a.weighted)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.bm25_rank.cmp(&b.bm25_rank))
            .then_with(|| a.pattern_id.cmp(&b.pattern_id))
    });
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, bm25: f64, semantic: f64) -> Candidate {
        Candidate {
            pattern_id: id.into(),
            bm25_raw: bm25,
            semantic_raw: semantic,
        }
    }

    #[test]
    fn test_weighted_combination_with_defaults() {
        let fused = fuse(
            &[
                candidate("a", 1.0, 1.0),
                candidate("b", 0.0, 0.5),
                candidate("c", 0.5, 0.0),
            ],
            &FusionWeights::default(),
        );
        assert_eq!(fused[0].pattern_id, "a");
        assert!((fused[0].weighted - 1.0).abs() < 1e-9);
        // b: 0.3*0 + 0.7*0.5 = 0.35 beats c: 0.3*0.5 + 0.7*0 = 0.15
        assert_eq!(fused[1].pattern_id, "b");
        assert_eq!(fused[2].pattern_id, "c");
    }

    #[test]
    fn test_sorted_descending_by_weighted() {
        let fused = fuse(
            &[
                candidate("x", 0.1, 0.2),
                candidate("y", 0.9, 0.8),
                candidate("z", 0.5, 0.5),
            ],
            &FusionWeights::default(),
        );
        for pair in fused.windows(2) {
            assert!(pair[0].weighted >= pair[1].weighted);
        }
    }

    #[test]
    fn test_ranks_are_pre_truncation() {
        let fused = fuse(
            &[
                candidate("a", 0.9, 0.1),
                candidate("b", 0.5, 0.9),
                candidate("c", 0.1, 0.5),
            ],
            &FusionWeights::default(),
        );
        let by_id = |id: &str| fused.iter().find(|f| f.pattern_id == id).unwrap();
        assert_eq!(by_id("a").bm25_rank, 1);
        assert_eq!(by_id("b").bm25_rank, 2);
        assert_eq!(by_id("c").bm25_rank, 3);
        assert_eq!(by_id("b").semantic_rank, 1);
        assert_eq!(by_id("c").semantic_rank, 2);
        assert_eq!(by_id("a").semantic_rank, 3);
    }

    #[test]
    fn test_tie_breaks_on_bm25_rank_then_id() {
        // b and a tie on weighted; a has the better bm25 rank.
        let fused = fuse(
            &[candidate("b", 0.0, 1.0), candidate("a", 1.0, 0.0)],
            &FusionWeights {
                bm25: 0.5,
                semantic: 0.5,
            },
        );
        assert_eq!(fused[0].pattern_id, "a");
        assert_eq!(fused[1].pattern_id, "b");
    }

    #[test]
    fn test_alphabetical_tie_break() {
        let fused = fuse(
            &[candidate("beta", 1.0, 1.0), candidate("alpha", 1.0, 1.0)],
            &FusionWeights::default(),
        );
        assert_eq!(fused[0].pattern_id, "alpha");
    }

    #[test]
    fn test_bm25_only_weights_ignore_semantic() {
        let fused = fuse(
            &[candidate("a", 0.2, 0.99), candidate("b", 0.8, 0.01)],
            &FusionWeights::bm25_only(),
        );
        assert_eq!(fused[0].pattern_id, "b");
        assert_eq!(fused[0].weighted, 1.0);
    }

    #[test]
    fn test_degenerate_spread_maps_to_unit() {
        let fused = fuse(
            &[candidate("a", 0.5, 0.0), candidate("b", 0.5, 0.0)],
            &FusionWeights::default(),
        );
        // All-equal positive bm25 → 1.0; all-zero semantic → 0.0
        assert!((fused[0].bm25 - 1.0).abs() < 1e-9);
        assert_eq!(fused[0].semantic, 0.0);
    }

    #[test]
    fn test_empty_candidates() {
        assert!(fuse(&[], &FusionWeights::default()).is_empty());
    }
}
