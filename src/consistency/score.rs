use serde::Serialize;

use super::matcher::similarity_ratio;
use super::normalize::NormalizedSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairScore {
    pub left: usize,
    pub right: usize,
    pub ratio: f64,
}

/// Ratio for every unordered pair `(i, j)`, `i < j`, in input order.
pub fn pair_scores(sets: &[NormalizedSet]) -> Vec<PairScore> {
    if sets.len() < 2 {
        return Vec::new();
    }

    let joined = sets.iter().map(NormalizedSet::joined).collect::<Vec<_>>();
    let mut pairs = Vec::with_capacity(sets.len() * (sets.len() - 1) / 2);
    for left in 0..joined.len() {
        for right in (left + 1)..joined.len() {
            pairs.push(PairScore {
                left,
                right,
                ratio: similarity_ratio(&joined[left], &joined[right]),
            });
        }
    }
    pairs
}

pub fn mean_ratio(pairs: &[PairScore]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    pairs.iter().map(|pair| pair.ratio).sum::<f64>() / pairs.len() as f64
}

/// Batch consistency: mean pairwise ratio, `0.0` for fewer than two sets.
/// Empty sets take part like any other set.
pub fn score(sets: &[NormalizedSet]) -> f64 {
    mean_ratio(&pair_scores(sets))
}
