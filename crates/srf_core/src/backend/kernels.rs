//! Elementary DP transitions.
//!
//! Pure functions of their arguments, shared by every backend and by the
//! full-table baselines so that all of them perform the arithmetic in the
//! same order and produce bit-identical results.

use num_traits::Float;
use serde::Serialize;

/// Distance sentinel for nodes not yet reached.
pub const UNREACHABLE: i64 = i64::MAX;

/// Reduction used by the sequential step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Semiring {
    /// Sum of products (HMM forward pass).
    #[default]
    SumProduct,
    /// Maximum of products (Viterbi decoding).
    MaxProduct,
}

impl Semiring {
    /// Reduces a final state vector to the run's scalar result.
    pub fn reduce<T: Float>(&self, lanes: &[T]) -> T {
        match self {
            Semiring::SumProduct => lanes.iter().fold(T::zero(), |acc, &v| acc + v),
            Semiring::MaxProduct => lanes.iter().fold(T::neg_infinity(), |acc, &v| acc.max(v)),
        }
    }

    /// Algorithm name used in reports.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Semiring::SumProduct => "forward",
            Semiring::MaxProduct => "viterbi",
        }
    }
}

/// One lane of a sequential step.
///
/// Combines `prev[i] * trans_col[i] * emission` over all previous lanes
/// `i`, by sum or by max.
#[inline]
pub fn sequential_step<T: Float>(semiring: Semiring, prev: &[T], trans_col: &[T], emission: T) -> T {
    let terms = prev.iter().zip(trans_col).map(|(&p, &a)| p * a * emission);
    match semiring {
        Semiring::SumProduct => terms.fold(T::zero(), |acc, v| acc + v),
        Semiring::MaxProduct => terms.fold(T::neg_infinity(), |acc, v| acc.max(v)),
    }
}

/// One Needleman-Wunsch cell: `max(diag + match, above + gap, left + gap)`.
///
/// Sums saturate at the `i64` bounds.
#[inline]
pub fn grid_cell(diag: i64, above: i64, left: i64, match_score: i64, gap: i64) -> i64 {
    diag.saturating_add(match_score)
        .max(above.saturating_add(gap))
        .max(left.saturating_add(gap))
}

/// Graph relaxation: `min_i(pred[i] + weight[i])`.
///
/// Unreached predecessors ([`UNREACHABLE`]) stay unreachable. Returns
/// [`UNREACHABLE`] for an empty predecessor list.
#[inline]
pub fn graph_relax(pred_dists: &[i64], weights: &[i64]) -> i64 {
    debug_assert_eq!(pred_dists.len(), weights.len());
    pred_dists
        .iter()
        .zip(weights)
        .map(|(&d, &w)| if d == UNREACHABLE { UNREACHABLE } else { d.saturating_add(w) })
        .fold(UNREACHABLE, i64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sequential_sum_product() {
        let prev = [0.06, 0.24];
        let trans_col = [0.7, 0.4];
        let v = sequential_step(Semiring::SumProduct, &prev, &trans_col, 0.4);
        assert_relative_eq!(v, 0.0552, epsilon = 1e-12);
    }

    #[test]
    fn test_sequential_max_product() {
        let prev = [0.06, 0.24];
        let trans_col = [0.7, 0.4];
        let v = sequential_step(Semiring::MaxProduct, &prev, &trans_col, 0.4);
        assert_relative_eq!(v, 0.0384, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_cell() {
        assert_eq!(grid_cell(0, 0, 0, 1, -1), 1);
        assert_eq!(grid_cell(0, 3, 0, -1, -1), 2);
        assert_eq!(grid_cell(-5, 0, 4, -1, -2), 2);
        assert_eq!(grid_cell(i64::MAX, 0, 0, 5, -1), i64::MAX);
        assert_eq!(grid_cell(i64::MIN, i64::MIN, i64::MIN, -1, -1), i64::MIN);
    }

    #[test]
    fn test_graph_relax() {
        assert_eq!(graph_relax(&[0, 5], &[3, 0]), 3);
        assert_eq!(graph_relax(&[UNREACHABLE, 4], &[1, 0]), 4);
        assert_eq!(graph_relax(&[UNREACHABLE, UNREACHABLE], &[1, 0]), UNREACHABLE);
        assert_eq!(graph_relax(&[], &[]), UNREACHABLE);
    }

    #[test]
    fn test_reduce() {
        assert_relative_eq!(Semiring::SumProduct.reduce(&[0.25, 0.5]), 0.75);
        assert_relative_eq!(Semiring::MaxProduct.reduce(&[0.25, 0.5]), 0.5);
    }
}
