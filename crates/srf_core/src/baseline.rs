//! Full-table baselines.
//!
//! Textbook implementations that materialise every intermediate state and
//! never checkpoint. They call the same kernels as the backends, in the
//! same order, so a recompute run must reproduce their results exactly.

use std::collections::VecDeque;

use num_traits::Float;

use crate::backend::{graph_relax, grid_cell, sequential_step, Semiring, UNREACHABLE};
use crate::checkpoint::StateVector;
use crate::error::{InstanceError, SrfResult};
use crate::problem::{AlignmentPair, Dag, HiddenMarkovModel, Observation, Scoring};

/// Every state vector of the recursion under `semiring`.
///
/// # Errors
///
/// Returns an `InstanceError` if `observations` is empty or out of range.
pub fn state_table<T: Float>(
    model: &HiddenMarkovModel<T>,
    observations: &[Observation],
    semiring: Semiring,
) -> SrfResult<Vec<StateVector<T>>> {
    model.validate_observations(observations)?;
    let lanes = model.n_states();
    let mut table: Vec<StateVector<T>> = Vec::with_capacity(observations.len());
    table.push(
        (0..lanes)
            .map(|s| model.start_weight(s) * model.emission_weight(s, observations[0]))
            .collect(),
    );
    for &obs in &observations[1..] {
        let prev = &table[table.len() - 1];
        let next = (0..lanes)
            .map(|s| sequential_step(semiring, prev, model.transition_col(s), model.emission_weight(s, obs)))
            .collect();
        table.push(next);
    }
    Ok(table)
}

/// Forward variables `alpha[t][s]` for every step.
pub fn forward_table<T: Float>(
    model: &HiddenMarkovModel<T>,
    observations: &[Observation],
) -> SrfResult<Vec<StateVector<T>>> {
    state_table(model, observations, Semiring::SumProduct)
}

/// Total probability of `observations`.
pub fn forward_probability<T: Float>(model: &HiddenMarkovModel<T>, observations: &[Observation]) -> SrfResult<T> {
    final_value(model, observations, Semiring::SumProduct)
}

/// Probability of the most likely state path.
pub fn viterbi_probability<T: Float>(model: &HiddenMarkovModel<T>, observations: &[Observation]) -> SrfResult<T> {
    final_value(model, observations, Semiring::MaxProduct)
}

fn final_value<T: Float>(
    model: &HiddenMarkovModel<T>,
    observations: &[Observation],
    semiring: Semiring,
) -> SrfResult<T> {
    let table = state_table(model, observations, semiring)?;
    Ok(table.last().map_or(T::zero(), |last| semiring.reduce(last)))
}

/// Full Needleman-Wunsch score table, `(rows + 1) x (cols + 1)`.
pub fn needleman_wunsch_table(pair: &AlignmentPair, scoring: &Scoring) -> Vec<Vec<i64>> {
    let (n, m) = (pair.rows(), pair.cols());
    let mut table = vec![vec![0i64; m + 1]; n + 1];
    for (j, cell) in table[0].iter_mut().enumerate() {
        *cell = scoring.gap_run(j);
    }
    for i in 1..=n {
        table[i][0] = scoring.gap_run(i);
        for j in 1..=m {
            table[i][j] = grid_cell(
                table[i - 1][j - 1],
                table[i - 1][j],
                table[i][j - 1],
                pair.substitution(i, j, scoring),
                scoring.gap,
            );
        }
    }
    table
}

/// Row `i` of the score table.
pub fn needleman_wunsch_row(pair: &AlignmentPair, scoring: &Scoring, i: usize) -> Vec<i64> {
    needleman_wunsch_table(pair, scoring).swap_remove(i)
}

/// Global alignment score.
pub fn needleman_wunsch_score(pair: &AlignmentPair, scoring: &Scoring) -> i64 {
    let table = needleman_wunsch_table(pair, scoring);
    table[pair.rows()][pair.cols()]
}

/// Shortest distance from the source to the sink, `None` if unreachable.
///
/// Relaxes in a topological order computed from the edges, so the result
/// does not depend on any visitation schedule.
///
/// # Errors
///
/// Returns `InstanceError::InvalidSchedule` if the graph has a cycle.
pub fn dag_shortest_path(dag: &Dag) -> SrfResult<Option<i64>> {
    let n = dag.node_count();
    let mut in_degree = vec![0usize; n];
    for u in 0..n {
        for edge in dag.out_edges(u) {
            in_degree[edge.to] += 1;
        }
    }
    let mut ready: VecDeque<usize> = (0..n).filter(|&u| in_degree[u] == 0).collect();
    let mut dist = vec![UNREACHABLE; n];
    dist[dag.source()] = 0;

    let mut visited = 0;
    while let Some(u) = ready.pop_front() {
        visited += 1;
        for edge in dag.out_edges(u) {
            if dist[u] != UNREACHABLE {
                dist[edge.to] = graph_relax(&[dist[u], dist[edge.to]], &[edge.weight, 0]);
            }
            in_degree[edge.to] -= 1;
            if in_degree[edge.to] == 0 {
                ready.push_back(edge.to);
            }
        }
    }
    if visited != n {
        return Err(InstanceError::InvalidSchedule("graph contains a cycle".to_string()).into());
    }

    Ok(match dist[dag.sink()] {
        UNREACHABLE => None,
        d => Some(d),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_obs() -> Vec<Observation> {
        vec![Observation::WALK, Observation::SHOP, Observation::CLEAN]
    }

    #[test]
    fn test_forward_reference() {
        let p = forward_probability(&HiddenMarkovModel::weather(), &reference_obs()).unwrap();
        assert_relative_eq!(p, 0.033612, epsilon = 1e-12);
    }

    #[test]
    fn test_viterbi_reference() {
        let p = viterbi_probability(&HiddenMarkovModel::weather(), &reference_obs()).unwrap();
        assert_relative_eq!(p, 0.01344, epsilon = 1e-12);
    }

    #[test]
    fn test_forward_table_first_row() {
        let table = forward_table(&HiddenMarkovModel::weather(), &reference_obs()).unwrap();
        assert_eq!(table.len(), 3);
        assert_relative_eq!(table[0][0], 0.06, epsilon = 1e-15);
        assert_relative_eq!(table[0][1], 0.24, epsilon = 1e-15);
    }

    #[test]
    fn test_empty_sequence_rejected() {
        assert!(forward_probability(&HiddenMarkovModel::weather(), &[]).is_err());
    }

    #[test]
    fn test_needleman_wunsch_reference() {
        let pair = AlignmentPair::new("GATTACA", "GCATGCU").unwrap();
        assert_eq!(needleman_wunsch_score(&pair, &Scoring::default()), 0);
    }

    #[test]
    fn test_needleman_wunsch_identical() {
        let pair = AlignmentPair::new("ACGT", "ACGT").unwrap();
        assert_eq!(needleman_wunsch_score(&pair, &Scoring::default()), 4);
        assert_eq!(
            needleman_wunsch_row(&pair, &Scoring::default(), 0),
            vec![0, -1, -2, -3, -4]
        );
    }

    #[test]
    fn test_dag_reference() {
        let dag = Dag::from_edges(&[(0, 1, 1), (0, 2, 2), (1, 3, 1), (2, 3, 3), (3, 4, 2)]).unwrap();
        assert_eq!(dag_shortest_path(&dag).unwrap(), Some(4));
    }

    #[test]
    fn test_dag_order_independent() {
        // Edge list order does not matter to the oracle
        let dag = Dag::from_edges(&[(2, 3, 1), (1, 2, 1), (0, 1, 1), (0, 3, 10)]).unwrap();
        assert_eq!(dag_shortest_path(&dag).unwrap(), Some(3));
    }

    #[test]
    fn test_dag_cycle_rejected() {
        let dag = Dag::from_edges(&[(0, 1, 1), (1, 2, 1), (2, 1, 1)]).unwrap();
        assert!(dag_shortest_path(&dag).is_err());
    }

    #[test]
    fn test_dag_unreachable() {
        let dag = Dag::from_edges(&[(1, 2, 1)]).unwrap();
        assert_eq!(dag_shortest_path(&dag).unwrap(), None);
    }
}
