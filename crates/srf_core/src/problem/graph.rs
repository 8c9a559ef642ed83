//! Weighted DAGs for the graph topology.

use serde::{Deserialize, Serialize};

use crate::error::{InstanceError, ResourceError, SrfResult};

/// Outgoing edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Target node.
    pub to: usize,
    /// Edge weight.
    pub weight: i64,
}

/// Node visitation order for single-pass relaxation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitOrder {
    /// Ascending node id.
    #[default]
    Natural,
    /// Even ids ascending, then odd ids ascending.
    Interleaved,
}

/// Whether a run validates the relaxation-order precondition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderCheck {
    /// Reject schedules under which one pass gives wrong distances.
    #[default]
    Enforce,
    /// Caller guarantees the order; distances may be wrong if it does not hold.
    Trust,
}

/// Directed acyclic graph with integer edge weights.
///
/// Node ids are dense: the node count is one more than the largest id
/// mentioned by any edge. Node 0 is the source and the highest id is the
/// sink.
///
/// # Relaxation order
///
/// Shortest paths are computed in a single pass over a visitation
/// schedule, with no fixpoint iteration. That pass is exact only if every
/// node is expanded after all of its predecessors, which
/// [`check_relaxation_order`](Dag::check_relaxation_order) verifies.
/// Nodes without outgoing edges are never expanded, so their position in
/// the schedule is unconstrained.
///
/// # Example
///
/// ```rust
/// use srf_core::problem::{Dag, VisitOrder};
///
/// let dag = Dag::from_edges(&[(0, 1, 1), (0, 2, 2), (1, 3, 1), (2, 3, 3), (3, 4, 2)]).unwrap();
/// assert_eq!(dag.node_count(), 5);
/// assert_eq!(dag.sink(), 4);
///
/// let schedule = dag.schedule(VisitOrder::Interleaved);
/// assert_eq!(schedule, vec![0, 2, 4, 1, 3]);
/// assert!(dag.check_relaxation_order(&schedule).is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dag {
    adjacency: Vec<Vec<Edge>>,
    edge_count: usize,
}

impl Dag {
    /// Builds a graph from `(from, to, weight)` triples, inferring the node count.
    ///
    /// # Errors
    ///
    /// - `InstanceError::EmptyGraph` if `edges` is empty
    /// - `InstanceError::NodeIdOverflow` if an id is `usize::MAX`
    /// - `ResourceError::AllocationFailed` if the node set cannot be allocated
    pub fn from_edges(edges: &[(usize, usize, i64)]) -> SrfResult<Self> {
        let max_id = edges
            .iter()
            .map(|&(from, to, _)| from.max(to))
            .max()
            .ok_or(InstanceError::EmptyGraph)?;
        let node_count = max_id.checked_add(1).ok_or(InstanceError::NodeIdOverflow(max_id))?;
        Self::with_node_count(node_count, edges)
    }

    /// Builds a graph with an explicit node count.
    ///
    /// # Errors
    ///
    /// - `InstanceError::EmptyGraph` if `edges` is empty
    /// - `InstanceError::NodeOutOfRange` if an edge mentions an id `>= node_count`
    /// - `ResourceError::AllocationFailed` if the node set cannot be allocated
    pub fn with_node_count(node_count: usize, edges: &[(usize, usize, i64)]) -> SrfResult<Self> {
        if edges.is_empty() {
            return Err(InstanceError::EmptyGraph.into());
        }
        if let Some(&(from, to, _)) = edges.iter().find(|&&(from, to, _)| from >= node_count || to >= node_count) {
            return Err(InstanceError::NodeOutOfRange {
                from,
                to,
                node_count,
            }
            .into());
        }
        let mut adjacency: Vec<Vec<Edge>> = Vec::new();
        adjacency
            .try_reserve_exact(node_count)
            .map_err(|_| ResourceError::AllocationFailed {
                what: "graph adjacency",
                bytes: node_count.saturating_mul(std::mem::size_of::<Vec<Edge>>()),
            })?;
        adjacency.resize_with(node_count, Vec::new);
        for &(from, to, weight) in edges {
            adjacency[from].push(Edge { to, weight });
        }
        Ok(Self {
            adjacency,
            edge_count: edges.len(),
        })
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Source node (always 0).
    #[inline]
    pub fn source(&self) -> usize {
        0
    }

    /// Sink node (highest id).
    #[inline]
    pub fn sink(&self) -> usize {
        self.adjacency.len() - 1
    }

    /// Outgoing edges of `node`.
    #[inline]
    pub fn out_edges(&self, node: usize) -> &[Edge] {
        &self.adjacency[node]
    }

    /// Produces the visitation schedule for `order`.
    pub fn schedule(&self, order: VisitOrder) -> Vec<usize> {
        let n = self.node_count();
        match order {
            VisitOrder::Natural => (0..n).collect(),
            VisitOrder::Interleaved => (0..n).step_by(2).chain((1..n).step_by(2)).collect(),
        }
    }

    /// Checks that `schedule` visits every node exactly once.
    ///
    /// # Errors
    ///
    /// Returns `InstanceError::InvalidSchedule` otherwise.
    pub fn validate_schedule(&self, schedule: &[usize]) -> SrfResult<()> {
        let n = self.node_count();
        if schedule.len() != n {
            return Err(InstanceError::InvalidSchedule(format!(
                "{} entries for {} nodes",
                schedule.len(),
                n
            ))
            .into());
        }
        let mut seen = vec![false; n];
        for &node in schedule {
            match seen.get_mut(node) {
                None => {
                    return Err(InstanceError::InvalidSchedule(format!("node {} out of range", node)).into())
                }
                Some(true) => {
                    return Err(InstanceError::InvalidSchedule(format!("node {} visited twice", node)).into())
                }
                Some(flag) => *flag = true,
            }
        }
        Ok(())
    }

    /// Checks the single-pass precondition: for every edge `u → v` where
    /// `v` has outgoing edges, `u` appears before `v` in `schedule`.
    ///
    /// # Errors
    ///
    /// - `InstanceError::InvalidSchedule` if `schedule` is not a permutation
    /// - `InstanceError::RelaxationOrder` naming the first offending edge
    pub fn check_relaxation_order(&self, schedule: &[usize]) -> SrfResult<()> {
        self.validate_schedule(schedule)?;

        let mut position = vec![0usize; self.node_count()];
        for (pos, &node) in schedule.iter().enumerate() {
            position[node] = pos;
        }

        for &from in schedule {
            for edge in self.out_edges(from) {
                if !self.adjacency[edge.to].is_empty() && position[from] >= position[edge.to] {
                    return Err(InstanceError::RelaxationOrder { from, to: edge.to }.into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SrfError;

    fn reference_dag() -> Dag {
        Dag::from_edges(&[(0, 1, 1), (0, 2, 2), (1, 3, 1), (2, 3, 3), (3, 4, 2)]).unwrap()
    }

    #[test]
    fn test_node_count_inferred() {
        let dag = reference_dag();
        assert_eq!(dag.node_count(), 5);
        assert_eq!(dag.edge_count(), 5);
        assert_eq!(dag.source(), 0);
        assert_eq!(dag.sink(), 4);
        assert_eq!(dag.out_edges(0).len(), 2);
        assert!(dag.out_edges(4).is_empty());
    }

    #[test]
    fn test_empty_graph_rejected() {
        assert_eq!(
            Dag::from_edges(&[]).unwrap_err(),
            SrfError::Instance(InstanceError::EmptyGraph)
        );
    }

    #[test]
    fn test_node_out_of_range() {
        let err = Dag::with_node_count(3, &[(0, 3, 1)]).unwrap_err();
        assert!(err.to_string().contains("0..3"));
    }

    #[test]
    fn test_node_id_overflow_rejected() {
        assert_eq!(
            Dag::from_edges(&[(0, usize::MAX, 1)]).unwrap_err(),
            SrfError::Instance(InstanceError::NodeIdOverflow(usize::MAX))
        );
    }

    #[test]
    fn test_oversized_node_set_is_allocation_failure() {
        let err = Dag::from_edges(&[(0, 1 << 40, 1)]).unwrap_err();
        assert!(matches!(
            err,
            SrfError::Resource(ResourceError::AllocationFailed {
                what: "graph adjacency",
                ..
            })
        ));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_schedules() {
        let dag = reference_dag();
        assert_eq!(dag.schedule(VisitOrder::Natural), vec![0, 1, 2, 3, 4]);
        assert_eq!(dag.schedule(VisitOrder::Interleaved), vec![0, 2, 4, 1, 3]);
    }

    #[test]
    fn test_invalid_schedules() {
        let dag = reference_dag();
        assert!(dag.validate_schedule(&[0, 1, 2, 3]).is_err());
        assert!(dag.validate_schedule(&[0, 1, 2, 3, 3]).is_err());
        assert!(dag.validate_schedule(&[0, 1, 2, 3, 9]).is_err());
    }

    #[test]
    fn test_relaxation_order_violation() {
        let dag = reference_dag();
        // 3 expanded before its predecessor 1
        let err = dag.check_relaxation_order(&[0, 2, 3, 1, 4]).unwrap_err();
        assert_eq!(
            err,
            SrfError::Instance(InstanceError::RelaxationOrder { from: 1, to: 3 })
        );
    }

    #[test]
    fn test_chain_rejects_interleaved() {
        let edges: Vec<_> = (0..5).map(|i| (i, i + 1, 1)).collect();
        let dag = Dag::from_edges(&edges).unwrap();
        assert!(dag.check_relaxation_order(&dag.schedule(VisitOrder::Natural)).is_ok());
        assert!(dag
            .check_relaxation_order(&dag.schedule(VisitOrder::Interleaved))
            .is_err());
    }
}
