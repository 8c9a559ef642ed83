//! DAG (shortest path) recompute engine.

use tracing::{debug, info, warn};

use super::{stage, CheckpointSink, ReportContext, RunClock, RunReport, RunValue, Topology};
use crate::backend::{Backend, ComputeBackend, UNREACHABLE};
use crate::checkpoint::{alloc_state, CheckpointScheduler, CheckpointTable, StateVector};
use crate::config::RunConfig;
use crate::error::SrfResult;
use crate::granularity::{GranularityKind, GranularityPolicy};
use crate::metrics::MetricsRegistry;
use crate::problem::{Dag, OrderCheck};

/// Result of a DAG run.
#[derive(Clone, Debug)]
pub struct DagRun {
    /// Run report.
    pub report: RunReport,
    /// Distance to the sink, `None` if unreachable.
    pub distance: Option<i64>,
    /// Final distance of every node ([`UNREACHABLE`] if not reached).
    pub distances: StateVector<i64>,
    /// Visitation schedule the run followed.
    pub schedule: Vec<usize>,
    /// Distances of checkpointed nodes, one slot per checkpoint position.
    pub checkpoints: CheckpointTable<i64>,
}

/// Single-pass shortest-path engine.
///
/// Visits nodes in the configured schedule and relaxes the outgoing edges
/// of every reached node once. With [`OrderCheck::Enforce`] (the default)
/// a schedule that would expand a node before one of its predecessors is
/// rejected; with [`OrderCheck::Trust`] it is run as given.
#[derive(Clone, Debug)]
pub struct DagEngine {
    config: RunConfig,
    backend: Backend,
}

impl DagEngine {
    /// Creates an engine, instantiating the configured backend.
    pub fn new(config: RunConfig) -> Self {
        let backend = config.backend().instantiate();
        Self { config, backend }
    }

    /// Runs with the schedule produced by the configured visit order.
    pub fn run(&mut self, dag: &Dag, registry: &MetricsRegistry) -> SrfResult<DagRun> {
        let schedule = dag.schedule(self.config.visit_order());
        self.run_with_schedule(dag, schedule, registry)
    }

    /// Runs with an explicit visitation schedule.
    ///
    /// # Errors
    ///
    /// - `InstanceError::InvalidSchedule` if `schedule` is not a permutation
    ///   of the nodes
    /// - `InstanceError::RelaxationOrder` under [`OrderCheck::Enforce`] if
    ///   one pass over `schedule` cannot give exact distances
    /// - `ResourceError` if distance storage or device memory cannot be
    ///   allocated
    pub fn run_with_schedule(
        &mut self,
        dag: &Dag,
        schedule: Vec<usize>,
        registry: &MetricsRegistry,
    ) -> SrfResult<DagRun> {
        match self.config.order_check() {
            OrderCheck::Enforce => dag.check_relaxation_order(&schedule)?,
            OrderCheck::Trust => {
                dag.validate_schedule(&schedule)?;
                warn!("relaxation order not checked; distances may be inexact");
            }
        }
        let scheduler = self.config.scheduler(std::mem::size_of::<i64>())?;
        let policy = self.config.granularity_policy(GranularityKind::Group)?;

        let clock = RunClock::start(&mut self.backend, registry);
        info!(
            topology = "dag",
            nodes = dag.node_count(),
            edges = dag.edge_count(),
            interval = scheduler.effective_interval(),
            order = ?self.config.visit_order(),
            depth = self.config.recompute_depth(),
            backend = %self.backend.kind(),
            "starting run"
        );

        let weights: Vec<i64> = (0..dag.node_count())
            .flat_map(|u| dag.out_edges(u).iter().map(|e| e.weight))
            .collect();
        let staged = stage(&mut self.backend, &weights)?;
        let mut sink = match CheckpointSink::new(&mut self.backend, 1) {
            Ok(sink) => sink,
            Err(e) => {
                self.backend.device_free(staged);
                return Err(e);
            }
        };

        let pass = Pass {
            dag,
            schedule: &schedule,
            depth: self.config.recompute_depth(),
            scheduler: &scheduler,
            policy: &policy,
            registry,
        };
        let outcome = pass.run(&mut self.backend, &mut sink);
        sink.release(&mut self.backend);
        self.backend.device_free(staged);
        let (distances, checkpoints) = outcome?;

        let distance = match distances[dag.sink()] {
            UNREACHABLE => None,
            d => Some(d),
        };
        let report = ReportContext {
            config: &self.config,
            backend: &self.backend,
            registry,
            clock,
        }
        .finish(
            Topology::Dag,
            "shortest-path",
            RunValue::Distance(distance),
            dag.node_count(),
            scheduler.effective_interval(),
            checkpoints.written_count(),
        );
        info!(
            result = %report.value,
            recompute_events = report.metrics.recompute_events,
            elapsed_us = report.elapsed_us,
            "run finished"
        );

        Ok(DagRun {
            report,
            distance,
            distances,
            schedule,
            checkpoints,
        })
    }
}

struct Pass<'a> {
    dag: &'a Dag,
    schedule: &'a [usize],
    depth: u64,
    scheduler: &'a CheckpointScheduler,
    policy: &'a GranularityPolicy,
    registry: &'a MetricsRegistry,
}

impl Pass<'_> {
    fn run(
        &self,
        backend: &mut Backend,
        sink: &mut CheckpointSink<i64>,
    ) -> SrfResult<(StateVector<i64>, CheckpointTable<i64>)> {
        let n = self.dag.node_count();
        let mut table = CheckpointTable::with_slots(self.scheduler.slot_count(n), 1)?;
        let mut dist = alloc_state(n, UNREACHABLE)?;
        dist[self.dag.source()] = 0;
        let dist_bytes = n * std::mem::size_of::<i64>();
        self.registry.update_working_set(dist_bytes);

        let operands = 4;
        for (position, &u) in self.schedule.iter().enumerate() {
            self.registry.record_unit(self.policy.linear(u));
            let is_checkpoint = self.scheduler.is_checkpoint(position);
            if is_checkpoint {
                let slot = self.scheduler.slot(position);
                sink.persist(backend, &mut table, slot, &dist[u..=u])?;
                self.registry.record_tile_reuse();
                self.registry.update_working_set(dist_bytes + table.memory_usage());
                debug!(node = u, position, slot, "checkpoint written");
            }

            let from = dist[u];
            if from == UNREACHABLE {
                continue;
            }
            for edge in self.dag.out_edges(u) {
                if !is_checkpoint {
                    self.registry.record_recompute(self.depth);
                }
                self.registry.record_dist(edge.to.abs_diff(u) as u64);
                dist[edge.to] = backend.graph_relax(&[from, dist[edge.to]], &[edge.weight, 0]);
                self.registry.record_compute(operands);
                self.registry.record_dispatch(backend.dispatch_cost());
            }
        }
        Ok((dist, table))
    }
}
