//! Sequential (HMM) recompute engine.

use num_traits::Float;
use tracing::{debug, info};

use super::{stage, CheckpointSink, ReportContext, RunClock, RunReport, RunValue, Topology};
use crate::backend::{Backend, ComputeBackend, Semiring};
use crate::checkpoint::{alloc_state, CheckpointScheduler, CheckpointTable, StateVector};
use crate::config::RunConfig;
use crate::error::{CheckpointError, ConfigError, InstanceError, SrfResult};
use crate::granularity::{GranularityKind, GranularityPolicy};
use crate::metrics::MetricsRegistry;
use crate::problem::{HiddenMarkovModel, Observation};

/// Result of a sequential run.
#[derive(Clone, Debug)]
pub struct SequentialRun<T> {
    /// Run report.
    pub report: RunReport,
    /// Persisted states, one slot per checkpoint.
    pub checkpoints: CheckpointTable<T>,
    /// State vector at the last step.
    pub final_state: StateVector<T>,
    /// Reduction the run used.
    pub semiring: Semiring,
    scheduler: CheckpointScheduler,
}

impl<T: Float> SequentialRun<T> {
    /// Scalar result: sum or max over the final state.
    pub fn value(&self) -> T {
        self.semiring.reduce(&self.final_state)
    }

    /// Scheduler that placed the checkpoints.
    pub fn scheduler(&self) -> CheckpointScheduler {
        self.scheduler
    }
}

/// Forward / Viterbi engine over an observation sequence.
///
/// # Example
///
/// ```rust
/// use srf_core::backend::Semiring;
/// use srf_core::config::RunConfig;
/// use srf_core::engine::SequentialEngine;
/// use srf_core::metrics::MetricsRegistry;
/// use srf_core::problem::{HiddenMarkovModel, Observation};
///
/// let model = HiddenMarkovModel::weather();
/// let obs = [Observation::WALK, Observation::SHOP, Observation::CLEAN];
/// let registry = MetricsRegistry::new();
///
/// let mut engine = SequentialEngine::new(RunConfig::builder().interval(2).build().unwrap());
/// let run = engine.run(&model, &obs, Semiring::SumProduct, &registry).unwrap();
/// assert!((run.value() - 0.033612).abs() < 1e-12);
/// assert_eq!(run.report.metrics.recompute_events, 1);
/// ```
#[derive(Clone, Debug)]
pub struct SequentialEngine {
    config: RunConfig,
    backend: Backend,
}

impl SequentialEngine {
    /// Creates an engine, instantiating the configured backend.
    pub fn new(config: RunConfig) -> Self {
        let backend = config.backend().instantiate();
        Self { config, backend }
    }

    /// Engine configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs the forward (`SumProduct`) or Viterbi (`MaxProduct`) recursion.
    ///
    /// # Errors
    ///
    /// - `ConfigError` / `InstanceError` before any metrics are reset
    /// - `ResourceError` if checkpoint storage or device memory cannot be
    ///   allocated
    pub fn run<T: Float + Default>(
        &mut self,
        model: &HiddenMarkovModel<T>,
        observations: &[Observation],
        semiring: Semiring,
        registry: &MetricsRegistry,
    ) -> SrfResult<SequentialRun<T>> {
        model.validate_observations(observations)?;
        let lanes = model.n_states();
        let cell_size = lanes * std::mem::size_of::<T>();
        let scheduler = self.config.scheduler(cell_size)?;
        let policy = self.config.granularity_policy(GranularityKind::Segment)?;

        let clock = RunClock::start(&mut self.backend, registry);
        let steps = observations.len();
        info!(
            topology = "sequential",
            variant = semiring.algorithm(),
            steps,
            interval = scheduler.effective_interval(),
            backend = %self.backend.kind(),
            "starting run"
        );

        let transitions: Vec<T> = (0..lanes)
            .flat_map(|s| model.transition_col(s).iter().copied())
            .collect();
        let staged = stage(&mut self.backend, &transitions)?;
        let mut sink = match CheckpointSink::new(&mut self.backend, lanes) {
            Ok(sink) => sink,
            Err(e) => {
                self.backend.device_free(staged);
                return Err(e);
            }
        };

        let walk = Walk {
            model,
            observations,
            semiring,
            scheduler: &scheduler,
            policy: &policy,
            registry,
        };
        let outcome = walk.run(&mut self.backend, &mut sink);
        sink.release(&mut self.backend);
        self.backend.device_free(staged);
        let (final_state, checkpoints) = outcome?;

        let value = semiring.reduce(&final_state);
        let report = ReportContext {
            config: &self.config,
            backend: &self.backend,
            registry,
            clock,
        }
        .finish(
            Topology::Sequential,
            semiring.algorithm(),
            RunValue::Probability(value.to_f64().unwrap_or(f64::NAN)),
            steps,
            scheduler.effective_interval(),
            checkpoints.written_count(),
        );
        info!(
            result = %report.value,
            recompute_events = report.metrics.recompute_events,
            elapsed_us = report.elapsed_us,
            "run finished"
        );

        Ok(SequentialRun {
            report,
            checkpoints,
            final_state,
            semiring,
            scheduler,
        })
    }

    /// Rebuilds the state vector at step `t` of a finished run.
    ///
    /// Restores the nearest checkpoint at or before `t` and recomputes
    /// forward; every replayed step is recorded as a recompute event in
    /// `registry`, which is not reset.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` if `t` is outside the sequence
    /// - `InstanceError::ShapeMismatch` if `model` or `observations` do not
    ///   match the shape of the run's checkpoints
    /// - `InstanceError::SymbolOutOfRange` for a symbol beyond the alphabet
    /// - `CheckpointError::NotFound` if no checkpoint precedes `t`
    pub fn reconstruct<T: Float + Default>(
        &mut self,
        run: &SequentialRun<T>,
        model: &HiddenMarkovModel<T>,
        observations: &[Observation],
        t: usize,
        registry: &MetricsRegistry,
    ) -> SrfResult<StateVector<T>> {
        if t >= observations.len() {
            return Err(ConfigError::InvalidParameter {
                name: "step",
                value: format!("{} outside sequence of {} steps", t, observations.len()),
            }
            .into());
        }
        let scheduler = run.scheduler;
        if model.n_states() != run.checkpoints.lanes() {
            return Err(InstanceError::ShapeMismatch {
                field: "states",
                expected: run.checkpoints.lanes(),
                found: model.n_states(),
            }
            .into());
        }
        let step_slots = scheduler.slot_count(observations.len());
        if step_slots != run.checkpoints.capacity() {
            return Err(InstanceError::ShapeMismatch {
                field: "checkpoint steps",
                expected: run.checkpoints.capacity(),
                found: step_slots,
            }
            .into());
        }
        model.validate_observations(observations)?;
        let slot = run
            .checkpoints
            .nearest_before(scheduler.slot(t))
            .ok_or(CheckpointError::NotFound {
                slot: scheduler.slot(t),
            })?;
        let origin = scheduler.slot_start(slot);
        let mut prev = run.checkpoints.restore(slot)?.to_vec();
        let mut curr = alloc_state(prev.len(), T::zero())?;
        debug!(step = t, origin, "reconstructing state");

        for step in origin + 1..=t {
            registry.record_recompute(1);
            registry.record_dist((step - origin) as u64);
            advance(
                &mut self.backend,
                run.semiring,
                model,
                observations[step],
                &prev,
                &mut curr,
                registry,
            );
            std::mem::swap(&mut prev, &mut curr);
        }
        Ok(prev)
    }
}

/// Computes `next` from `prev` for one observation.
fn advance<T: Float>(
    backend: &mut Backend,
    semiring: Semiring,
    model: &HiddenMarkovModel<T>,
    obs: Observation,
    prev: &[T],
    next: &mut [T],
    registry: &MetricsRegistry,
) {
    let operands = 2 * prev.len() + 1;
    for (s, out) in next.iter_mut().enumerate() {
        *out = backend.sequential_step(semiring, prev, model.transition_col(s), model.emission_weight(s, obs));
        registry.record_compute(operands);
        registry.record_dispatch(backend.dispatch_cost());
    }
}

struct Walk<'a, T> {
    model: &'a HiddenMarkovModel<T>,
    observations: &'a [Observation],
    semiring: Semiring,
    scheduler: &'a CheckpointScheduler,
    policy: &'a GranularityPolicy,
    registry: &'a MetricsRegistry,
}

impl<T: Float + Default> Walk<'_, T> {
    fn run(
        &self,
        backend: &mut Backend,
        sink: &mut CheckpointSink<T>,
    ) -> SrfResult<(StateVector<T>, CheckpointTable<T>)> {
        let lanes = self.model.n_states();
        let cell_size = lanes * std::mem::size_of::<T>();
        let steps = self.observations.len();
        let mut table = CheckpointTable::with_slots(self.scheduler.slot_count(steps), lanes)?;

        let mut prev = alloc_state(lanes, T::zero())?;
        let mut curr = alloc_state(lanes, T::zero())?;
        let first = self.observations[0];
        for (s, out) in prev.iter_mut().enumerate() {
            *out = self.model.start_weight(s) * self.model.emission_weight(s, first);
        }
        self.registry.record_unit(self.policy.linear(0));
        self.checkpoint(backend, sink, &mut table, 0, &prev)?;
        self.registry.update_working_set(2 * cell_size + table.memory_usage());

        let interval = self.scheduler.effective_interval();
        for t in 1..steps {
            self.registry.record_unit(self.policy.linear(t));
            let is_checkpoint = self.scheduler.is_checkpoint(t);
            if !is_checkpoint {
                self.registry.record_recompute(1);
                self.registry.record_dist((t % interval) as u64);
            }

            advance(
                backend,
                self.semiring,
                self.model,
                self.observations[t],
                &prev,
                &mut curr,
                self.registry,
            );
            std::mem::swap(&mut prev, &mut curr);

            if is_checkpoint {
                self.checkpoint(backend, sink, &mut table, t, &prev)?;
                self.registry.update_working_set(2 * cell_size + table.memory_usage());
            }
        }
        Ok((prev, table))
    }

    fn checkpoint(
        &self,
        backend: &mut Backend,
        sink: &mut CheckpointSink<T>,
        table: &mut CheckpointTable<T>,
        t: usize,
        state: &[T],
    ) -> SrfResult<()> {
        let slot = self.scheduler.slot(t);
        sink.persist(backend, table, slot, state)?;
        self.registry.record_tile_reuse();
        debug!(step = t, slot, "checkpoint written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendKind, BackendSelection, TRANSFER_COST_US};
    use crate::checkpoint::ScheduleMode;
    use crate::error::{InstanceError, SrfError};
    use approx::assert_relative_eq;

    fn reference_obs() -> Vec<Observation> {
        vec![Observation::WALK, Observation::SHOP, Observation::CLEAN]
    }

    fn engine(interval: usize) -> SequentialEngine {
        SequentialEngine::new(RunConfig::builder().interval(interval).build().unwrap())
    }

    // ========================================================================
    // Results
    // ========================================================================

    #[test]
    fn test_forward_reference_value() {
        let model = HiddenMarkovModel::weather();
        let registry = MetricsRegistry::new();
        for k in 1..=3 {
            let run = engine(k)
                .run(&model, &reference_obs(), Semiring::SumProduct, &registry)
                .unwrap();
            assert_relative_eq!(run.value(), 0.033612, epsilon = 1e-12);
            assert_eq!(run.report.variant, "forward");
        }
    }

    #[test]
    fn test_viterbi_reference_value() {
        let model = HiddenMarkovModel::weather();
        let registry = MetricsRegistry::new();
        let run = engine(2)
            .run(&model, &reference_obs(), Semiring::MaxProduct, &registry)
            .unwrap();
        assert_relative_eq!(run.value(), 0.01344, epsilon = 1e-12);
        assert_eq!(run.report.variant, "viterbi");
    }

    #[test]
    fn test_single_observation() {
        let model = HiddenMarkovModel::weather();
        let registry = MetricsRegistry::new();
        let run = engine(5)
            .run(&model, &[Observation::WALK], Semiring::SumProduct, &registry)
            .unwrap();
        // 0.6 * 0.1 + 0.4 * 0.6
        assert_relative_eq!(run.value(), 0.3, epsilon = 1e-12);
        assert_eq!(run.report.metrics.recompute_events, 0);
        assert_eq!(run.report.metrics.compute_events, 0);
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    #[test]
    fn test_recompute_count_law() {
        let model = HiddenMarkovModel::weather();
        let obs: Vec<_> = (0..23).map(|i| Observation::Symbol(i % 3)).collect();
        let registry = MetricsRegistry::new();
        for k in [1, 2, 3, 7, 22, 50] {
            let run = engine(k).run(&model, &obs, Semiring::SumProduct, &registry).unwrap();
            let expected = 22 - 22 / k;
            assert_eq!(run.report.metrics.recompute_events, expected as u64);
            assert_eq!(run.report.checkpoints_written, 1 + 22 / k);
            assert_eq!(run.report.metrics.tile_reuse_count, (1 + 22 / k) as u64);
        }
    }

    #[test]
    fn test_compute_and_unit_metrics() {
        let model = HiddenMarkovModel::weather();
        let obs: Vec<_> = (0..9).map(|_| Observation::WALK).collect();
        let registry = MetricsRegistry::new();
        let config = RunConfig::builder().interval(3).granularity(4).build().unwrap();
        let run = SequentialEngine::new(config)
            .run(&model, &obs, Semiring::SumProduct, &registry)
            .unwrap();
        let m = run.report.metrics;
        assert_eq!(m.compute_events, 8 * 2);
        assert_eq!(m.memory_access_proxy, 8 * 2 * 5);
        // units 0,0,0,0,1,1,1,1,2
        assert_eq!(m.unit_recompute_events, 3);
        assert_eq!(m.unit_reuse_proxy, 6);
        // non-checkpoint steps 1,2,4,5,7,8 at distances 1,2,1,2,1,2
        assert_eq!(m.total_dist_metric, 9);
        assert!(m.working_set_bytes >= 2 * 2 * 8);
        assert_eq!(m.dispatch_overhead_proxy, 0);
    }

    #[test]
    fn test_locality_mode_shortens_chains() {
        let model = HiddenMarkovModel::weather();
        let obs: Vec<_> = (0..21).map(|_| Observation::SHOP).collect();
        let registry = MetricsRegistry::new();
        let config = RunConfig::builder()
            .interval(10)
            .schedule_mode(ScheduleMode::Locality)
            .build()
            .unwrap();
        let run = SequentialEngine::new(config)
            .run(&model, &obs, Semiring::SumProduct, &registry)
            .unwrap();
        assert_eq!(run.report.effective_interval, 5);
        assert_eq!(run.report.metrics.recompute_events, 16);
    }

    // ========================================================================
    // Backends
    // ========================================================================

    #[test]
    fn test_accelerator_costs() {
        let model = HiddenMarkovModel::weather();
        let obs: Vec<_> = (0..10).map(|_| Observation::CLEAN).collect();
        let registry = MetricsRegistry::new();
        let config = RunConfig::builder()
            .interval(3)
            .backend(BackendSelection::SimulatedAccelerator { memory_budget_kb: 0 })
            .build()
            .unwrap();
        let mut engine = SequentialEngine::new(config);
        let run = engine.run(&model, &obs, Semiring::SumProduct, &registry).unwrap();

        assert_eq!(run.report.backend, BackendKind::SimulatedAccelerator);
        // staging + checkpoints at 0, 3, 6, 9
        assert_eq!(run.report.backend_metrics.transfer_overhead_us, 5 * TRANSFER_COST_US);
        assert_eq!(run.report.backend_metrics.kernel_launch_count, 9 * 2);
        assert_eq!(run.report.metrics.dispatch_overhead_proxy, 9 * 2);

        let local = SequentialEngine::new(RunConfig::builder().interval(3).build().unwrap())
            .run(&model, &obs, Semiring::SumProduct, &registry)
            .unwrap();
        assert_eq!(run.value().to_bits(), local.value().to_bits());
    }

    #[test]
    fn test_device_budget_exhausted() {
        let model = HiddenMarkovModel::weather();
        let registry = MetricsRegistry::new();
        let config = RunConfig::builder()
            .backend(BackendSelection::SimulatedAccelerator { memory_budget_kb: 1 })
            .build()
            .unwrap();
        let big = HiddenMarkovModel::new(
            vec![1.0 / 20.0; 20],
            vec![vec![1.0 / 20.0; 20]; 20],
            vec![vec![1.0]; 20],
        )
        .unwrap();
        let mut engine = SequentialEngine::new(config);
        let err = engine
            .run(&big, &[Observation::WALK; 4], Semiring::SumProduct, &registry)
            .unwrap_err();
        assert!(matches!(err, SrfError::Resource(_)));

        // The failed run released its device memory
        assert!(engine
            .run(&model, &reference_obs(), Semiring::SumProduct, &registry)
            .is_ok());
    }

    // ========================================================================
    // Validation and reconstruction
    // ========================================================================

    #[test]
    fn test_rejection_leaves_metrics_untouched() {
        let model = HiddenMarkovModel::weather();
        let registry = MetricsRegistry::new();
        registry.record_recompute(7);
        let err = engine(2)
            .run(&model, &[], Semiring::SumProduct, &registry)
            .unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(registry.snapshot().recompute_events, 7);
    }

    #[test]
    fn test_reconstruct_matches_full_table() {
        let model = HiddenMarkovModel::weather();
        let obs: Vec<_> = (0..12).map(|i| Observation::Symbol(i % 3)).collect();
        let registry = MetricsRegistry::new();
        let mut engine = engine(4);
        let run = engine.run(&model, &obs, Semiring::SumProduct, &registry).unwrap();
        let table = crate::baseline::forward_table(&model, &obs).unwrap();

        let before = registry.snapshot().recompute_events;
        for t in 0..obs.len() {
            let state = engine.reconstruct(&run, &model, &obs, t, &registry).unwrap();
            assert_eq!(state, table[t]);
        }
        // t mod 4 replayed steps per reconstruction
        let replayed: u64 = (0..12u64).map(|t| t % 4).sum();
        assert_eq!(registry.snapshot().recompute_events - before, replayed);

        assert!(engine.reconstruct(&run, &model, &obs, 12, &registry).is_err());
    }

    #[test]
    fn test_reconstruct_rejects_other_model() {
        let model = HiddenMarkovModel::weather();
        let obs = reference_obs();
        let registry = MetricsRegistry::new();
        let mut engine = engine(2);
        let run = engine.run(&model, &obs, Semiring::SumProduct, &registry).unwrap();

        let three_states = HiddenMarkovModel::new(
            vec![0.5, 0.3, 0.2],
            vec![vec![0.4, 0.3, 0.3]; 3],
            vec![vec![0.2, 0.3, 0.5]; 3],
        )
        .unwrap();
        let err = engine
            .reconstruct(&run, &three_states, &obs, 1, &registry)
            .unwrap_err();
        assert_eq!(
            err,
            SrfError::Instance(InstanceError::ShapeMismatch {
                field: "states",
                expected: 2,
                found: 3,
            })
        );

        let longer: Vec<_> = (0..9).map(|i| Observation::Symbol(i % 3)).collect();
        let err = engine.reconstruct(&run, &model, &longer, 1, &registry).unwrap_err();
        assert!(matches!(
            err,
            SrfError::Instance(InstanceError::ShapeMismatch {
                field: "checkpoint steps",
                ..
            })
        ));

        let bad_symbol = vec![Observation::WALK, Observation::Symbol(7), Observation::CLEAN];
        let err = engine.reconstruct(&run, &model, &bad_symbol, 1, &registry).unwrap_err();
        assert!(matches!(err, SrfError::Instance(InstanceError::SymbolOutOfRange { .. })));
    }
}
