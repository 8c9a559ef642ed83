//! Grid (Needleman-Wunsch) recompute engine.

use serde::Serialize;
use tracing::{debug, info};

use super::{stage, CheckpointSink, ReportContext, RunClock, RunReport, RunValue, Topology};
use crate::backend::{Backend, ComputeBackend};
use crate::checkpoint::{alloc_state, CheckpointScheduler, CheckpointTable, StateVector};
use crate::config::RunConfig;
use crate::error::{CheckpointError, ConfigError, InstanceError, SrfResult};
use crate::granularity::{GranularityKind, GranularityPolicy};
use crate::metrics::MetricsRegistry;
use crate::problem::{AlignmentPair, Scoring};

/// How many grid rows a run keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridStorage {
    /// Two working rows plus every checkpoint row (`i mod B == 0`).
    #[default]
    CheckpointRows,
    /// Two working lines only. Cells are still classified against `B`.
    ///
    /// The sweep runs along the longer string, so each line holds
    /// `min(n, m) + 1` cells. Tile reuse counts the checkpoint lines of
    /// that sweep.
    TwoRow,
}

/// Result of a grid run.
#[derive(Clone, Debug)]
pub struct GridRun {
    /// Run report.
    pub report: RunReport,
    /// Alignment score (last cell of the last row).
    pub score: i64,
    /// Persisted rows, `None` for [`GridStorage::TwoRow`].
    pub checkpoints: Option<CheckpointTable<i64>>,
    scheduler: CheckpointScheduler,
    scoring: Scoring,
}

impl GridRun {
    /// Scheduler that classified the cells.
    pub fn scheduler(&self) -> CheckpointScheduler {
        self.scheduler
    }

    /// Scoring scheme the run was computed with.
    pub fn scoring(&self) -> Scoring {
        self.scoring
    }
}

/// Global alignment engine.
///
/// # Example
///
/// ```rust
/// use srf_core::config::RunConfig;
/// use srf_core::engine::{GridEngine, GridStorage};
/// use srf_core::metrics::MetricsRegistry;
/// use srf_core::problem::AlignmentPair;
///
/// let pair = AlignmentPair::new("GATTACA", "GCATGCU").unwrap();
/// let registry = MetricsRegistry::new();
/// let config = RunConfig::builder().interval(3).build().unwrap();
///
/// let mut engine = GridEngine::new(config).with_storage(GridStorage::TwoRow);
/// let run = engine.run(&pair, &registry).unwrap();
/// assert_eq!(run.score, 0);
/// assert!(run.checkpoints.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct GridEngine {
    config: RunConfig,
    backend: Backend,
    scoring: Scoring,
    storage: GridStorage,
}

impl GridEngine {
    /// Creates an engine with default scoring and checkpoint-row storage.
    pub fn new(config: RunConfig) -> Self {
        let backend = config.backend().instantiate();
        Self {
            config,
            backend,
            scoring: Scoring::default(),
            storage: GridStorage::default(),
        }
    }

    /// Replaces the scoring scheme.
    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Replaces the row storage mode.
    pub fn with_storage(mut self, storage: GridStorage) -> Self {
        self.storage = storage;
        self
    }

    /// Scoring scheme.
    pub fn scoring(&self) -> Scoring {
        self.scoring
    }

    /// Aligns `pair`, returning the global alignment score.
    ///
    /// # Errors
    ///
    /// - `ConfigError` before any metrics are reset
    /// - `ResourceError` if row storage or device memory cannot be allocated
    pub fn run(&mut self, pair: &AlignmentPair, registry: &MetricsRegistry) -> SrfResult<GridRun> {
        let scheduler = self.config.scheduler(std::mem::size_of::<i64>())?;
        let policy = self.config.granularity_policy(GranularityKind::Tile)?;

        let clock = RunClock::start(&mut self.backend, registry);
        info!(
            topology = "grid",
            rows = pair.rows(),
            cols = pair.cols(),
            interval = scheduler.effective_interval(),
            storage = ?self.storage,
            backend = %self.backend.kind(),
            "starting run"
        );

        let mut symbols = Vec::with_capacity(pair.rows() + pair.cols());
        symbols.extend_from_slice(pair.a());
        symbols.extend_from_slice(pair.b());
        let staged = stage(&mut self.backend, &symbols)?;
        let mut sink = match CheckpointSink::new(&mut self.backend, pair.cols() + 1) {
            Ok(sink) => sink,
            Err(e) => {
                self.backend.device_free(staged);
                return Err(e);
            }
        };

        let sweep = Sweep {
            pair,
            scoring: self.scoring,
            storage: self.storage,
            scheduler: &scheduler,
            policy: &policy,
            registry,
        };
        let outcome = sweep.run(&mut self.backend, &mut sink);
        sink.release(&mut self.backend);
        self.backend.device_free(staged);
        let (score, checkpoints) = outcome?;

        let report = ReportContext {
            config: &self.config,
            backend: &self.backend,
            registry,
            clock,
        }
        .finish(
            Topology::Grid,
            "needleman-wunsch",
            RunValue::Score(score),
            pair.rows() + 1,
            scheduler.effective_interval(),
            checkpoints.as_ref().map_or(0, |t| t.written_count()),
        );
        info!(
            result = score,
            recompute_events = report.metrics.recompute_events,
            elapsed_us = report.elapsed_us,
            "run finished"
        );

        Ok(GridRun {
            report,
            score,
            checkpoints,
            scheduler,
            scoring: self.scoring,
        })
    }

    /// Rebuilds row `i` of a finished [`GridStorage::CheckpointRows`] run.
    ///
    /// Restores the nearest checkpoint row at or before `i` and recomputes
    /// forward with the run's own scoring; every replayed cell is recorded
    /// as a recompute event.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` if `i` is outside the grid or the
    ///   run kept no checkpoint rows
    /// - `InstanceError::ShapeMismatch` if `pair` is not the aligned pair's shape
    /// - `CheckpointError::NotFound` if no checkpoint row precedes `i`
    pub fn reconstruct_row(
        &mut self,
        run: &GridRun,
        pair: &AlignmentPair,
        i: usize,
        registry: &MetricsRegistry,
    ) -> SrfResult<StateVector<i64>> {
        let table = run.checkpoints.as_ref().ok_or_else(|| ConfigError::InvalidParameter {
            name: "storage",
            value: "two-row runs keep no checkpoint rows".to_string(),
        })?;
        let scheduler = run.scheduler;
        if table.lanes() != pair.cols() + 1 {
            return Err(InstanceError::ShapeMismatch {
                field: "alignment columns",
                expected: table.lanes(),
                found: pair.cols() + 1,
            }
            .into());
        }
        let row_slots = scheduler.slot_count(pair.rows() + 1);
        if table.capacity() != row_slots {
            return Err(InstanceError::ShapeMismatch {
                field: "checkpoint rows",
                expected: table.capacity(),
                found: row_slots,
            }
            .into());
        }
        if i > pair.rows() {
            return Err(ConfigError::InvalidParameter {
                name: "row",
                value: format!("{} outside grid of {} rows", i, pair.rows() + 1),
            }
            .into());
        }
        let scoring = run.scoring;
        let slot = table
            .nearest_before(scheduler.slot(i))
            .ok_or(CheckpointError::NotFound {
                slot: scheduler.slot(i),
            })?;
        let origin = scheduler.slot_start(slot);
        let mut prev = table.restore(slot)?.to_vec();
        let mut curr = alloc_state(prev.len(), 0i64)?;
        debug!(row = i, origin, "reconstructing row");

        for row in origin + 1..=i {
            curr[0] = scoring.gap_run(row);
            for col in 1..curr.len() {
                registry.record_recompute(1);
                registry.record_dist((row - origin) as u64);
                curr[col] = fill_cell(
                    &mut self.backend,
                    &scoring,
                    pair.substitution(row, col, &scoring),
                    [prev[col - 1], prev[col], curr[col - 1]],
                    registry,
                );
            }
            std::mem::swap(&mut prev, &mut curr);
        }
        Ok(prev)
    }
}

/// Computes one cell from its `[diag, above, left]` neighbours.
fn fill_cell(
    backend: &mut Backend,
    scoring: &Scoring,
    substitution: i64,
    [diag, above, left]: [i64; 3],
    registry: &MetricsRegistry,
) -> i64 {
    let value = backend.grid_cell(diag, above, left, substitution, scoring.gap);
    registry.record_compute(3);
    registry.record_dispatch(backend.dispatch_cost());
    value
}

struct Sweep<'a> {
    pair: &'a AlignmentPair,
    scoring: Scoring,
    storage: GridStorage,
    scheduler: &'a CheckpointScheduler,
    policy: &'a GranularityPolicy,
    registry: &'a MetricsRegistry,
}

impl Sweep<'_> {
    fn run(
        &self,
        backend: &mut Backend,
        sink: &mut CheckpointSink<i64>,
    ) -> SrfResult<(i64, Option<CheckpointTable<i64>>)> {
        match self.storage {
            GridStorage::CheckpointRows => {
                let (score, table) = self.checkpoint_rows(backend, sink)?;
                Ok((score, Some(table)))
            }
            GridStorage::TwoRow => Ok((self.two_lines(backend)?, None)),
        }
    }

    fn checkpoint_rows(
        &self,
        backend: &mut Backend,
        sink: &mut CheckpointSink<i64>,
    ) -> SrfResult<(i64, CheckpointTable<i64>)> {
        let rows = self.pair.rows();
        let width = self.pair.cols() + 1;
        let row_bytes = width * std::mem::size_of::<i64>();
        let mut table = CheckpointTable::with_slots(self.scheduler.slot_count(rows + 1), width)?;

        let mut prev = alloc_state(width, 0i64)?;
        let mut curr = alloc_state(width, 0i64)?;
        for (j, cell) in prev.iter_mut().enumerate() {
            *cell = self.scoring.gap_run(j);
        }
        self.checkpoint_row(backend, sink, &mut table, 0, &prev)?;
        self.registry.update_working_set(2 * row_bytes + table.memory_usage());

        for i in 1..=rows {
            curr[0] = self.scoring.gap_run(i);
            for j in 1..width {
                curr[j] = self.cell(backend, i, j, [prev[j - 1], prev[j], curr[j - 1]]);
            }
            std::mem::swap(&mut prev, &mut curr);

            if self.scheduler.is_checkpoint(i) {
                self.checkpoint_row(backend, sink, &mut table, i, &prev)?;
                self.registry.update_working_set(2 * row_bytes + table.memory_usage());
            }
        }
        Ok((prev[width - 1], table))
    }

    /// Two-line sweep along the longer string. Line `o` covers row `o`, or
    /// column `o` when `b` is the longer string.
    fn two_lines(&self, backend: &mut Backend) -> SrfResult<i64> {
        let (rows, cols) = (self.pair.rows(), self.pair.cols());
        let by_column = cols > rows;
        let (outer, width) = if by_column { (cols, rows + 1) } else { (rows, cols + 1) };
        self.registry.update_working_set(2 * width * std::mem::size_of::<i64>());

        let mut prev = alloc_state(width, 0i64)?;
        let mut curr = alloc_state(width, 0i64)?;
        for (k, cell) in prev.iter_mut().enumerate() {
            *cell = self.scoring.gap_run(k);
        }
        self.registry.record_tile_reuse();

        for o in 1..=outer {
            curr[0] = self.scoring.gap_run(o);
            for k in 1..width {
                let (i, j) = if by_column { (k, o) } else { (o, k) };
                // The recurrence is symmetric in `above` and `left`.
                curr[k] = self.cell(backend, i, j, [prev[k - 1], prev[k], curr[k - 1]]);
            }
            std::mem::swap(&mut prev, &mut curr);

            if self.scheduler.is_checkpoint(o) {
                self.registry.record_tile_reuse();
            }
        }
        Ok(prev[width - 1])
    }

    /// Classifies and computes cell `(i, j)`.
    fn cell(&self, backend: &mut Backend, i: usize, j: usize, neighbours: [i64; 3]) -> i64 {
        let interval = self.scheduler.effective_interval();
        self.registry.record_unit(self.policy.tile(i, j));
        if !self.scheduler.is_checkpoint_2d(i, j) {
            self.registry.record_recompute(1);
            self.registry.record_dist(((i % interval) + (j % interval)) as u64);
        }
        fill_cell(
            backend,
            &self.scoring,
            self.pair.substitution(i, j, &self.scoring),
            neighbours,
            self.registry,
        )
    }

    fn checkpoint_row(
        &self,
        backend: &mut Backend,
        sink: &mut CheckpointSink<i64>,
        table: &mut CheckpointTable<i64>,
        row: usize,
        state: &[i64],
    ) -> SrfResult<()> {
        self.registry.record_tile_reuse();
        let slot = self.scheduler.slot(row);
        sink.persist(backend, table, slot, state)?;
        debug!(row, slot, "checkpoint row written");
        Ok(())
    }
}
