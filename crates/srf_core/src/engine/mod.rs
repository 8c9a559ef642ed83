//! Recompute engines, one per DP topology.
//!
//! Every engine follows the same state machine:
//!
//! ```text
//! Init -> Step(t) -> [Checkpoint | Recompute] -> Step(t+1) -> ... -> Terminate
//! ```
//!
//! Validation happens in `Init`, before the metrics registry and backend
//! counters are reset. After that a run cannot be rejected; it either
//! completes or fails with a resource error.
//!
//! Each engine owns one [`Backend`](crate::backend::Backend), created from
//! the configuration when the engine is constructed. The problem instance
//! is staged onto the device once per run, and every persisted checkpoint
//! is copied back to host storage.

mod dag;
mod grid;
mod report;
mod sequential;

pub use dag::{DagEngine, DagRun};
pub use grid::{GridEngine, GridRun, GridStorage};
pub use report::{RunReport, RunValue, Topology};
pub use sequential::{SequentialEngine, SequentialRun};

use std::time::Instant;

use crate::backend::{Backend, ComputeBackend, DeviceBuffer};
use crate::checkpoint::{alloc_state, CheckpointTable, StateVector};
use crate::config::RunConfig;
use crate::error::SrfResult;
use crate::metrics::MetricsRegistry;

/// Allocates a device buffer and copies `data` into it.
fn stage<T: Copy + Default>(backend: &mut Backend, data: &[T]) -> SrfResult<DeviceBuffer<T>> {
    let mut buffer = backend.device_alloc(data.len())?;
    if let Err(e) = backend.copy_to_device(&mut buffer, data) {
        backend.device_free(buffer);
        return Err(e);
    }
    Ok(buffer)
}

/// Moves checkpointed states from the device into a [`CheckpointTable`].
struct CheckpointSink<T> {
    device: DeviceBuffer<T>,
    host: StateVector<T>,
}

impl<T: Copy + Default> CheckpointSink<T> {
    fn new(backend: &mut Backend, lanes: usize) -> SrfResult<Self> {
        let host = alloc_state(lanes, T::default())?;
        let device = backend.device_alloc(lanes)?;
        Ok(Self { device, host })
    }

    /// Copies `state` to host memory and persists it in `slot`.
    fn persist(
        &mut self,
        backend: &mut Backend,
        table: &mut CheckpointTable<T>,
        slot: usize,
        state: &[T],
    ) -> SrfResult<()> {
        // The state is produced in device memory.
        self.device.as_mut_slice().copy_from_slice(state);
        backend.copy_to_host(&mut self.host, &self.device)?;
        table.write(slot, &self.host)
    }

    fn release(self, backend: &mut Backend) {
        backend.device_free(self.device);
    }
}

/// Run bookkeeping shared by all engines.
struct RunClock {
    started: Instant,
}

impl RunClock {
    /// Resets run state and starts timing. Call only after validation.
    fn start(backend: &mut Backend, registry: &MetricsRegistry) -> Self {
        registry.reset();
        backend.reset_metrics();
        Self {
            started: Instant::now(),
        }
    }

    fn elapsed_us(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Fields every report shares, filled in when a run terminates.
struct ReportContext<'a> {
    config: &'a RunConfig,
    backend: &'a Backend,
    registry: &'a MetricsRegistry,
    clock: RunClock,
}

impl ReportContext<'_> {
    fn finish(
        self,
        topology: Topology,
        variant: &'static str,
        value: RunValue,
        domain_len: usize,
        effective_interval: usize,
        checkpoints_written: usize,
    ) -> RunReport {
        RunReport {
            topology,
            variant,
            value,
            domain_len,
            effective_interval,
            checkpoints_written,
            metrics: self.registry.snapshot(),
            backend: self.backend.kind(),
            backend_metrics: self.backend.metrics(),
            config: self.config.clone(),
            elapsed_us: self.clock.elapsed_us(),
        }
    }
}
