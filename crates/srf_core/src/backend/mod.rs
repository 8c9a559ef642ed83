//! Compute backends.
//!
//! A backend executes one elementary DP transition at a time and moves
//! data between host and (simulated) device memory. Exactly two variants
//! exist, modelled as the [`Backend`] sum type:
//!
//! - [`LocalBackend`]: immediate host execution, zero transfer cost
//! - [`SimulatedAccelerator`]: same arithmetic, plus a cost model for
//!   transfers, kernel launches and a device memory budget
//!
//! The variant is chosen once per run from an explicit
//! [`BackendSelection`]; it is never re-resolved per call.
//!
//! # Example
//!
//! ```rust
//! use srf_core::backend::{BackendSelection, ComputeBackend};
//!
//! let mut backend = BackendSelection::from_toggles(false, true, 1024).instantiate();
//! assert_eq!(backend.grid_cell(0, 0, 0, 1, -1), 1);
//! assert_eq!(backend.metrics().kernel_launch_count, 1);
//! ```

mod accelerator;
mod kernels;
mod local;

pub use accelerator::{SimulatedAccelerator, TRANSFER_COST_US};
pub use kernels::{graph_relax, grid_cell, sequential_step, Semiring, UNREACHABLE};
pub use local::LocalBackend;

use num_traits::Float;
use serde::Serialize;
use tracing::debug;

use crate::error::{ResourceError, SrfResult};

/// Backend variant identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Immediate host execution.
    Local,
    /// Cost-model simulation of an offload accelerator.
    SimulatedAccelerator,
}

impl BackendKind {
    /// Returns the name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::SimulatedAccelerator => "simulated-accelerator",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-local counters, reset per run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackendMetrics {
    /// Simulated transfer time in microseconds.
    pub transfer_overhead_us: u64,
    /// Number of elementary-step dispatches.
    pub kernel_launch_count: u64,
    /// Device memory budget in KB (0 = unlimited or not applicable).
    pub device_memory_budget_kb: usize,
}

/// Explicit backend choice for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendSelection {
    /// Use the local backend.
    #[default]
    Local,
    /// Use the simulated accelerator with a device memory budget.
    SimulatedAccelerator {
        /// Device memory budget in KB (0 = unlimited).
        memory_budget_kb: usize,
    },
}

impl BackendSelection {
    /// Resolves the two external toggles.
    ///
    /// Force-local takes precedence over force-accelerator; with neither
    /// set the local backend is used.
    pub fn from_toggles(force_local: bool, force_accelerator: bool, memory_budget_kb: usize) -> Self {
        if force_local {
            BackendSelection::Local
        } else if force_accelerator {
            BackendSelection::SimulatedAccelerator { memory_budget_kb }
        } else {
            BackendSelection::Local
        }
    }

    /// Returns the variant this selection produces.
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendSelection::Local => BackendKind::Local,
            BackendSelection::SimulatedAccelerator { .. } => BackendKind::SimulatedAccelerator,
        }
    }

    /// Creates the backend.
    pub fn instantiate(&self) -> Backend {
        debug!(backend = %self.kind(), "instantiating backend");
        match *self {
            BackendSelection::Local => Backend::Local(LocalBackend::new()),
            BackendSelection::SimulatedAccelerator { memory_budget_kb } => {
                Backend::SimulatedAccelerator(SimulatedAccelerator::new(memory_budget_kb))
            }
        }
    }
}

/// Buffer in (simulated) device memory.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceBuffer<T> {
    data: Vec<T>,
}

impl<T: Copy + Default> DeviceBuffer<T> {
    fn zeroed(len: usize) -> SrfResult<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| ResourceError::AllocationFailed {
                what: "device buffer",
                bytes: len.saturating_mul(std::mem::size_of::<T>()),
            })?;
        data.resize(len, T::default());
        Ok(Self { data })
    }
}

impl<T> DeviceBuffer<T> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size in bytes.
    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(self.data.as_slice())
    }

    /// Device-side view of the contents.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable device-side view of the contents.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

fn check_transfer(expected: usize, actual: usize) -> SrfResult<()> {
    if expected != actual {
        return Err(ResourceError::TransferSizeMismatch { expected, actual }.into());
    }
    Ok(())
}

/// Operations every backend provides.
pub trait ComputeBackend {
    /// Returns the variant identifier.
    fn kind(&self) -> BackendKind;

    /// One lane of a sequential (HMM) step.
    fn sequential_step<T: Float>(&mut self, semiring: Semiring, prev: &[T], trans_col: &[T], emission: T) -> T;

    /// One alignment cell.
    fn grid_cell(&mut self, diag: i64, above: i64, left: i64, match_score: i64, gap: i64) -> i64;

    /// One graph relaxation.
    fn graph_relax(&mut self, pred_dists: &[i64], weights: &[i64]) -> i64;

    /// Allocates a zeroed device buffer of `len` elements.
    fn device_alloc<T: Copy + Default>(&mut self, len: usize) -> SrfResult<DeviceBuffer<T>>;

    /// Releases a device buffer.
    fn device_free<T>(&mut self, buffer: DeviceBuffer<T>);

    /// Copies host data into a device buffer of the same length.
    fn copy_to_device<T: Copy>(&mut self, dst: &mut DeviceBuffer<T>, src: &[T]) -> SrfResult<()>;

    /// Copies a device buffer into host memory of the same length.
    fn copy_to_host<T: Copy>(&mut self, dst: &mut [T], src: &DeviceBuffer<T>) -> SrfResult<()>;

    /// Per-dispatch overhead units charged by this backend.
    fn dispatch_cost(&self) -> u64;

    /// Returns the backend counters.
    fn metrics(&self) -> BackendMetrics;

    /// Zeroes the backend counters, keeping the device budget.
    fn reset_metrics(&mut self);
}

/// The two backend variants.
#[derive(Clone, Debug)]
pub enum Backend {
    /// Immediate host execution.
    Local(LocalBackend),
    /// Simulated offload accelerator.
    SimulatedAccelerator(SimulatedAccelerator),
}

impl ComputeBackend for Backend {
    fn kind(&self) -> BackendKind {
        match self {
            Backend::Local(b) => b.kind(),
            Backend::SimulatedAccelerator(b) => b.kind(),
        }
    }

    #[inline]
    fn sequential_step<T: Float>(&mut self, semiring: Semiring, prev: &[T], trans_col: &[T], emission: T) -> T {
        match self {
            Backend::Local(b) => b.sequential_step(semiring, prev, trans_col, emission),
            Backend::SimulatedAccelerator(b) => b.sequential_step(semiring, prev, trans_col, emission),
        }
    }

    #[inline]
    fn grid_cell(&mut self, diag: i64, above: i64, left: i64, match_score: i64, gap: i64) -> i64 {
        match self {
            Backend::Local(b) => b.grid_cell(diag, above, left, match_score, gap),
            Backend::SimulatedAccelerator(b) => b.grid_cell(diag, above, left, match_score, gap),
        }
    }

    #[inline]
    fn graph_relax(&mut self, pred_dists: &[i64], weights: &[i64]) -> i64 {
        match self {
            Backend::Local(b) => b.graph_relax(pred_dists, weights),
            Backend::SimulatedAccelerator(b) => b.graph_relax(pred_dists, weights),
        }
    }

    fn device_alloc<T: Copy + Default>(&mut self, len: usize) -> SrfResult<DeviceBuffer<T>> {
        match self {
            Backend::Local(b) => b.device_alloc(len),
            Backend::SimulatedAccelerator(b) => b.device_alloc(len),
        }
    }

    fn device_free<T>(&mut self, buffer: DeviceBuffer<T>) {
        match self {
            Backend::Local(b) => b.device_free(buffer),
            Backend::SimulatedAccelerator(b) => b.device_free(buffer),
        }
    }

    fn copy_to_device<T: Copy>(&mut self, dst: &mut DeviceBuffer<T>, src: &[T]) -> SrfResult<()> {
        match self {
            Backend::Local(b) => b.copy_to_device(dst, src),
            Backend::SimulatedAccelerator(b) => b.copy_to_device(dst, src),
        }
    }

    fn copy_to_host<T: Copy>(&mut self, dst: &mut [T], src: &DeviceBuffer<T>) -> SrfResult<()> {
        match self {
            Backend::Local(b) => b.copy_to_host(dst, src),
            Backend::SimulatedAccelerator(b) => b.copy_to_host(dst, src),
        }
    }

    fn dispatch_cost(&self) -> u64 {
        match self {
            Backend::Local(b) => b.dispatch_cost(),
            Backend::SimulatedAccelerator(b) => b.dispatch_cost(),
        }
    }

    fn metrics(&self) -> BackendMetrics {
        match self {
            Backend::Local(b) => b.metrics(),
            Backend::SimulatedAccelerator(b) => b.metrics(),
        }
    }

    fn reset_metrics(&mut self) {
        match self {
            Backend::Local(b) => b.reset_metrics(),
            Backend::SimulatedAccelerator(b) => b.reset_metrics(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SrfError;

    #[test]
    fn test_force_local_wins() {
        let selection = BackendSelection::from_toggles(true, true, 512);
        assert_eq!(selection, BackendSelection::Local);
    }

    #[test]
    fn test_force_accelerator() {
        let selection = BackendSelection::from_toggles(false, true, 512);
        assert_eq!(
            selection,
            BackendSelection::SimulatedAccelerator {
                memory_budget_kb: 512
            }
        );
        assert_eq!(selection.kind(), BackendKind::SimulatedAccelerator);
    }

    #[test]
    fn test_default_is_local() {
        assert_eq!(BackendSelection::from_toggles(false, false, 512), BackendSelection::Local);
        assert_eq!(BackendSelection::default().kind(), BackendKind::Local);
    }

    #[test]
    fn test_backends_agree_on_primitives() {
        let mut local = BackendSelection::Local.instantiate();
        let mut accel = BackendSelection::SimulatedAccelerator {
            memory_budget_kb: 0,
        }
        .instantiate();

        let prev = [0.3f64, 0.7];
        let col = [0.2, 0.9];
        for semiring in [Semiring::SumProduct, Semiring::MaxProduct] {
            assert_eq!(
                local.sequential_step(semiring, &prev, &col, 0.5).to_bits(),
                accel.sequential_step(semiring, &prev, &col, 0.5).to_bits()
            );
        }
        assert_eq!(local.grid_cell(3, 1, 2, -1, -2), accel.grid_cell(3, 1, 2, -1, -2));
        assert_eq!(local.graph_relax(&[1, 4], &[2, 0]), accel.graph_relax(&[1, 4], &[2, 0]));
    }

    #[test]
    fn test_device_buffer_round_trip() {
        let mut backend = BackendSelection::Local.instantiate();
        let mut buffer = backend.device_alloc::<i64>(3).unwrap();
        backend.copy_to_device(&mut buffer, &[1, 2, 3]).unwrap();

        let mut host = [0i64; 3];
        backend.copy_to_host(&mut host, &buffer).unwrap();
        assert_eq!(host, [1, 2, 3]);
        assert_eq!(buffer.byte_len(), 24);
        backend.device_free(buffer);
    }

    #[test]
    fn test_transfer_size_mismatch() {
        let mut backend = BackendSelection::Local.instantiate();
        let mut buffer = backend.device_alloc::<i64>(2).unwrap();
        let err = backend.copy_to_device(&mut buffer, &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            SrfError::Resource(ResourceError::TransferSizeMismatch {
                expected: 2,
                actual: 3
            })
        );
    }
}
