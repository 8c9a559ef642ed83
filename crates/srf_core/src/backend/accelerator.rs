//! Simulated accelerator backend.
//!
//! Performs the same arithmetic as the local backend and annotates it with
//! the costs of a real offload path: every elementary step is a kernel
//! launch, every host/device copy costs [`TRANSFER_COST_US`], and device
//! allocations are checked against a fixed memory budget. Nothing is
//! dispatched to another execution context.

use num_traits::Float;

use super::kernels::{self, Semiring};
use super::{check_transfer, BackendKind, BackendMetrics, ComputeBackend, DeviceBuffer};
use crate::error::{ResourceError, SrfResult};

/// Simulated cost of one host/device copy, in microseconds.
pub const TRANSFER_COST_US: u64 = 10;

/// Cost-model accelerator.
///
/// # Example
///
/// ```rust
/// use srf_core::backend::{ComputeBackend, SimulatedAccelerator, TRANSFER_COST_US};
///
/// let mut accel = SimulatedAccelerator::new(1);
/// let mut buffer = accel.device_alloc::<f64>(4).unwrap();
/// accel.copy_to_device(&mut buffer, &[1.0; 4]).unwrap();
/// assert_eq!(accel.metrics().transfer_overhead_us, TRANSFER_COST_US);
///
/// // 1 KB budget: a second 1 KB buffer does not fit
/// assert!(accel.device_alloc::<u8>(1024).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct SimulatedAccelerator {
    metrics: BackendMetrics,
    allocated_bytes: usize,
}

impl SimulatedAccelerator {
    /// Creates an accelerator with a device memory budget in KB (0 = unlimited).
    pub fn new(memory_budget_kb: usize) -> Self {
        Self {
            metrics: BackendMetrics {
                device_memory_budget_kb: memory_budget_kb,
                ..BackendMetrics::default()
            },
            allocated_bytes: 0,
        }
    }

    /// Bytes currently allocated on the device.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    fn budget_bytes(&self) -> Option<usize> {
        match self.metrics.device_memory_budget_kb {
            0 => None,
            kb => Some(kb.saturating_mul(1024)),
        }
    }

    #[inline]
    fn launch(&mut self) {
        self.metrics.kernel_launch_count += 1;
    }
}

impl ComputeBackend for SimulatedAccelerator {
    fn kind(&self) -> BackendKind {
        BackendKind::SimulatedAccelerator
    }

    #[inline]
    fn sequential_step<T: Float>(&mut self, semiring: Semiring, prev: &[T], trans_col: &[T], emission: T) -> T {
        self.launch();
        kernels::sequential_step(semiring, prev, trans_col, emission)
    }

    #[inline]
    fn grid_cell(&mut self, diag: i64, above: i64, left: i64, match_score: i64, gap: i64) -> i64 {
        self.launch();
        kernels::grid_cell(diag, above, left, match_score, gap)
    }

    #[inline]
    fn graph_relax(&mut self, pred_dists: &[i64], weights: &[i64]) -> i64 {
        self.launch();
        kernels::graph_relax(pred_dists, weights)
    }

    fn device_alloc<T: Copy + Default>(&mut self, len: usize) -> SrfResult<DeviceBuffer<T>> {
        let requested = len.saturating_mul(std::mem::size_of::<T>());
        if let Some(budget) = self.budget_bytes() {
            let available = budget.saturating_sub(self.allocated_bytes);
            if requested > available {
                return Err(ResourceError::DeviceMemoryExhausted {
                    requested,
                    available,
                }
                .into());
            }
        }
        let buffer = DeviceBuffer::zeroed(len)?;
        self.allocated_bytes += requested;
        Ok(buffer)
    }

    fn device_free<T>(&mut self, buffer: DeviceBuffer<T>) {
        self.allocated_bytes = self.allocated_bytes.saturating_sub(buffer.byte_len());
    }

    fn copy_to_device<T: Copy>(&mut self, dst: &mut DeviceBuffer<T>, src: &[T]) -> SrfResult<()> {
        check_transfer(dst.len(), src.len())?;
        self.metrics.transfer_overhead_us += TRANSFER_COST_US;
        dst.as_mut_slice().copy_from_slice(src);
        Ok(())
    }

    fn copy_to_host<T: Copy>(&mut self, dst: &mut [T], src: &DeviceBuffer<T>) -> SrfResult<()> {
        check_transfer(dst.len(), src.len())?;
        self.metrics.transfer_overhead_us += TRANSFER_COST_US;
        dst.copy_from_slice(src.as_slice());
        Ok(())
    }

    fn dispatch_cost(&self) -> u64 {
        1
    }

    fn metrics(&self) -> BackendMetrics {
        self.metrics
    }

    fn reset_metrics(&mut self) {
        self.metrics = BackendMetrics {
            device_memory_budget_kb: self.metrics.device_memory_budget_kb,
            ..BackendMetrics::default()
        };
    }
}
