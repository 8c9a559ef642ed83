//! Local (host) backend.

use num_traits::Float;

use super::kernels::{self, Semiring};
use super::{check_transfer, BackendKind, BackendMetrics, ComputeBackend, DeviceBuffer};
use crate::error::SrfResult;

/// Executes transitions immediately on the host.
///
/// Device memory is ordinary host memory and transfers are plain copies
/// with zero simulated cost. All counters stay at zero.
#[derive(Clone, Debug, Default)]
pub struct LocalBackend;

impl LocalBackend {
    /// Creates a local backend.
    pub fn new() -> Self {
        Self
    }
}

impl ComputeBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    #[inline]
    fn sequential_step<T: Float>(&mut self, semiring: Semiring, prev: &[T], trans_col: &[T], emission: T) -> T {
        kernels::sequential_step(semiring, prev, trans_col, emission)
    }

    #[inline]
    fn grid_cell(&mut self, diag: i64, above: i64, left: i64, match_score: i64, gap: i64) -> i64 {
        kernels::grid_cell(diag, above, left, match_score, gap)
    }

    #[inline]
    fn graph_relax(&mut self, pred_dists: &[i64], weights: &[i64]) -> i64 {
        kernels::graph_relax(pred_dists, weights)
    }

    fn device_alloc<T: Copy + Default>(&mut self, len: usize) -> SrfResult<DeviceBuffer<T>> {
        DeviceBuffer::zeroed(len)
    }

    fn device_free<T>(&mut self, buffer: DeviceBuffer<T>) {
        drop(buffer);
    }

    fn copy_to_device<T: Copy>(&mut self, dst: &mut DeviceBuffer<T>, src: &[T]) -> SrfResult<()> {
        check_transfer(dst.len(), src.len())?;
        dst.as_mut_slice().copy_from_slice(src);
        Ok(())
    }

    fn copy_to_host<T: Copy>(&mut self, dst: &mut [T], src: &DeviceBuffer<T>) -> SrfResult<()> {
        check_transfer(dst.len(), src.len())?;
        dst.copy_from_slice(src.as_slice());
        Ok(())
    }

    fn dispatch_cost(&self) -> u64 {
        0
    }

    fn metrics(&self) -> BackendMetrics {
        BackendMetrics::default()
    }

    fn reset_metrics(&mut self) {}
}
