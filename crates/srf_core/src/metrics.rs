//! Recompute metrics registry.
//!
//! [`MetricsRegistry`] is a block of counters with an explicit lifecycle:
//! [`reset`](MetricsRegistry::reset) at the start of a run, `record_*`
//! calls during the run, one [`snapshot`](MetricsRegistry::snapshot) at
//! the end to build the report.
//!
//! The registry is an ordinary value passed by reference into each run.
//! Runs that need isolation (for example concurrent benchmarks) each get
//! their own registry. All counters are atomics, so a single registry may
//! still be shared between threads safely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use crate::granularity::UnitId;

/// Counter values read at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Elements computed outside a checkpoint boundary, weighted by depth.
    pub recompute_events: u64,
    /// Peak working set in bytes.
    pub working_set_bytes: u64,
    /// Checkpoint/tile boundary hits.
    pub tile_reuse_count: u64,
    /// Sum of index distances between recomputed elements and their producers.
    pub total_dist_metric: u64,
    /// Transitions into a different granularity unit.
    pub unit_recompute_events: u64,
    /// Consecutive accesses that stayed in the same granularity unit.
    pub unit_reuse_proxy: u64,
    /// Elementary steps executed.
    pub compute_events: u64,
    /// Operands read by elementary steps.
    pub memory_access_proxy: u64,
    /// Dispatch overhead units charged by the backend.
    pub dispatch_overhead_proxy: u64,
}

/// Process-wide counter block for one run at a time.
///
/// # Example
///
/// ```rust
/// use srf_core::metrics::MetricsRegistry;
///
/// let registry = MetricsRegistry::new();
/// registry.record_recompute(2);
/// registry.update_working_set(512);
/// registry.update_working_set(128);
///
/// let snapshot = registry.snapshot();
/// assert_eq!(snapshot.recompute_events, 2);
/// assert_eq!(snapshot.working_set_bytes, 512);
///
/// registry.reset();
/// assert_eq!(registry.snapshot().recompute_events, 0);
/// ```
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    recompute_events: AtomicU64,
    working_set_bytes: AtomicU64,
    tile_reuse_count: AtomicU64,
    total_dist_metric: AtomicU64,
    unit_recompute_events: AtomicU64,
    unit_reuse_proxy: AtomicU64,
    compute_events: AtomicU64,
    memory_access_proxy: AtomicU64,
    dispatch_overhead_proxy: AtomicU64,
    last_unit: Mutex<Option<UnitId>>,
}

impl MetricsRegistry {
    /// Creates a registry with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes every counter and forgets the last-seen unit.
    pub fn reset(&self) {
        for counter in [
            &self.recompute_events,
            &self.working_set_bytes,
            &self.tile_reuse_count,
            &self.total_dist_metric,
            &self.unit_recompute_events,
            &self.unit_reuse_proxy,
            &self.compute_events,
            &self.memory_access_proxy,
            &self.dispatch_overhead_proxy,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.lock_last_unit() = None;
    }

    /// Records a recompute event weighted by `depth`.
    #[inline]
    pub fn record_recompute(&self, depth: u64) {
        self.recompute_events.fetch_add(depth, Ordering::Relaxed);
    }

    /// Raises the working-set high-water mark to `bytes` if larger.
    #[inline]
    pub fn update_working_set(&self, bytes: usize) {
        self.working_set_bytes
            .fetch_max(bytes as u64, Ordering::Relaxed);
    }

    /// Records a checkpoint/tile boundary hit.
    #[inline]
    pub fn record_tile_reuse(&self) {
        self.tile_reuse_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds an index distance to the locality proxy.
    #[inline]
    pub fn record_dist(&self, distance: u64) {
        self.total_dist_metric.fetch_add(distance, Ordering::Relaxed);
    }

    /// Attributes an access to a granularity unit.
    ///
    /// Counts a unit recompute when `unit` differs from the last-seen unit
    /// (or none was seen yet), and a unit reuse otherwise.
    pub fn record_unit(&self, unit: UnitId) {
        let mut last = self.lock_last_unit();
        if *last == Some(unit) {
            self.unit_reuse_proxy.fetch_add(1, Ordering::Relaxed);
        } else {
            self.unit_recompute_events.fetch_add(1, Ordering::Relaxed);
            *last = Some(unit);
        }
    }

    /// Records one elementary step reading `operands` values.
    #[inline]
    pub fn record_compute(&self, operands: usize) {
        self.compute_events.fetch_add(1, Ordering::Relaxed);
        self.memory_access_proxy
            .fetch_add(operands as u64, Ordering::Relaxed);
    }

    /// Adds backend dispatch overhead units.
    #[inline]
    pub fn record_dispatch(&self, cost: u64) {
        if cost > 0 {
            self.dispatch_overhead_proxy.fetch_add(cost, Ordering::Relaxed);
        }
    }

    /// Reads all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            recompute_events: self.recompute_events.load(Ordering::Relaxed),
            working_set_bytes: self.working_set_bytes.load(Ordering::Relaxed),
            tile_reuse_count: self.tile_reuse_count.load(Ordering::Relaxed),
            total_dist_metric: self.total_dist_metric.load(Ordering::Relaxed),
            unit_recompute_events: self.unit_recompute_events.load(Ordering::Relaxed),
            unit_reuse_proxy: self.unit_reuse_proxy.load(Ordering::Relaxed),
            compute_events: self.compute_events.load(Ordering::Relaxed),
            memory_access_proxy: self.memory_access_proxy.load(Ordering::Relaxed),
            dispatch_overhead_proxy: self.dispatch_overhead_proxy.load(Ordering::Relaxed),
        }
    }

    fn lock_last_unit(&self) -> std::sync::MutexGuard<'_, Option<UnitId>> {
        // The guarded value is a plain Option, so a poisoned lock is still usable.
        self.last_unit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::granularity::TileId;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_reset_is_idempotent() {
        let registry = MetricsRegistry::new();
        registry.reset();
        assert_eq!(registry.snapshot(), MetricsSnapshot::default());

        registry.record_recompute(3);
        registry.record_unit(UnitId::Linear(0));
        registry.reset();
        registry.reset();
        assert_eq!(registry.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_working_set_is_high_water_mark() {
        let registry = MetricsRegistry::new();
        registry.update_working_set(100);
        registry.update_working_set(300);
        registry.update_working_set(200);
        assert_eq!(registry.snapshot().working_set_bytes, 300);
    }

    #[test]
    fn test_unit_attribution() {
        let registry = MetricsRegistry::new();
        for unit in [0, 0, 0, 1, 1, 0] {
            registry.record_unit(UnitId::Linear(unit));
        }
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.unit_recompute_events, 3);
        assert_eq!(snapshot.unit_reuse_proxy, 3);
    }

    #[test]
    fn test_unit_attribution_after_reset_starts_fresh() {
        let registry = MetricsRegistry::new();
        registry.record_unit(UnitId::Linear(4));
        registry.reset();
        registry.record_unit(UnitId::Linear(4));
        assert_eq!(registry.snapshot().unit_recompute_events, 1);
        assert_eq!(registry.snapshot().unit_reuse_proxy, 0);
    }

    #[test]
    fn test_tile_units_compare_by_pair() {
        let registry = MetricsRegistry::new();
        registry.record_unit(UnitId::Tile(TileId { row: 0, col: 1 }));
        registry.record_unit(UnitId::Tile(TileId { row: 1, col: 0 }));
        assert_eq!(registry.snapshot().unit_recompute_events, 2);
    }

    #[test]
    fn test_compute_and_dispatch() {
        let registry = MetricsRegistry::new();
        registry.record_compute(3);
        registry.record_compute(2);
        registry.record_dispatch(0);
        registry.record_dispatch(1);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.compute_events, 2);
        assert_eq!(snapshot.memory_access_proxy, 5);
        assert_eq!(snapshot.dispatch_overhead_proxy, 1);
    }

    #[test]
    fn test_concurrent_increments() {
        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        registry.record_recompute(1);
                        registry.record_dist(2);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.recompute_events, 4000);
        assert_eq!(snapshot.total_dist_metric, 8000);
    }
}
