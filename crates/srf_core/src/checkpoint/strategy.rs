//! Checkpoint scheduling.
//!
//! The scheduler decides whether the state computed at an index is
//! persisted. It never decides whether the state is computed: every state
//! is produced, and the ones that are not persisted are only reachable
//! later by recomputing forward from the nearest earlier checkpoint.

use serde::Serialize;
use tracing::warn;

use crate::error::{ConfigError, SrfResult};

/// How the configured interval is turned into the effective interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// Use the interval as given.
    #[default]
    Fixed,

    /// Locality-aware mode: halve the interval to shorten recompute chains.
    ///
    /// `K_eff = K / 2` if `K > 4`, otherwise `K_eff = 2`.
    Locality,
}

/// Decides which DP indices are checkpoints.
///
/// # Examples
///
/// ```
/// use srf_core::checkpoint::{CheckpointScheduler, ScheduleMode};
///
/// let scheduler = CheckpointScheduler::new(10, ScheduleMode::Fixed).unwrap();
/// assert!(scheduler.is_checkpoint(0));
/// assert!(!scheduler.is_checkpoint(5));
/// assert!(scheduler.is_checkpoint(10));
///
/// let locality = CheckpointScheduler::new(10, ScheduleMode::Locality).unwrap();
/// assert_eq!(locality.effective_interval(), 5);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckpointScheduler {
    interval: usize,
    effective: usize,
    mode: ScheduleMode,
}

impl CheckpointScheduler {
    /// Creates a scheduler with interval `K`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidInterval` if `interval == 0`.
    pub fn new(interval: usize, mode: ScheduleMode) -> SrfResult<Self> {
        if interval == 0 {
            return Err(ConfigError::InvalidInterval(interval).into());
        }
        let effective = match mode {
            ScheduleMode::Fixed => interval,
            ScheduleMode::Locality if interval > 4 => interval / 2,
            ScheduleMode::Locality => {
                if interval < 2 {
                    warn!(interval, "locality mode raises checkpoint interval to 2");
                }
                2
            }
        };
        Ok(Self {
            interval,
            effective,
            mode,
        })
    }

    /// Returns the configured interval `K`.
    #[inline]
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Returns the interval actually used to place checkpoints.
    #[inline]
    pub fn effective_interval(&self) -> usize {
        self.effective
    }

    /// Returns the schedule mode.
    #[inline]
    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// `true` if the state at step `t` is persisted. Step 0 always is.
    #[inline]
    #[allow(clippy::manual_is_multiple_of)]
    pub fn is_checkpoint(&self, t: usize) -> bool {
        t % self.effective == 0
    }

    /// `true` if cell `(row, col)` lies on a tile boundary row or column.
    ///
    /// The first row and column (the base case) are always boundaries.
    #[inline]
    pub fn is_checkpoint_2d(&self, row: usize, col: usize) -> bool {
        self.is_checkpoint(row) || self.is_checkpoint(col)
    }

    /// Checkpoint slot that step `t` is written to, or restored from.
    #[inline]
    pub fn slot(&self, t: usize) -> usize {
        t / self.effective
    }

    /// Step index stored in `slot`.
    #[inline]
    pub fn slot_start(&self, slot: usize) -> usize {
        slot * self.effective
    }

    /// Number of checkpoint slots for a domain of length `n`: `⌈n/K⌉ + 1`.
    #[inline]
    pub fn slot_count(&self, n: usize) -> usize {
        n.div_ceil(self.effective) + 1
    }

    /// Number of steps in `1..n` that are not checkpoints.
    ///
    /// Equals `(n - 1) - |{t in [1, n-1] : t mod K == 0}|`.
    pub fn recompute_count(&self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        let steps = n - 1;
        steps - steps / self.effective
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Fixed mode
    // ========================================================================

    #[test]
    fn test_zero_interval_rejected() {
        let err = CheckpointScheduler::new(0, ScheduleMode::Fixed).unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn test_checkpoint_at_zero() {
        for k in 1..8 {
            let scheduler = CheckpointScheduler::new(k, ScheduleMode::Fixed).unwrap();
            assert!(scheduler.is_checkpoint(0));
        }
    }

    #[test]
    fn test_checkpoint_at_interval() {
        let scheduler = CheckpointScheduler::new(10, ScheduleMode::Fixed).unwrap();
        assert!(scheduler.is_checkpoint(10));
        assert!(scheduler.is_checkpoint(20));
        assert!(!scheduler.is_checkpoint(1));
        assert!(!scheduler.is_checkpoint(15));
    }

    #[test]
    fn test_interval_one_checkpoints_every_step() {
        let scheduler = CheckpointScheduler::new(1, ScheduleMode::Fixed).unwrap();
        assert!((0..10).all(|t| scheduler.is_checkpoint(t)));
        assert_eq!(scheduler.recompute_count(10), 0);
    }

    #[test]
    fn test_slot_count() {
        let scheduler = CheckpointScheduler::new(10, ScheduleMode::Fixed).unwrap();
        assert_eq!(scheduler.slot_count(100), 11);
        assert_eq!(scheduler.slot_count(101), 12);
        assert_eq!(scheduler.slot_count(1), 2);
    }

    #[test]
    fn test_recompute_count() {
        let scheduler = CheckpointScheduler::new(3, ScheduleMode::Fixed).unwrap();
        // Steps 1..=9, checkpoints at 3, 6, 9.
        assert_eq!(scheduler.recompute_count(10), 6);
        assert_eq!(scheduler.recompute_count(1), 0);
        assert_eq!(scheduler.recompute_count(0), 0);
    }

    #[test]
    fn test_checkpoint_2d_boundaries() {
        let scheduler = CheckpointScheduler::new(4, ScheduleMode::Fixed).unwrap();
        assert!(scheduler.is_checkpoint_2d(0, 3));
        assert!(scheduler.is_checkpoint_2d(3, 4));
        assert!(!scheduler.is_checkpoint_2d(3, 5));
    }

    // ========================================================================
    // Locality mode
    // ========================================================================

    #[test]
    fn test_locality_halves_large_intervals() {
        let scheduler = CheckpointScheduler::new(10, ScheduleMode::Locality).unwrap();
        assert_eq!(scheduler.interval(), 10);
        assert_eq!(scheduler.effective_interval(), 5);
    }

    #[test]
    fn test_locality_small_intervals_become_two() {
        for k in 1..=4 {
            let scheduler = CheckpointScheduler::new(k, ScheduleMode::Locality).unwrap();
            assert_eq!(scheduler.effective_interval(), 2);
        }
    }
}
