//! Checkpointing for selective recomputation.
//!
//! Instead of materialising every intermediate DP state, a run persists
//! only the states at checkpoint indices and regenerates the rest on
//! demand by recomputing forward from the nearest earlier checkpoint.
//!
//! # Key Components
//!
//! - [`CheckpointScheduler`]: Decides which indices are checkpoints
//! - [`ScheduleMode`]: Fixed or locality-aware interval
//! - [`CacheBudget`]: Derives an interval from a working-memory budget
//! - [`CheckpointTable`]: Write-once storage for checkpointed states
//!
//! # Example
//!
//! ```rust
//! use srf_core::checkpoint::{CheckpointScheduler, CheckpointTable, ScheduleMode};
//!
//! let scheduler = CheckpointScheduler::new(4, ScheduleMode::Fixed).unwrap();
//! let n = 10;
//! let mut table: CheckpointTable<f64> =
//!     CheckpointTable::with_slots(scheduler.slot_count(n), 1).unwrap();
//!
//! let mut state = vec![1.0];
//! for t in 0..n {
//!     if t > 0 {
//!         state[0] *= 0.5;
//!     }
//!     if scheduler.is_checkpoint(t) {
//!         table.write(scheduler.slot(t), &state).unwrap();
//!     }
//! }
//! assert_eq!(table.written_count(), 3); // steps 0, 4, 8
//! ```

mod budget;
mod strategy;
mod table;

pub use budget::{CacheBudget, MIN_TILE_SIZE};
pub use strategy::{CheckpointScheduler, ScheduleMode};
pub use table::{alloc_state, CheckpointTable, StateVector};
