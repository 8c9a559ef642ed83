//! Write-once checkpoint storage.

use crate::error::{CheckpointError, ResourceError, SrfResult};

/// DP state at one index: one value per lane.
pub type StateVector<T> = Vec<T>;

/// Allocates a state vector of `lanes` copies of `value`, failing instead
/// of aborting when memory is exhausted.
pub fn alloc_state<T: Clone>(lanes: usize, value: T) -> SrfResult<StateVector<T>> {
    let mut state = Vec::new();
    state
        .try_reserve_exact(lanes)
        .map_err(|_| ResourceError::AllocationFailed {
            what: "state vector",
            bytes: lanes.saturating_mul(std::mem::size_of::<T>()),
        })?;
    state.resize(lanes, value);
    Ok(state)
}

/// Ordered checkpoint slots, one per checkpoint unit.
///
/// Each slot is written at most once and never mutated afterwards. The
/// table is owned by the engine for the lifetime of a run and read back
/// only when building results or reconstructing intermediate states.
///
/// # Example
///
/// ```rust
/// use srf_core::checkpoint::CheckpointTable;
///
/// let mut table: CheckpointTable<f64> = CheckpointTable::with_slots(3, 2).unwrap();
/// table.write(0, &[0.5, 0.5]).unwrap();
/// assert!(table.write(0, &[0.1, 0.9]).is_err());
/// assert_eq!(table.get(0), Some(&[0.5, 0.5][..]));
/// assert_eq!(table.nearest_before(2), Some(0));
/// ```
#[derive(Clone, Debug)]
pub struct CheckpointTable<T> {
    slots: Vec<Option<StateVector<T>>>,
    lanes: usize,
}

impl<T: Clone> CheckpointTable<T> {
    /// Allocates `slot_count` empty slots for states of `lanes` values.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::AllocationFailed` if the slot array cannot
    /// be allocated.
    pub fn with_slots(slot_count: usize, lanes: usize) -> SrfResult<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(slot_count)
            .map_err(|_| ResourceError::AllocationFailed {
                what: "checkpoint table",
                bytes: slot_count.saturating_mul(std::mem::size_of::<Option<StateVector<T>>>()),
            })?;
        slots.resize(slot_count, None);
        Ok(Self { slots, lanes })
    }

    /// Persists `state` into `slot`.
    ///
    /// # Errors
    ///
    /// - `CheckpointError::SlotOutOfRange` if `slot >= capacity`
    /// - `CheckpointError::SlotAlreadyWritten` if the slot holds a state
    /// - `ResourceError::AllocationFailed` if the copy cannot be allocated
    pub fn write(&mut self, slot: usize, state: &[T]) -> SrfResult<()> {
        let capacity = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(CheckpointError::SlotOutOfRange { slot, capacity })?;
        if entry.is_some() {
            return Err(CheckpointError::SlotAlreadyWritten { slot }.into());
        }

        let mut stored = Vec::new();
        stored
            .try_reserve_exact(state.len())
            .map_err(|_| ResourceError::AllocationFailed {
                what: "checkpoint state",
                bytes: std::mem::size_of_val(state),
            })?;
        stored.extend_from_slice(state);
        *entry = Some(stored);
        Ok(())
    }

    /// Returns the state stored in `slot`, if any.
    pub fn get(&self, slot: usize) -> Option<&[T]> {
        self.slots.get(slot).and_then(|s| s.as_deref())
    }

    /// Returns the state stored in `slot`.
    ///
    /// # Errors
    ///
    /// Returns `CheckpointError::NotFound` if the slot is empty or out of range.
    pub fn restore(&self, slot: usize) -> SrfResult<&[T]> {
        self.get(slot)
            .ok_or_else(|| CheckpointError::NotFound { slot }.into())
    }

    /// Finds the last written slot at or before `slot`.
    pub fn nearest_before(&self, slot: usize) -> Option<usize> {
        let upper = slot.min(self.slots.len().checked_sub(1)?);
        (0..=upper).rev().find(|&s| self.slots[s].is_some())
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of lanes per state.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Returns the number of written slots.
    pub fn written_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns `true` if no slot has been written.
    pub fn is_empty(&self) -> bool {
        self.written_count() == 0
    }

    /// Bytes held by written slots.
    pub fn memory_usage(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .map(|s| s.len() * std::mem::size_of::<T>())
            .sum()
    }
}
