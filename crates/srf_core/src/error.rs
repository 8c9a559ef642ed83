//! Error types for the selective recomputation framework.
//!
//! This module defines:
//! - [`ConfigError`]: invalid run configuration, rejected before a run starts
//! - [`InstanceError`]: malformed problem instances
//! - [`ResourceError`]: allocation and simulated device memory failures
//! - [`CheckpointError`]: misuse of write-once checkpoint storage
//! - [`SrfError`]: the umbrella error returned by every fallible operation
//!
//! No operation in the core is retried. Configuration and instance errors
//! are raised before any metrics are reset; resource errors abort the run.

use thiserror::Error;

/// Configuration error for a recompute run.
///
/// # Examples
///
/// ```
/// use srf_core::error::ConfigError;
///
/// let err = ConfigError::InvalidInterval(0);
/// assert!(err.to_string().contains("checkpoint interval 0"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Checkpoint interval must be at least 1.
    #[error("Invalid checkpoint interval {0}: must be >= 1")]
    InvalidInterval(usize),

    /// Granularity unit size must be at least 1.
    #[error("Invalid granularity unit size {0}: must be >= 1")]
    InvalidGranularity(usize),

    /// Recompute depth multiplier must be at least 1.
    #[error("Invalid recompute depth {0}: must be >= 1")]
    InvalidRecomputeDepth(u64),

    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },
}

/// Malformed problem instance.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InstanceError {
    /// Observation sequence has no elements.
    #[error("Observation sequence is empty")]
    EmptySequence,

    /// Alignment input string has no characters.
    #[error("Alignment string '{which}' is empty")]
    EmptyString {
        /// Which side of the pair was empty.
        which: &'static str,
    },

    /// Instance dimension does not match the model or the run it is used with.
    #[error("Shape mismatch in {field}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Offending parameter.
        field: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        found: usize,
    },

    /// Observation symbol outside the model's emission alphabet.
    #[error("Observation symbol {symbol} at step {step} outside alphabet of {alphabet} symbols")]
    SymbolOutOfRange {
        /// Step index.
        step: usize,
        /// Offending symbol.
        symbol: usize,
        /// Number of emission symbols in the model.
        alphabet: usize,
    },

    /// Graph has no edges.
    #[error("Graph has no edges")]
    EmptyGraph,

    /// Edge refers to a node outside the node set.
    #[error("Edge {from} -> {to} refers to a node outside 0..{node_count}")]
    NodeOutOfRange {
        /// Edge source.
        from: usize,
        /// Edge target.
        to: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },

    /// Node id too large to size the node set.
    #[error("Node id {0} exceeds the largest supported node id")]
    NodeIdOverflow(usize),

    /// Visitation schedule is not a permutation of the node set.
    #[error("Schedule does not visit every node exactly once: {0}")]
    InvalidSchedule(String),

    /// A node would be expanded before all of its predecessors were visited.
    #[error("Relaxation order violated: edge {from} -> {to} visits {to} before {from}")]
    RelaxationOrder {
        /// Edge source (visited too late).
        from: usize,
        /// Edge target (expanded too early).
        to: usize,
    },
}

/// Allocation or device memory failure. Fatal to the run.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Host allocation failed.
    #[error("Failed to allocate {bytes} bytes for {what}")]
    AllocationFailed {
        /// What was being allocated.
        what: &'static str,
        /// Requested size in bytes.
        bytes: usize,
    },

    /// Simulated device memory budget exhausted.
    #[error("Device memory exhausted: requested {requested} bytes, {available} bytes available")]
    DeviceMemoryExhausted {
        /// Requested size in bytes.
        requested: usize,
        /// Remaining device budget in bytes.
        available: usize,
    },

    /// Source and destination of a copy differ in length.
    #[error("Transfer size mismatch: destination holds {expected} elements, source has {actual}")]
    TransferSizeMismatch {
        /// Destination length.
        expected: usize,
        /// Source length.
        actual: usize,
    },
}

/// Errors from write-once checkpoint storage.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CheckpointError {
    /// Slot index beyond the table's capacity.
    #[error("Checkpoint slot {slot} out of range (capacity: {capacity})")]
    SlotOutOfRange {
        /// Requested slot.
        slot: usize,
        /// Table capacity.
        capacity: usize,
    },

    /// Slot was already written.
    #[error("Checkpoint slot {slot} already written")]
    SlotAlreadyWritten {
        /// Requested slot.
        slot: usize,
    },

    /// No checkpoint is stored in the slot.
    #[error("Checkpoint not found for slot {slot}")]
    NotFound {
        /// Requested slot.
        slot: usize,
    },
}

/// Umbrella error for the framework.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SrfError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed problem instance.
    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// Allocation or device memory failure.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Checkpoint storage misuse.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// A recompute result disagrees with the full-table baseline.
    #[error("Equivalence violation: baseline produced {expected}, recompute produced {actual}")]
    EquivalenceViolation {
        /// Baseline result.
        expected: String,
        /// Recompute result.
        actual: String,
    },
}

impl SrfError {
    /// Returns `true` for errors raised before any computation starts.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SrfError::Config(_) | SrfError::Instance(_))
    }
}

/// Result type for framework operations.
pub type SrfResult<T> = Result<T, SrfError>;
