//! Problem instances, one per DP topology.
//!
//! Instances are immutable inputs owned by the caller; engines only read
//! them. Each constructor validates its shape so that a malformed
//! instance is rejected before a run resets any metrics.

mod alignment;
mod graph;
mod hmm;

pub use alignment::{AlignmentPair, Scoring};
pub use graph::{Dag, Edge, OrderCheck, VisitOrder};
pub use hmm::{parse_observations, HiddenMarkovModel, Observation};
