//! Subcommand implementations.

pub mod align;
pub mod check;
pub mod graph;
pub mod sequential;
