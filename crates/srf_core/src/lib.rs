//! # srf_core: Selective Recomputation Framework
//!
//! Checkpointed dynamic programming with recompute metrics. Instead of
//! materialising every intermediate DP state, a run persists a sparse set
//! of checkpoints and regenerates the states between them, while counting
//! what that trade costs in recomputation, working memory and backend
//! overhead.
//!
//! ## Components
//!
//! - [`granularity`]: maps DP indices to the units metrics are attributed to
//! - [`checkpoint`]: checkpoint placement, cache budgets, write-once storage
//! - [`backend`]: elementary DP transitions on a local or simulated
//!   accelerator backend
//! - [`metrics`]: per-run counter registry
//! - [`engine`]: sequential (HMM), grid (alignment) and DAG (shortest path)
//!   recompute engines
//! - [`baseline`]: full-table implementations used as the correctness oracle
//! - [`analysis`]: regime classification of finished runs
//!
//! ## Usage Examples
//!
//! ```rust
//! use srf_core::backend::Semiring;
//! use srf_core::baseline;
//! use srf_core::config::RunConfig;
//! use srf_core::engine::{RunValue, SequentialEngine};
//! use srf_core::metrics::MetricsRegistry;
//! use srf_core::problem::{HiddenMarkovModel, Observation};
//!
//! let model = HiddenMarkovModel::weather();
//! let obs = [Observation::WALK, Observation::SHOP, Observation::CLEAN];
//!
//! let registry = MetricsRegistry::new();
//! let config = RunConfig::builder().interval(2).granularity(2).build().unwrap();
//! let run = SequentialEngine::new(config)
//!     .run(&model, &obs, Semiring::SumProduct, &registry)
//!     .unwrap();
//!
//! let expected = baseline::forward_probability(&model, &obs).unwrap();
//! run.report.ensure_matches(RunValue::Probability(expected)).unwrap();
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![allow(unknown_lints)]

pub mod analysis;
pub mod backend;
pub mod baseline;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod granularity;
pub mod metrics;
pub mod problem;

pub use config::{RunConfig, RunConfigBuilder};
pub use engine::{DagEngine, GridEngine, RunReport, RunValue, SequentialEngine};
pub use error::{SrfError, SrfResult};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
