//! Graph command implementation
//!
//! Single-pass DAG shortest path with depth-weighted recompute metrics.

use std::path::Path;

use srf_core::baseline;
use srf_core::{DagEngine, MetricsRegistry, RunValue};
use tracing::info;

use crate::config::Settings;
use crate::loader;
use crate::output::{self, OutputFormat};
use crate::Result;

/// Run the graph command
pub fn run(settings: &Settings, input: Option<&Path>, format: OutputFormat) -> Result<()> {
    let dag = match input {
        Some(path) => loader::read_graph(path)?,
        None => loader::synthetic_chain(settings.seq_len)?,
    };
    info!(nodes = dag.node_count(), edges = dag.edge_count(), "loaded graph");

    let registry = MetricsRegistry::new();
    let mut engine = DagEngine::new(settings.run.clone());
    let run = engine.run(&dag, &registry)?;

    if settings.verify {
        let expected = baseline::dag_shortest_path(&dag)?;
        run.report.ensure_matches(RunValue::Distance(expected))?;
        info!("result matches the full-table baseline");
    }

    output::print_report(&run.report, settings.verify, format)
}
