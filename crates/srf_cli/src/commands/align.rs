//! Align command implementation
//!
//! Global alignment score with row checkpoints or two-row storage.

use std::path::PathBuf;

use srf_core::baseline;
use srf_core::engine::GridStorage;
use srf_core::{GridEngine, MetricsRegistry, RunValue};
use tracing::info;

use crate::config::Settings;
use crate::loader;
use crate::output::{self, OutputFormat};
use crate::{CliError, Result};

/// Run the align command
pub fn run(settings: &Settings, input: &[PathBuf], two_row: bool, format: OutputFormat) -> Result<()> {
    let pair = match input {
        [] => loader::synthetic_pair(settings.seq_len)?,
        [a, b] => loader::read_pair(a, b)?,
        other => {
            return Err(CliError::InvalidArgument(format!(
                "align takes two input files, got {}",
                other.len()
            )))
        }
    };
    info!(rows = pair.rows(), cols = pair.cols(), "loaded string pair");

    let storage = if two_row {
        GridStorage::TwoRow
    } else {
        GridStorage::CheckpointRows
    };
    let registry = MetricsRegistry::new();
    let mut engine = GridEngine::new(settings.run.clone())
        .with_scoring(settings.scoring)
        .with_storage(storage);
    let run = engine.run(&pair, &registry)?;

    if settings.verify {
        let expected = baseline::needleman_wunsch_score(&pair, &settings.scoring);
        run.report.ensure_matches(RunValue::Score(expected))?;
        info!("result matches the full-table baseline");
    }

    output::print_report(&run.report, settings.verify, format)
}
