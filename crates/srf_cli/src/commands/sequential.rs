//! Forward and Viterbi commands
//!
//! Runs the checkpointed sequential engine over the weather HMM.

use std::path::Path;

use srf_core::backend::Semiring;
use srf_core::baseline;
use srf_core::problem::HiddenMarkovModel;
use srf_core::{MetricsRegistry, RunValue, SequentialEngine};
use tracing::info;

use crate::config::Settings;
use crate::loader;
use crate::output::{self, OutputFormat};
use crate::Result;

/// Run the forward (`SumProduct`) or Viterbi (`MaxProduct`) command
pub fn run(settings: &Settings, input: Option<&Path>, semiring: Semiring, format: OutputFormat) -> Result<()> {
    let observations = match input {
        Some(path) => loader::read_sequence(path)?,
        None => loader::synthetic_sequence(settings.seq_len),
    };
    info!(len = observations.len(), semiring = ?semiring, "loaded observations");

    let model = HiddenMarkovModel::weather();
    let registry = MetricsRegistry::new();
    let mut engine = SequentialEngine::new(settings.run.clone());
    let run = engine.run(&model, &observations, semiring, &registry)?;

    if settings.verify {
        let expected = match semiring {
            Semiring::SumProduct => baseline::forward_probability(&model, &observations)?,
            Semiring::MaxProduct => baseline::viterbi_probability(&model, &observations)?,
        };
        run.report.ensure_matches(RunValue::Probability(expected))?;
        info!("result matches the full-table baseline");
    }

    output::print_report(&run.report, settings.verify, format)
}
