//! Check command implementation
//!
//! Prints the resolved backend and run configuration without running.

use std::io::Write;

use srf_core::backend::BackendSelection;

use crate::config::Settings;
use crate::output::{self, OutputFormat};
use crate::Result;

fn rows(settings: &Settings) -> Vec<(&'static str, String)> {
    let run = &settings.run;
    let backend = run.backend();
    let device_budget = match backend {
        BackendSelection::SimulatedAccelerator { memory_budget_kb: 0 } => "unlimited".to_string(),
        BackendSelection::SimulatedAccelerator { memory_budget_kb } => format!("{} KB", memory_budget_kb),
        BackendSelection::Local => "n/a".to_string(),
    };
    let source = settings
        .source
        .as_ref()
        .map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string());

    vec![
        ("config file", source),
        ("SRF_FORCE_CPU", settings.toggles.force_cpu.to_string()),
        ("SRF_FORCE_GPU", settings.toggles.force_gpu.to_string()),
        ("backend", backend.kind().to_string()),
        ("device budget", device_budget),
        ("interval", run.interval().to_string()),
        ("granularity", run.granularity().to_string()),
        ("schedule mode", format!("{:?}", run.schedule_mode())),
        ("cache budget kb", run.cache_budget_kb().to_string()),
        ("recompute depth", run.recompute_depth().to_string()),
        ("visit order", format!("{:?}", run.visit_order())),
        ("order check", format!("{:?}", run.order_check())),
    ]
}

/// Writes the resolved settings.
pub fn write<W: Write>(out: &mut W, settings: &Settings, format: OutputFormat) -> Result<()> {
    output::write_pairs(out, &rows(settings), format)
}

/// Run the check command
pub fn run(settings: &Settings, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write(&mut out, settings, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendToggles, GraphArgs, RunArgs};

    #[test]
    fn test_check_reports_resolved_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = \"accelerator\"\ndevice_budget_kb = 32").unwrap();
        let settings = Settings::resolve(
            Some(file.path()),
            &RunArgs::default(),
            &GraphArgs::default(),
            BackendToggles::default(),
        )
        .unwrap();

        let mut out = Vec::new();
        write(&mut out, &settings, OutputFormat::Csv).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("backend,simulated-accelerator"));
        assert!(text.contains("device budget,32 KB"));
    }

    #[test]
    fn test_force_cpu_shown() {
        let toggles = BackendToggles {
            force_cpu: true,
            force_gpu: false,
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = \"accelerator\"").unwrap();
        let settings =
            Settings::resolve(Some(file.path()), &RunArgs::default(), &GraphArgs::default(), toggles).unwrap();

        let mut out = Vec::new();
        write(&mut out, &settings, OutputFormat::Csv).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("SRF_FORCE_CPU,true"));
        assert!(text.contains("backend,local"));
    }
}
