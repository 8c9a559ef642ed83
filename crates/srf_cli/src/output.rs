//! Report rendering: table, JSON or CSV.

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;
use srf_core::analysis::{analyze, AcceleratorFeasibility, CacheRegime, Regime, RunAnalysis};
use srf_core::checkpoint::ScheduleMode;
use srf_core::RunReport;

use crate::{CliError, Result};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned key/value table
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// One CSV record with a header row
    Csv,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    analysis: RunAnalysis,
    verified: bool,
}

#[derive(Serialize)]
struct CsvRecord {
    topology: &'static str,
    variant: &'static str,
    value: String,
    domain_len: usize,
    interval: usize,
    effective_interval: usize,
    granularity: usize,
    schedule_mode: ScheduleMode,
    cache_budget_kb: usize,
    backend: &'static str,
    checkpoints_written: usize,
    recompute_events: u64,
    working_set_bytes: u64,
    tile_reuse_count: u64,
    total_dist_metric: u64,
    unit_recompute_events: u64,
    unit_reuse_proxy: u64,
    compute_events: u64,
    memory_access_proxy: u64,
    dispatch_overhead_proxy: u64,
    transfer_overhead_us: u64,
    kernel_launch_count: u64,
    regime: Regime,
    cache_regime: CacheRegime,
    accelerator_feasibility: AcceleratorFeasibility,
    locality_index: f64,
    verified: bool,
    elapsed_us: u64,
}

impl CsvRecord {
    fn new(report: &RunReport, analysis: &RunAnalysis, verified: bool) -> Self {
        let m = &report.metrics;
        Self {
            topology: report.topology.as_str(),
            variant: report.variant,
            value: report.value.to_string(),
            domain_len: report.domain_len,
            interval: report.config.interval(),
            effective_interval: report.effective_interval,
            granularity: report.config.granularity(),
            schedule_mode: report.config.schedule_mode(),
            cache_budget_kb: report.config.cache_budget_kb(),
            backend: report.backend.as_str(),
            checkpoints_written: report.checkpoints_written,
            recompute_events: m.recompute_events,
            working_set_bytes: m.working_set_bytes,
            tile_reuse_count: m.tile_reuse_count,
            total_dist_metric: m.total_dist_metric,
            unit_recompute_events: m.unit_recompute_events,
            unit_reuse_proxy: m.unit_reuse_proxy,
            compute_events: m.compute_events,
            memory_access_proxy: m.memory_access_proxy,
            dispatch_overhead_proxy: m.dispatch_overhead_proxy,
            transfer_overhead_us: report.backend_metrics.transfer_overhead_us,
            kernel_launch_count: report.backend_metrics.kernel_launch_count,
            regime: analysis.regime,
            cache_regime: analysis.cache_regime,
            accelerator_feasibility: analysis.accelerator_feasibility,
            locality_index: analysis.locality_index,
            verified,
            elapsed_us: report.elapsed_us,
        }
    }
}

fn serialized_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::from("?"),
    }
}

fn report_rows(report: &RunReport, analysis: &RunAnalysis, verified: bool) -> Vec<(&'static str, String)> {
    let m = &report.metrics;
    let ratio = analysis
        .relative_cost_ratio
        .map_or_else(|| "n/a".to_string(), |r| format!("{:.4}", r));
    vec![
        ("topology", report.topology.to_string()),
        ("variant", report.variant.to_string()),
        ("result", report.value.to_string()),
        ("verified", verified.to_string()),
        ("domain length", report.domain_len.to_string()),
        ("interval", report.config.interval().to_string()),
        ("effective interval", report.effective_interval.to_string()),
        ("granularity", report.config.granularity().to_string()),
        ("schedule mode", serialized_name(&report.config.schedule_mode())),
        ("cache budget kb", report.config.cache_budget_kb().to_string()),
        ("backend", report.backend.to_string()),
        ("checkpoints written", report.checkpoints_written.to_string()),
        ("recompute events", m.recompute_events.to_string()),
        ("working set bytes", m.working_set_bytes.to_string()),
        ("tile reuse", m.tile_reuse_count.to_string()),
        ("total dist", m.total_dist_metric.to_string()),
        ("unit recompute events", m.unit_recompute_events.to_string()),
        ("unit reuse", m.unit_reuse_proxy.to_string()),
        ("compute events", m.compute_events.to_string()),
        ("memory accesses", m.memory_access_proxy.to_string()),
        ("dispatch overhead", m.dispatch_overhead_proxy.to_string()),
        ("transfer overhead us", report.backend_metrics.transfer_overhead_us.to_string()),
        ("kernel launches", report.backend_metrics.kernel_launch_count.to_string()),
        ("regime", serialized_name(&analysis.regime)),
        ("relative cost ratio", ratio),
        ("cache regime", serialized_name(&analysis.cache_regime)),
        ("accelerator feasibility", serialized_name(&analysis.accelerator_feasibility)),
        ("locality index", format!("{:.4}", analysis.locality_index)),
        ("elapsed us", report.elapsed_us.to_string()),
    ]
}

/// Writes key/value rows as a boxed table.
pub fn write_table<W: Write>(out: &mut W, rows: &[(&str, String)]) -> Result<()> {
    let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let value_width = rows.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    let rule = |left: &str, mid: &str, right: &str| {
        format!(
            "{}{}{}{}{}",
            left,
            "─".repeat(key_width + 2),
            mid,
            "─".repeat(value_width + 2),
            right
        )
    };

    writeln!(out, "{}", rule("┌", "┬", "┐"))?;
    for (key, value) in rows {
        writeln!(out, "│ {:<kw$} │ {:>vw$} │", key, value, kw = key_width, vw = value_width)?;
    }
    writeln!(out, "{}", rule("└", "┴", "┘"))?;
    Ok(())
}

/// Writes key/value rows in the requested format.
pub fn write_pairs<W: Write>(out: &mut W, rows: &[(&str, String)], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(out, rows),
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = rows
                .iter()
                .map(|(k, v)| (k.replace(' ', "_"), serde_json::Value::String(v.clone())))
                .collect();
            serde_json::to_writer_pretty(&mut *out, &map).map_err(CliError::output)?;
            writeln!(out)?;
            Ok(())
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut *out);
            writer.write_record(["key", "value"]).map_err(CliError::output)?;
            for (key, value) in rows {
                writer.write_record([*key, value.as_str()]).map_err(CliError::output)?;
            }
            writer.flush()?;
            Ok(())
        }
    }
}

/// Writes a run report with its analysis.
pub fn write_report<W: Write>(out: &mut W, report: &RunReport, verified: bool, format: OutputFormat) -> Result<()> {
    let analysis = analyze(report);
    match format {
        OutputFormat::Table => write_table(out, &report_rows(report, &analysis, verified)),
        OutputFormat::Json => {
            let view = JsonReport {
                report,
                analysis,
                verified,
            };
            serde_json::to_writer_pretty(&mut *out, &view).map_err(CliError::output)?;
            writeln!(out)?;
            Ok(())
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut *out);
            writer
                .serialize(CsvRecord::new(report, &analysis, verified))
                .map_err(CliError::output)?;
            writer.flush()?;
            Ok(())
        }
    }
}

/// Writes a run report to stdout.
pub fn print_report(report: &RunReport, verified: bool, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, report, verified, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use srf_core::problem::AlignmentPair;
    use srf_core::{GridEngine, MetricsRegistry, RunConfig};

    fn sample_report() -> RunReport {
        let pair = AlignmentPair::new("GATTACA", "GCATGCU").unwrap();
        let registry = MetricsRegistry::new();
        let config = RunConfig::builder().interval(3).build().unwrap();
        GridEngine::new(config).run(&pair, &registry).unwrap().report
    }

    fn render(format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_report(&mut out, &sample_report(), true, format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_table_output() {
        let text = render(OutputFormat::Table);
        assert!(text.starts_with('┌'));
        assert!(text.contains("needleman-wunsch"));
        assert!(text.contains("effective interval"));
        assert!(text.trim_end().ends_with('┘'));
    }

    #[test]
    fn test_json_output() {
        let value: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(value["topology"], "grid");
        assert_eq!(value["value"]["kind"], "score");
        assert_eq!(value["value"]["value"], 0);
        assert_eq!(value["verified"], true);
        assert!(value["analysis"]["regime"].is_string());
    }

    #[test]
    fn test_csv_output() {
        let text = render(OutputFormat::Csv);
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader.headers().unwrap().clone();
        let record = reader.records().next().unwrap().unwrap();
        let value = headers.iter().position(|h| h == "value").unwrap();
        let interval = headers.iter().position(|h| h == "interval").unwrap();
        assert_eq!(&record[value], "0");
        assert_eq!(&record[interval], "3");
    }

    #[test]
    fn test_pairs_formats() {
        let rows = vec![("backend", "local".to_string()), ("force cpu", "false".to_string())];

        let mut out = Vec::new();
        write_pairs(&mut out, &rows, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["force_cpu"], "false");

        let mut out = Vec::new();
        write_pairs(&mut out, &rows, OutputFormat::Csv).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "key,value\nbackend,local\nforce cpu,false\n");
    }
}
