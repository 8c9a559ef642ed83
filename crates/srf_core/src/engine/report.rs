//! Run reports.

use serde::Serialize;

use crate::backend::{BackendKind, BackendMetrics};
use crate::config::RunConfig;
use crate::error::{SrfError, SrfResult};
use crate::metrics::MetricsSnapshot;

/// DP topology of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// 1-D step sequence (HMM).
    Sequential,
    /// 2-D cell grid (alignment).
    Grid,
    /// Node schedule over a DAG (shortest path).
    Dag,
}

impl Topology {
    /// Returns the name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Sequential => "sequential",
            Topology::Grid => "grid",
            Topology::Dag => "dag",
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar result of a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RunValue {
    /// Total or best-path probability.
    Probability(f64),
    /// Alignment score.
    Score(i64),
    /// Shortest distance to the sink, `None` if unreachable.
    Distance(Option<i64>),
}

impl std::fmt::Display for RunValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunValue::Probability(p) => write!(f, "{}", p),
            RunValue::Score(s) => write!(f, "{}", s),
            RunValue::Distance(Some(d)) => write!(f, "{}", d),
            RunValue::Distance(None) => f.write_str("unreachable"),
        }
    }
}

/// Everything a run reports back to its caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    /// DP topology.
    pub topology: Topology,
    /// Algorithm variant (`forward`, `viterbi`, `needleman-wunsch`, ...).
    pub variant: &'static str,
    /// Scalar result.
    pub value: RunValue,
    /// Number of DP indices along the checkpointed axis.
    pub domain_len: usize,
    /// Interval used to place checkpoints.
    pub effective_interval: usize,
    /// Checkpoint slots persisted.
    pub checkpoints_written: usize,
    /// Registry counters at the end of the run.
    pub metrics: MetricsSnapshot,
    /// Backend that executed the run.
    pub backend: BackendKind,
    /// Backend counters at the end of the run.
    pub backend_metrics: BackendMetrics,
    /// Configuration the run was started with.
    pub config: RunConfig,
    /// Wall-clock time of the run in microseconds.
    pub elapsed_us: u64,
}

impl RunReport {
    /// Checks the result against a baseline value.
    ///
    /// Values are compared exactly: engines and baselines share the same
    /// arithmetic, so any difference is a defect.
    ///
    /// # Errors
    ///
    /// Returns `SrfError::EquivalenceViolation` on mismatch.
    pub fn ensure_matches(&self, expected: RunValue) -> SrfResult<()> {
        if self.value == expected {
            Ok(())
        } else {
            Err(SrfError::EquivalenceViolation {
                expected: expected.to_string(),
                actual: self.value.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(value: RunValue) -> RunReport {
        RunReport {
            topology: Topology::Grid,
            variant: "needleman-wunsch",
            value,
            domain_len: 7,
            effective_interval: 3,
            checkpoints_written: 3,
            metrics: MetricsSnapshot::default(),
            backend: BackendKind::Local,
            backend_metrics: BackendMetrics::default(),
            config: RunConfig::default(),
            elapsed_us: 0,
        }
    }

    #[test]
    fn test_ensure_matches() {
        let report = report(RunValue::Score(0));
        assert!(report.ensure_matches(RunValue::Score(0)).is_ok());

        let err = report.ensure_matches(RunValue::Score(2)).unwrap_err();
        assert_eq!(
            err,
            SrfError::EquivalenceViolation {
                expected: "2".to_string(),
                actual: "0".to_string()
            }
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(RunValue::Distance(None).to_string(), "unreachable");
        assert_eq!(RunValue::Distance(Some(4)).to_string(), "4");
        assert_eq!(RunValue::Probability(0.5).to_string(), "0.5");
    }

    #[test]
    fn test_report_serializes() {
        let json = serde_json::to_value(report(RunValue::Distance(Some(4)))).unwrap();
        assert_eq!(json["topology"], "grid");
        assert_eq!(json["value"]["kind"], "distance");
        assert_eq!(json["value"]["value"], 4);
        assert_eq!(json["backend"], "local");
        assert_eq!(json["config"]["interval"], 10);
    }
}
