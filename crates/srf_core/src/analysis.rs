//! Post-run classification of a [`RunReport`].
//!
//! Turns raw counters into the indicators used when comparing runs across
//! intervals, granularities and backends.

use serde::Serialize;

use crate::backend::BackendKind;
use crate::engine::RunReport;

/// Dominant cost of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    /// Recompute events exceed half of all compute events.
    RecomputationDominated,
    /// Compute events exceed twice the memory accesses.
    ComputeBound,
    /// Memory accesses exceed compute events.
    MemoryBound,
    /// None of the above.
    Balanced,
}

/// Working set against the configured cache budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheRegime {
    /// Peak working set within the budget.
    Fit,
    /// Peak working set above the budget.
    Spill,
    /// No budget configured.
    Unknown,
}

/// Whether offloading this run's granularity would amortise dispatch cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcceleratorFeasibility {
    /// Unit size of at least 32.
    Feasible,
    /// Unit size between 2 and 31.
    Marginal,
    /// Unit size of 1.
    Unfeasible,
    /// The run already paid dispatch overhead; its metrics are the answer.
    Observed,
}

/// Derived indicators for one run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RunAnalysis {
    /// Dominant cost.
    pub regime: Regime,
    /// `recompute / (compute - recompute)`, `None` without base compute.
    pub relative_cost_ratio: Option<f64>,
    /// Cache fit.
    pub cache_regime: CacheRegime,
    /// Offload feasibility.
    pub accelerator_feasibility: AcceleratorFeasibility,
    /// Same-unit reuses per unit of granularity.
    pub locality_index: f64,
}

/// Classifies a finished run.
///
/// # Example
///
/// ```rust
/// use srf_core::analysis::{analyze, Regime};
/// use srf_core::config::RunConfig;
/// use srf_core::engine::GridEngine;
/// use srf_core::metrics::MetricsRegistry;
/// use srf_core::problem::AlignmentPair;
///
/// let pair = AlignmentPair::new("GATTACA", "GCATGCU").unwrap();
/// let registry = MetricsRegistry::new();
/// let run = GridEngine::new(RunConfig::builder().interval(4).build().unwrap())
///     .run(&pair, &registry)
///     .unwrap();
///
/// let analysis = analyze(&run.report);
/// assert_eq!(analysis.regime, Regime::RecomputationDominated);
/// ```
pub fn analyze(report: &RunReport) -> RunAnalysis {
    let m = &report.metrics;
    let granularity = report.config.granularity();
    RunAnalysis {
        regime: classify_regime(m.recompute_events, m.compute_events, m.memory_access_proxy),
        relative_cost_ratio: relative_cost_ratio(m.recompute_events, m.compute_events),
        cache_regime: cache_regime(m.working_set_bytes, report.config.cache_budget_kb()),
        accelerator_feasibility: accelerator_feasibility(
            report.backend,
            m.dispatch_overhead_proxy,
            granularity,
        ),
        locality_index: m.unit_reuse_proxy as f64 / granularity.max(1) as f64,
    }
}

/// Regime from recompute, compute and memory-access counts.
pub fn classify_regime(recompute: u64, compute: u64, memory_access: u64) -> Regime {
    let (recompute, compute, memory_access) = (recompute as f64, compute as f64, memory_access as f64);
    if recompute > 0.5 * compute {
        Regime::RecomputationDominated
    } else if compute > 2.0 * memory_access {
        Regime::ComputeBound
    } else if memory_access > compute {
        Regime::MemoryBound
    } else {
        Regime::Balanced
    }
}

/// Recompute overhead relative to the non-recomputed work.
pub fn relative_cost_ratio(recompute: u64, compute: u64) -> Option<f64> {
    let base = compute as f64 - recompute as f64;
    (base > 0.0).then(|| recompute as f64 / base)
}

/// Cache fit of a working set against a budget in KB (0 = none).
pub fn cache_regime(working_set_bytes: u64, cache_budget_kb: usize) -> CacheRegime {
    if cache_budget_kb == 0 {
        return CacheRegime::Unknown;
    }
    let budget_bytes = (cache_budget_kb as u64).saturating_mul(1024);
    if working_set_bytes <= budget_bytes {
        CacheRegime::Fit
    } else {
        CacheRegime::Spill
    }
}

/// Offload feasibility of a run's granularity.
pub fn accelerator_feasibility(
    backend: BackendKind,
    dispatch_overhead: u64,
    granularity: usize,
) -> AcceleratorFeasibility {
    if backend != BackendKind::Local || dispatch_overhead != 0 {
        return AcceleratorFeasibility::Observed;
    }
    match granularity {
        g if g >= 32 => AcceleratorFeasibility::Feasible,
        g if g > 1 => AcceleratorFeasibility::Marginal,
        _ => AcceleratorFeasibility::Unfeasible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_priority() {
        assert_eq!(classify_regime(6, 10, 100), Regime::RecomputationDominated);
        assert_eq!(classify_regime(5, 10, 100), Regime::MemoryBound);
        assert_eq!(classify_regime(0, 100, 40), Regime::ComputeBound);
        assert_eq!(classify_regime(0, 100, 80), Regime::Balanced);
        assert_eq!(classify_regime(0, 0, 0), Regime::Balanced);
    }

    #[test]
    fn test_relative_cost_ratio() {
        assert_eq!(relative_cost_ratio(2, 10), Some(0.25));
        assert_eq!(relative_cost_ratio(10, 10), None);
        assert_eq!(relative_cost_ratio(0, 0), None);
    }

    #[test]
    fn test_cache_regime() {
        assert_eq!(cache_regime(4096, 0), CacheRegime::Unknown);
        assert_eq!(cache_regime(1024, 1), CacheRegime::Fit);
        assert_eq!(cache_regime(1025, 1), CacheRegime::Spill);
    }

    #[test]
    fn test_accelerator_feasibility() {
        assert_eq!(
            accelerator_feasibility(BackendKind::Local, 0, 32),
            AcceleratorFeasibility::Feasible
        );
        assert_eq!(
            accelerator_feasibility(BackendKind::Local, 0, 4),
            AcceleratorFeasibility::Marginal
        );
        assert_eq!(
            accelerator_feasibility(BackendKind::Local, 0, 1),
            AcceleratorFeasibility::Unfeasible
        );
        assert_eq!(
            accelerator_feasibility(BackendKind::SimulatedAccelerator, 12, 64),
            AcceleratorFeasibility::Observed
        );
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_value(Regime::RecomputationDominated).unwrap(),
            "RECOMPUTATION_DOMINATED"
        );
        assert_eq!(serde_json::to_value(CacheRegime::Spill).unwrap(), "SPILL");
    }
}
