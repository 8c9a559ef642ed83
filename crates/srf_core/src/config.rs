//! Run configuration.
//!
//! A [`RunConfig`] is built once per run through [`RunConfigBuilder`] and
//! validated in [`build`](RunConfigBuilder::build): every value an engine
//! would otherwise divide by is rejected there, before any run state is
//! touched.

use serde::Serialize;

use crate::backend::BackendSelection;
use crate::checkpoint::{CacheBudget, CheckpointScheduler, ScheduleMode};
use crate::error::{ConfigError, SrfResult};
use crate::granularity::{GranularityKind, GranularityPolicy};
use crate::problem::{OrderCheck, VisitOrder};

/// Default checkpoint interval.
pub const DEFAULT_INTERVAL: usize = 10;

/// Default granularity unit size.
pub const DEFAULT_GRANULARITY: usize = 4;

/// Validated configuration for one run.
///
/// # Example
///
/// ```rust
/// use srf_core::config::RunConfig;
/// use srf_core::checkpoint::ScheduleMode;
///
/// let config = RunConfig::builder()
///     .interval(10)
///     .schedule_mode(ScheduleMode::Locality)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_interval(8).unwrap(), 5);
///
/// assert!(RunConfig::builder().interval(0).build().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    interval: usize,
    granularity: usize,
    schedule_mode: ScheduleMode,
    cache_budget_kb: usize,
    #[serde(skip)]
    backend: BackendSelection,
    recompute_depth: u64,
    visit_order: VisitOrder,
    order_check: OrderCheck,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            granularity: DEFAULT_GRANULARITY,
            schedule_mode: ScheduleMode::Fixed,
            cache_budget_kb: 0,
            backend: BackendSelection::Local,
            recompute_depth: 1,
            visit_order: VisitOrder::Natural,
            order_check: OrderCheck::Enforce,
        }
    }
}

impl RunConfig {
    /// Creates a builder with default values.
    #[inline]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Configured checkpoint interval `K`.
    #[inline]
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Granularity unit size `G`.
    #[inline]
    pub fn granularity(&self) -> usize {
        self.granularity
    }

    /// Schedule mode.
    #[inline]
    pub fn schedule_mode(&self) -> ScheduleMode {
        self.schedule_mode
    }

    /// Cache budget in KB (0 = unused).
    #[inline]
    pub fn cache_budget_kb(&self) -> usize {
        self.cache_budget_kb
    }

    /// Backend selection.
    #[inline]
    pub fn backend(&self) -> BackendSelection {
        self.backend
    }

    /// Recompute depth multiplier for DAG runs.
    #[inline]
    pub fn recompute_depth(&self) -> u64 {
        self.recompute_depth
    }

    /// DAG visitation order.
    #[inline]
    pub fn visit_order(&self) -> VisitOrder {
        self.visit_order
    }

    /// DAG relaxation-order check.
    #[inline]
    pub fn order_check(&self) -> OrderCheck {
        self.order_check
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::InvalidInterval(self.interval));
        }
        if self.granularity == 0 {
            return Err(ConfigError::InvalidGranularity(self.granularity));
        }
        if self.recompute_depth == 0 {
            return Err(ConfigError::InvalidRecomputeDepth(self.recompute_depth));
        }
        if self.cache_budget_kb.checked_mul(1024).is_none() {
            return Err(ConfigError::InvalidParameter {
                name: "cache_budget_kb",
                value: format!("{} overflows a byte count", self.cache_budget_kb),
            });
        }
        Ok(())
    }

    /// Builds the scheduler for states of `cell_size` bytes.
    ///
    /// An active cache budget replaces `K` with the derived tile size; the
    /// locality mode is applied afterwards.
    pub fn scheduler(&self, cell_size: usize) -> SrfResult<CheckpointScheduler> {
        let base = CacheBudget::from_kb(self.cache_budget_kb).suggest_tile_size(cell_size, self.interval);
        CheckpointScheduler::new(base, self.schedule_mode)
    }

    /// Interval actually used for states of `cell_size` bytes.
    pub fn effective_interval(&self, cell_size: usize) -> SrfResult<usize> {
        Ok(self.scheduler(cell_size)?.effective_interval())
    }

    /// Builds the granularity policy for a unit shape.
    pub fn granularity_policy(&self, kind: GranularityKind) -> SrfResult<GranularityPolicy> {
        GranularityPolicy::new(kind, self.granularity)
    }
}

/// Builder for [`RunConfig`].
#[derive(Clone, Debug, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Sets the checkpoint interval `K`.
    #[inline]
    pub fn interval(mut self, interval: usize) -> Self {
        self.config.interval = interval;
        self
    }

    /// Sets the granularity unit size `G`.
    #[inline]
    pub fn granularity(mut self, granularity: usize) -> Self {
        self.config.granularity = granularity;
        self
    }

    /// Sets the schedule mode.
    #[inline]
    pub fn schedule_mode(mut self, mode: ScheduleMode) -> Self {
        self.config.schedule_mode = mode;
        self
    }

    /// Sets the cache budget in KB (0 disables cache-budget mode).
    #[inline]
    pub fn cache_budget_kb(mut self, kb: usize) -> Self {
        self.config.cache_budget_kb = kb;
        self
    }

    /// Sets the backend.
    #[inline]
    pub fn backend(mut self, backend: BackendSelection) -> Self {
        self.config.backend = backend;
        self
    }

    /// Sets the DAG recompute depth multiplier.
    #[inline]
    pub fn recompute_depth(mut self, depth: u64) -> Self {
        self.config.recompute_depth = depth;
        self
    }

    /// Sets the DAG visitation order.
    #[inline]
    pub fn visit_order(mut self, order: VisitOrder) -> Self {
        self.config.visit_order = order;
        self
    }

    /// Sets the DAG relaxation-order check.
    #[inline]
    pub fn order_check(mut self, check: OrderCheck) -> Self {
        self.config.order_check = check;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
