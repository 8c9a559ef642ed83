//! Run configuration for the CLI.
//!
//! Settings are layered: an optional TOML file gives defaults, the
//! `SRF_FORCE_CPU` / `SRF_FORCE_GPU` environment toggles pick the backend,
//! and command-line flags override both. The result is a validated
//! [`RunConfig`] with an explicit backend selection.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use serde::Deserialize;
use srf_core::backend::{BackendKind, BackendSelection};
use srf_core::checkpoint::ScheduleMode;
use srf_core::config::{DEFAULT_GRANULARITY, DEFAULT_INTERVAL};
use srf_core::problem::{OrderCheck, Scoring, VisitOrder};
use srf_core::{RunConfig, SrfError};
use thiserror::Error;
use tracing::debug;

use crate::{CliError, Result};

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "srf.toml";

/// Largest accepted magnitude of a scoring value.
pub const MAX_SCORE_MAGNITUDE: i64 = i32::MAX as i64;

/// Backend requested by the file or the `--backend` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Host execution
    #[default]
    Local,
    /// Simulated offload accelerator
    Accelerator,
}

impl From<BackendKind> for BackendChoice {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Local => Self::Local,
            BackendKind::SimulatedAccelerator => Self::Accelerator,
        }
    }
}

/// Node visit order flag for `graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScheduleArg {
    /// Ascending node id
    Natural,
    /// Even ids, then odd ids
    Interleaved,
}

impl From<ScheduleArg> for VisitOrder {
    fn from(arg: ScheduleArg) -> Self {
        match arg {
            ScheduleArg::Natural => VisitOrder::Natural,
            ScheduleArg::Interleaved => VisitOrder::Interleaved,
        }
    }
}

/// Flags shared by every run command.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Checkpoint interval K (tile size B for `align`)
    #[arg(short = 'k', long)]
    pub interval: Option<usize>,

    /// Indices per metrics unit
    #[arg(short, long)]
    pub granularity: Option<usize>,

    /// Halve the interval to favour locality
    #[arg(long)]
    pub locality: bool,

    /// Derive the interval from a cache budget in KB (0 disables)
    #[arg(long)]
    pub cache_budget_kb: Option<usize>,

    /// Backend to run on
    #[arg(long, value_enum)]
    pub backend: Option<BackendChoice>,

    /// Simulated device memory budget in KB (0 = unlimited)
    #[arg(long)]
    pub device_budget_kb: Option<usize>,

    /// Length of the synthetic instance used without --input
    #[arg(long)]
    pub seq_len: Option<usize>,

    /// Compare the result against the full-table baseline
    #[arg(long)]
    pub verify: bool,
}

/// Flags only the `graph` command takes.
#[derive(Args, Debug, Clone, Default)]
pub struct GraphArgs {
    /// Recompute depth charged per edge leaving a non-checkpoint node
    #[arg(long)]
    pub depth: Option<u64>,

    /// Node visit order
    #[arg(long, value_enum)]
    pub schedule: Option<ScheduleArg>,

    /// Skip the relaxation-order check
    #[arg(long)]
    pub trust_order: bool,
}

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(String),

    /// File is not valid TOML for this schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// One or more fields out of range
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Contents of `srf.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Checkpoint interval
    #[serde(default = "default_interval")]
    pub interval: usize,

    /// Metrics granularity
    #[serde(default = "default_granularity")]
    pub granularity: usize,

    /// Locality schedule mode
    #[serde(default)]
    pub locality: bool,

    /// Cache budget in KB
    #[serde(default)]
    pub cache_budget_kb: usize,

    /// Backend
    #[serde(default)]
    pub backend: BackendChoice,

    /// Simulated device memory budget in KB
    #[serde(default)]
    pub device_budget_kb: usize,

    /// Synthetic instance length
    #[serde(default = "default_seq_len")]
    pub seq_len: usize,

    /// Verify against the baseline
    #[serde(default)]
    pub verify: bool,

    /// DAG recompute depth
    #[serde(default = "default_recompute_depth")]
    pub recompute_depth: u64,

    /// DAG visit order
    #[serde(default)]
    pub schedule: VisitOrder,

    /// Skip the DAG relaxation-order check
    #[serde(default)]
    pub trust_order: bool,

    /// Alignment scoring
    #[serde(default)]
    pub scoring: Scoring,
}

fn default_interval() -> usize {
    DEFAULT_INTERVAL
}

fn default_granularity() -> usize {
    DEFAULT_GRANULARITY
}

fn default_seq_len() -> usize {
    1000
}

fn default_recompute_depth() -> u64 {
    1
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            granularity: default_granularity(),
            locality: false,
            cache_budget_kb: 0,
            backend: BackendChoice::Local,
            device_budget_kb: 0,
            seq_len: default_seq_len(),
            verify: false,
            recompute_depth: default_recompute_depth(),
            schedule: VisitOrder::Natural,
            trust_order: false,
            scoring: Scoring::default(),
        }
    }
}

/// Backend toggles read from the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendToggles {
    /// `SRF_FORCE_CPU` is set (any value).
    pub force_cpu: bool,
    /// `SRF_FORCE_GPU` equals `1`.
    pub force_gpu: bool,
}

impl BackendToggles {
    /// Reads the toggles from the process environment.
    pub fn from_env() -> Self {
        Self {
            force_cpu: std::env::var_os("SRF_FORCE_CPU").is_some(),
            force_gpu: std::env::var("SRF_FORCE_GPU").is_ok_and(|v| v == "1"),
        }
    }

    fn any(&self) -> bool {
        self.force_cpu || self.force_gpu
    }
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
    }

    /// Loads `path`, or `srf.toml` if present when no path is given.
    ///
    /// Returns the configuration and the file it came from.
    pub fn locate(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match path {
            Some(path) if !path.exists() => Err(CliError::FileNotFound(path.display().to_string())),
            Some(path) => Ok((Self::load(path)?, Some(path.to_path_buf()))),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Ok((Self::load(default)?, Some(default.to_path_buf())))
                } else {
                    debug!("no {} found, using defaults", DEFAULT_CONFIG_PATH);
                    Ok((Self::default(), None))
                }
            }
        }
    }

    /// Applies the environment backend toggles; force-CPU wins.
    pub fn with_toggles(mut self, toggles: BackendToggles) -> Self {
        if toggles.any() {
            let selection = BackendSelection::from_toggles(toggles.force_cpu, toggles.force_gpu, self.device_budget_kb);
            self.backend = selection.kind().into();
        }
        self
    }

    /// Applies command-line run flags over the file values.
    pub fn with_flags(mut self, flags: &RunArgs) -> Self {
        if let Some(interval) = flags.interval {
            self.interval = interval;
        }
        if let Some(granularity) = flags.granularity {
            self.granularity = granularity;
        }
        if let Some(kb) = flags.cache_budget_kb {
            self.cache_budget_kb = kb;
        }
        if let Some(backend) = flags.backend {
            self.backend = backend;
        }
        if let Some(kb) = flags.device_budget_kb {
            self.device_budget_kb = kb;
        }
        if let Some(len) = flags.seq_len {
            self.seq_len = len;
        }
        self.locality |= flags.locality;
        self.verify |= flags.verify;
        self
    }

    /// Applies `graph` flags over the file values.
    pub fn with_graph_flags(mut self, flags: &GraphArgs) -> Self {
        if let Some(depth) = flags.depth {
            self.recompute_depth = depth;
        }
        if let Some(schedule) = flags.schedule {
            self.schedule = schedule.into();
        }
        self.trust_order |= flags.trust_order;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigFileError> {
        let mut errors = Vec::new();

        if self.interval == 0 {
            errors.push("interval must be at least 1".to_string());
        }
        if self.granularity == 0 {
            errors.push("granularity must be at least 1".to_string());
        }
        if self.recompute_depth == 0 {
            errors.push("recompute_depth must be at least 1".to_string());
        }
        if self.seq_len == 0 {
            errors.push("seq_len must be at least 1".to_string());
        }
        if self.cache_budget_kb.checked_mul(1024).is_none() {
            errors.push(format!("cache_budget_kb {} is too large", self.cache_budget_kb));
        }
        let Scoring {
            match_score,
            mismatch,
            gap,
        } = self.scoring;
        for (name, value) in [("match_score", match_score), ("mismatch", mismatch), ("gap", gap)] {
            if value.unsigned_abs() > MAX_SCORE_MAGNITUDE.unsigned_abs() {
                errors.push(format!(
                    "scoring.{} {} is outside ±{}",
                    name, value, MAX_SCORE_MAGNITUDE
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigFileError::Validation(errors))
        }
    }

    /// Backend selection this configuration resolves to.
    pub fn backend_selection(&self) -> BackendSelection {
        match self.backend {
            BackendChoice::Local => BackendSelection::Local,
            BackendChoice::Accelerator => BackendSelection::SimulatedAccelerator {
                memory_budget_kb: self.device_budget_kb,
            },
        }
    }

    /// Builds the engine configuration.
    pub fn run_config(&self) -> Result<RunConfig> {
        let mode = if self.locality {
            ScheduleMode::Locality
        } else {
            ScheduleMode::Fixed
        };
        let order_check = if self.trust_order {
            OrderCheck::Trust
        } else {
            OrderCheck::Enforce
        };
        RunConfig::builder()
            .interval(self.interval)
            .granularity(self.granularity)
            .schedule_mode(mode)
            .cache_budget_kb(self.cache_budget_kb)
            .backend(self.backend_selection())
            .recompute_depth(self.recompute_depth)
            .visit_order(self.schedule)
            .order_check(order_check)
            .build()
            .map_err(|e| SrfError::from(e).into())
    }
}

/// Fully resolved settings for one command.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Engine configuration.
    pub run: RunConfig,
    /// Alignment scoring.
    pub scoring: Scoring,
    /// Synthetic instance length.
    pub seq_len: usize,
    /// Verify against the baseline.
    pub verify: bool,
    /// Config file the defaults came from.
    pub source: Option<PathBuf>,
    /// Environment toggles seen at startup.
    pub toggles: BackendToggles,
}

impl Settings {
    /// Resolves file, environment and flags into validated settings.
    pub fn resolve(
        path: Option<&Path>,
        flags: &RunArgs,
        graph: &GraphArgs,
        toggles: BackendToggles,
    ) -> Result<Self> {
        let (file, source) = FileConfig::locate(path)?;
        let file = file.with_toggles(toggles).with_flags(flags).with_graph_flags(graph);
        file.validate()?;
        let run = file.run_config()?;
        debug!(backend = %run.backend().kind(), interval = run.interval(), "resolved settings");
        Ok(Self {
            run,
            scoring: file.scoring,
            seq_len: file.seq_len,
            verify: file.verify,
            source,
            toggles,
        })
    }
}
