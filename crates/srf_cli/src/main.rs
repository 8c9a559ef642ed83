//! SRF CLI - checkpointed dynamic programming with recompute metrics
//!
//! Runs one recompute engine over a loaded or synthetic instance and
//! reports its result alongside recomputation, memory and backend counters.
//!
//! # Commands
//!
//! - `srf forward` - HMM forward probability (sequential topology)
//! - `srf viterbi` - HMM best-path probability (sequential topology)
//! - `srf align` - Needleman-Wunsch score (grid topology)
//! - `srf graph` - DAG shortest path (DAG topology)
//! - `srf check` - Show the resolved backend and configuration
//!
//! # Configuration
//!
//! `srf.toml` (or `--config`) supplies defaults, `SRF_FORCE_CPU` and
//! `SRF_FORCE_GPU=1` pick the backend, command-line flags override both.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use srf_core::backend::Semiring;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod loader;
mod output;

pub use error::{CliError, Result};

use config::{BackendToggles, GraphArgs, RunArgs, Settings};
use output::OutputFormat;

/// Selective recomputation framework CLI
#[derive(Parser)]
#[command(name = "srf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path [default: srf.toml if present]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// HMM forward probability with checkpointed steps
    Forward {
        #[command(flatten)]
        run: RunArgs,

        /// Observation file (first token, A/C/G symbols)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// HMM best-path (Viterbi) probability with checkpointed steps
    Viterbi {
        #[command(flatten)]
        run: RunArgs,

        /// Observation file (first token, A/C/G symbols)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Needleman-Wunsch alignment score with row checkpoints
    Align {
        #[command(flatten)]
        run: RunArgs,

        /// The two string files to align
        #[arg(short, long, num_args = 2, value_names = ["A", "B"])]
        input: Vec<PathBuf>,

        /// Keep only two rows instead of checkpoint rows
        #[arg(long)]
        two_row: bool,
    },

    /// Single-pass DAG shortest path from node 0 to the highest node
    Graph {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        graph: GraphArgs,

        /// Edge list file (`from to weight` per line)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show the resolved backend and run configuration
    Check {
        #[command(flatten)]
        run: RunArgs,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn main() -> anyhow::Result<()> {
    let Cli {
        verbose,
        config,
        format,
        command,
    } = Cli::parse();

    init_tracing(verbose);
    if verbose {
        debug!("Verbose mode enabled");
    }

    let toggles = BackendToggles::from_env();
    let resolve = |run: &RunArgs, graph: &GraphArgs| {
        Settings::resolve(config.as_deref(), run, graph, toggles).context("failed to resolve run configuration")
    };
    let no_graph = GraphArgs::default();

    match command {
        Commands::Forward { run, input } => {
            let settings = resolve(&run, &no_graph)?;
            commands::sequential::run(&settings, input.as_deref(), Semiring::SumProduct, format)
                .context("forward run failed")
        }
        Commands::Viterbi { run, input } => {
            let settings = resolve(&run, &no_graph)?;
            commands::sequential::run(&settings, input.as_deref(), Semiring::MaxProduct, format)
                .context("viterbi run failed")
        }
        Commands::Align { run, input, two_row } => {
            let settings = resolve(&run, &no_graph)?;
            commands::align::run(&settings, &input, two_row, format).context("alignment run failed")
        }
        Commands::Graph { run, graph, input } => {
            let settings = resolve(&run, &graph)?;
            commands::graph::run(&settings, input.as_deref(), format).context("graph run failed")
        }
        Commands::Check { run } => {
            let settings = resolve(&run, &no_graph)?;
            commands::check::run(&settings, format).context("check failed")
        }
    }
}
