//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use morphogen_analysis::LogFormat;

/// Morphogen telemetry analyzer.
#[derive(Debug, Parser)]
#[command(name = "morphogen")]
#[command(about = "Aggregate simulation telemetry, score runs, and steer mutation search", long_about = None)]
#[command(version)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, env = "MORPHOGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format. Overrides `logging.format` in the config.
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormatArg>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Log format as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build dashboard tables and a chart spec from one run.
    Dashboard(DashboardArgs),
    /// Print per-file and aggregate summaries for one or more runs.
    Summarize(SummarizeArgs),
    /// Score one run against the mutation harness.
    Evaluate(EvaluateArgs),
}

/// Arguments for `morphogen dashboard`.
#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Telemetry JSONL file.
    pub telemetry: PathBuf,

    /// Stimulus JSONL file keyed by step.
    #[arg(long)]
    pub stimulus: Option<PathBuf>,

    /// Destination for the per-step CSV.
    #[arg(long, short)]
    pub output: PathBuf,

    /// Destination for the Vega-Lite chart spec.
    #[arg(long)]
    pub chart_spec: Option<PathBuf>,

    /// Step columns to chart. Defaults to `export.chart_metrics`.
    #[arg(long, num_args = 1..)]
    pub metrics: Vec<String>,

    /// Destination for the long-form lineage CSV.
    #[arg(long)]
    pub lineage_output: Option<PathBuf>,
}

/// Arguments for `morphogen summarize`.
#[derive(Debug, Args)]
pub struct SummarizeArgs {
    /// Telemetry JSONL files.
    #[arg(required = true)]
    pub telemetry: Vec<PathBuf>,

    /// Read at most this many lines from each file.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Stimulus JSONL file applied to every telemetry file.
    #[arg(long)]
    pub stimulus: Option<PathBuf>,

    /// Also print a per-step table for each file.
    #[arg(long)]
    pub per_step: bool,
}

/// Arguments for `morphogen evaluate`.
#[derive(Debug, Args)]
pub struct EvaluateArgs {
    /// Telemetry JSONL file produced by the candidate's run.
    #[arg(required_unless_present = "metrics_csv")]
    pub telemetry: Option<PathBuf>,

    /// Step CSV written by `dashboard`, evaluated instead of telemetry.
    #[arg(long, conflicts_with = "telemetry")]
    pub metrics_csv: Option<PathBuf>,

    /// Stimulus JSONL file the run was driven with.
    #[arg(long, conflicts_with = "metrics_csv")]
    pub stimulus: Option<PathBuf>,

    /// Candidate identifier.
    #[arg(long)]
    pub candidate_id: String,

    /// Scenario manifest or seed the candidate ran.
    #[arg(long = "scenario")]
    pub scenario_ref: String,

    /// Candidate generation.
    #[arg(long, default_value_t = 0)]
    pub generation: u32,

    /// Harness state file, loaded if present and saved afterwards.
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Write the evaluation as JSON to this path.
    #[arg(long)]
    pub emit_json: Option<PathBuf>,

    /// Batch size for a newly created harness.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Outcome history length for a newly created harness.
    #[arg(long)]
    pub max_generations: Option<u32>,
}
