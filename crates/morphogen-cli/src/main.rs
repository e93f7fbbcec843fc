//! `morphogen` binary: command-line front end for the telemetry analyzer.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments
//! 2. Load configuration (`--config`, defaults otherwise)
//! 3. Initialize structured logging (tracing)
//! 4. Dispatch the subcommand
//!
//! Summaries go to stdout; logs go to stderr.

mod cli;
mod dashboard;
mod evaluate;
mod summarize;

use anyhow::Context;
use clap::Parser;
use morphogen_analysis::{AnalysisConfig, LogFormat};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AnalysisConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load config {}", path.display()),
        None => "failed to build default config".to_owned(),
    })?;

    let format = cli.log_format.map_or(config.logging.format, LogFormat::from);
    init_logging(&config.logging.level, format);
    info!(
        config = ?cli.config,
        trailing_events = ?config.reader.trailing_events,
        "morphogen starting"
    );

    match &cli.command {
        Command::Dashboard(args) => dashboard::run(args, &config),
        Command::Summarize(args) => summarize::run(args, &config),
        Command::Evaluate(args) => evaluate::run(args, &config),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
