//! `morphogen dashboard`: per-step CSV, lineage CSV, and chart spec.

use anyhow::Context;
use morphogen_analysis::{AnalysisConfig, analyze};
use morphogen_export::{
    build_chart_spec, build_lineage_rows, build_step_rows, validate_metrics, write_chart_spec,
    write_lineage_csv, write_step_csv,
};
use tracing::info;

use crate::cli::DashboardArgs;

/// Run the dashboard export.
pub fn run(args: &DashboardArgs, config: &AnalysisConfig) -> anyhow::Result<()> {
    let metrics = if args.metrics.is_empty() {
        config.export.chart_metrics.clone()
    } else {
        args.metrics.clone()
    };
    // Reject a bad metric selection before touching the filesystem.
    if args.chart_spec.is_some() {
        validate_metrics(&metrics).context("invalid chart metric selection")?;
    }

    let analysis = analyze(&args.telemetry, args.stimulus.as_deref(), config)
        .with_context(|| format!("failed to analyze {}", args.telemetry.display()))?;

    let rows = build_step_rows(&analysis);
    write_step_csv(&rows, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    if let Some(path) = &args.lineage_output {
        write_lineage_csv(&build_lineage_rows(&analysis), path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if let Some(path) = &args.chart_spec {
        let spec = build_chart_spec(&rows, &metrics)?;
        write_chart_spec(&spec, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    info!(
        steps = rows.len(),
        fitness = analysis.annotation.fitness_score,
        breach = analysis.annotation.breach_observed,
        output = %args.output.display(),
        "dashboard export complete"
    );
    Ok(())
}
