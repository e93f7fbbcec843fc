//! `morphogen summarize`: per-file and aggregate run summaries.

use std::collections::BTreeMap;
use std::fmt::{Display, Write as _};

use anyhow::Context;
use morphogen_analysis::{
    AnalysisConfig, AnalysisError, FitnessAnnotation, RunStats, analyze, annotate,
};
use morphogen_types::{StepTable, StimulusTable};
use tracing::warn;

use crate::cli::SummarizeArgs;

/// Summarize each file, then the merged totals.
pub fn run(args: &SummarizeArgs, config: &AnalysisConfig) -> anyhow::Result<()> {
    let mut config = config.clone();
    if args.limit.is_some() {
        config.reader.line_limit = args.limit;
    }

    let mut merged = RunStats::default();
    let mut summarized = 0usize;
    for path in &args.telemetry {
        let analysis = match analyze(path, args.stimulus.as_deref(), &config) {
            Ok(analysis) => analysis,
            Err(AnalysisError::MissingInput { path: missing }) if missing == *path => {
                warn!(path = %path.display(), "skipping missing file");
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to analyze {}", path.display()));
            }
        };

        let mut title = format!("Telemetry Summary: {}", path.display());
        if let Some((start, end)) = analysis.time_span() {
            let _ = write!(title, " ({} -> {})", start.to_rfc3339(), end.to_rfc3339());
        }
        print!(
            "{}",
            render(&title, analysis.reader.records, &analysis.stats, &analysis.annotation)
        );
        if args.per_step && !analysis.is_empty() {
            println!("{}", render_steps(&analysis.steps, &analysis.stimuli));
        }
        merged = merged.merge(&analysis.stats);
        summarized = summarized.saturating_add(1);
    }

    if summarized > 0 {
        let annotation = annotate(&merged, &config.scoring);
        print!("{}", render("Aggregate Summary", summarized, &merged, &annotation));
    }
    Ok(())
}

/// Format one summary block. `count` is records for a file, or files for
/// the aggregate.
fn render(title: &str, count: usize, stats: &RunStats, annotation: &FitnessAnnotation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {title} ===");
    let _ = writeln!(out, "Records: {count} | Steps: {}", stats.step_count);
    let _ = writeln!(
        out,
        "Replications: {} | Lineage shifts: {} | Signals: {}",
        stats.total_replications, stats.total_lineage_shifts, stats.total_signals
    );
    let _ = writeln!(
        out,
        "Threat: avg {:.2} (max {:.2}) | Cells: min {} -> max {} (avg {:.2})",
        stats.avg_threat(),
        stats.max_threat,
        stats.min_cell_count,
        stats.max_cell_count,
        stats.avg_cell_count()
    );
    if !stats.lineage_by_type.is_empty() {
        let _ = writeln!(out, "Lineage transitions:");
        for (lineage, count) in &stats.lineage_by_type {
            let _ = writeln!(out, "  - {lineage}: {count}");
        }
    }
    let _ = writeln!(
        out,
        "Fitness: {:.3} | breach={}",
        annotation.fitness_score, annotation.breach_observed
    );
    if let Some(mutation) = &annotation.recommended_mutation {
        let _ = writeln!(out, "Recommended mutation: {mutation}");
    }
    out.push('\n');
    out
}

/// Per-step table: one row per finalized step, stimulus alongside.
fn render_steps(steps: &StepTable, stimuli: &StimulusTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Step | Threat | Cells | Replications | Signals   | Lineage Shifts | Stimuli"
    );
    let _ = writeln!(
        out,
        "-----|--------|-------|--------------|-----------|----------------|--------"
    );
    for (step, metrics) in steps {
        let stimulus = stimuli.get(step).map_or_else(
            || "none".to_owned(),
            |entry| format!("total={:.2} ({})", entry.total, format_pairs(&entry.topics)),
        );
        let _ = writeln!(
            out,
            "{step:>4} | {:>6.2} | {:>5} | {:>12} | {:<9} | {:<14} | {stimulus}",
            metrics.threat_score,
            metrics.cell_count,
            metrics.replications,
            format_pairs(&metrics.signals),
            format_pairs(&metrics.lineage_shifts),
        );
    }
    out
}

/// `key:value` pairs in key order, or `-` when empty.
fn format_pairs<V: Display>(pairs: &BTreeMap<String, V>) -> String {
    if pairs.is_empty() {
        return "-".to_owned();
    }
    pairs
        .iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
