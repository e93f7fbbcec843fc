//! `morphogen evaluate`: score one candidate run and update the harness.

use std::fs;
use std::path::Path;

use anyhow::Context;
use morphogen_analysis::{
    AnalysisConfig, AttackCandidate, Evaluation, MutationHarness, RunAnalysis, analyze,
};
use morphogen_export::read_step_csv;
use serde_json::{Value, json};
use tracing::info;

use crate::cli::EvaluateArgs;

/// Evaluate the candidate named in `args`.
pub fn run(args: &EvaluateArgs, config: &AnalysisConfig) -> anyhow::Result<()> {
    let analysis = load_analysis(args, config)?;

    let mut harness = open_harness(args, config)?;
    let candidate = AttackCandidate {
        id: args.candidate_id.clone(),
        scenario_ref: args.scenario_ref.clone(),
        stimulus_ref: args
            .stimulus
            .as_ref()
            .map(|path| path.display().to_string()),
        generation: args.generation,
        parent_id: None,
        mutation: None,
    };
    let evaluation = harness.evaluate(candidate, &analysis);

    print!("{}", render(&analysis, &evaluation, harness.backlog_len()));

    if let Some(path) = &args.emit_json {
        write_json(path, &analysis, &evaluation)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if let Some(path) = &args.state {
        harness
            .save_state(path)
            .with_context(|| format!("failed to save harness state {}", path.display()))?;
        info!(path = %path.display(), backlog = harness.backlog_len(), "harness state saved");
    }
    Ok(())
}

/// Score the run from telemetry, or from a previously exported step table.
fn load_analysis(args: &EvaluateArgs, config: &AnalysisConfig) -> anyhow::Result<RunAnalysis> {
    if let Some(path) = &args.metrics_csv {
        return read_step_csv(path, &config.scoring)
            .with_context(|| format!("failed to load step table {}", path.display()));
    }
    let Some(telemetry) = &args.telemetry else {
        anyhow::bail!("either a telemetry file or --metrics-csv is required");
    };
    analyze(telemetry, args.stimulus.as_deref(), config)
        .with_context(|| format!("failed to analyze {}", telemetry.display()))
}

/// Load the harness from `--state` when the file exists, otherwise build a
/// fresh one from config and command-line overrides.
fn open_harness(args: &EvaluateArgs, config: &AnalysisConfig) -> anyhow::Result<MutationHarness> {
    if let Some(path) = &args.state
        && path.exists()
    {
        let harness = MutationHarness::load_state(path)
            .with_context(|| format!("failed to load harness state {}", path.display()))?;
        if args.batch_size.is_some() || args.max_generations.is_some() {
            info!("existing harness loaded; configuration overrides ignored");
        }
        return Ok(harness);
    }

    let mut harness_config = config.harness.clone();
    if let Some(batch_size) = args.batch_size {
        anyhow::ensure!(batch_size > 0, "--batch-size must be at least 1");
        harness_config.batch_size = batch_size;
    }
    if let Some(max_generations) = args.max_generations {
        harness_config.max_generations = max_generations;
    }
    info!(
        batch_size = harness_config.batch_size,
        max_generations = harness_config.max_generations,
        retain_elite = harness_config.retain_elite,
        "initialising new harness"
    );
    Ok(MutationHarness::new(harness_config))
}

fn render(analysis: &RunAnalysis, evaluation: &Evaluation, backlog_len: usize) -> String {
    let stats = &analysis.stats;
    let outcome = &evaluation.outcome;
    let mut lines = vec![
        "=== Harness Evaluation ===".to_owned(),
        format!(
            "Candidate `{}` generation {} => fitness {:.3} | breach={}",
            outcome.candidate.id,
            outcome.candidate.generation,
            outcome.fitness_score,
            outcome.breach_observed
        ),
        format!(
            "Steps: {} | avg threat {:.2} (max {:.2}) | replications {} | signals {} | stimulus {:.2}",
            stats.step_count,
            stats.avg_threat(),
            stats.max_threat,
            stats.total_replications,
            stats.total_signals,
            stats.total_stimulus
        ),
        format!(
            "Cell count range: min {} -> max {} | avg {:.2}",
            stats.min_cell_count,
            stats.max_cell_count,
            stats.avg_cell_count()
        ),
    ];
    match &analysis.annotation.recommended_mutation {
        Some(mutation) => lines.push(format!("Recommended mutation: {mutation}")),
        None if evaluation.requeued => {
            lines.push("Recommended mutation: none (candidate retained)".to_owned());
        }
        None => lines.push("Recommended mutation: none".to_owned()),
    }
    if let Some(next) = &evaluation.next_candidate {
        lines.push(format!(
            "Queued follow-up candidate `{}` (generation {})",
            next.id, next.generation
        ));
    }
    lines.push(format!("Harness backlog size after evaluation: {backlog_len}"));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn payload(analysis: &RunAnalysis, evaluation: &Evaluation) -> Value {
    let stats = &analysis.stats;
    let outcome = &evaluation.outcome;
    json!({
        "outcome": {
            "candidate_id": outcome.candidate.id,
            "generation": outcome.candidate.generation,
            "fitness_score": outcome.fitness_score,
            "breach_observed": outcome.breach_observed,
            "notes": outcome.notes,
            "stimulus_ref": outcome.candidate.stimulus_ref,
        },
        "statistics": {
            "step_count": stats.step_count,
            "avg_threat": stats.avg_threat(),
            "max_threat": stats.max_threat,
            "avg_cell_count": stats.avg_cell_count(),
            "min_cell_count": stats.min_cell_count,
            "max_cell_count": stats.max_cell_count,
            "total_replications": stats.total_replications,
            "total_signals": stats.total_signals,
            "total_lineage_shifts": stats.total_lineage_shifts,
            "total_stimulus": stats.total_stimulus,
            "signals_by_topic": stats.signals_by_topic,
            "lineage_by_type": stats.lineage_by_type,
            "stimuli_by_topic": stats.stimuli_by_topic,
        },
        "annotation": analysis.annotation,
        "recommended_mutation": analysis.annotation.recommended_mutation,
        "next_candidate": evaluation.next_candidate,
    })
}

fn write_json(path: &Path, analysis: &RunAnalysis, evaluation: &Evaluation) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut body = serde_json::to_string_pretty(&payload(analysis, evaluation))?;
    body.push('\n');
    fs::write(path, body)?;
    info!(path = %path.display(), "evaluation JSON written");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use morphogen_analysis::{EvolutionConfig, TelemetryReader, analyze_reader};
    use morphogen_types::StimulusTable;

    use super::*;

    const RUN: &str = concat!(
        r#"{"timestamp_ms": 1, "event": {"StepSummary": {"step": 0, "threat_score": 0.1, "cell_count": 10}}}"#,
        "\n",
        r#"{"timestamp_ms": 2, "event": {"StepSummary": {"step": 1, "threat_score": 0.1, "cell_count": 10}}}"#,
        "\n",
    );

    fn evaluated() -> (RunAnalysis, Evaluation) {
        let reader = TelemetryReader::new(Cursor::new(RUN), "inline");
        let analysis = analyze_reader(reader, StimulusTable::new(), &AnalysisConfig::default())
            .unwrap();
        let mut harness = MutationHarness::new(EvolutionConfig::default());
        let evaluation = harness.evaluate(AttackCandidate::seed("seed", "s.yaml"), &analysis);
        (analysis, evaluation)
    }

    #[test]
    fn payload_carries_outcome_and_next_candidate() {
        let (analysis, evaluation) = evaluated();
        let value = payload(&analysis, &evaluation);

        assert_eq!(value["outcome"]["candidate_id"], "seed");
        assert_eq!(value["statistics"]["step_count"], 2);
        // A quiet run has low fitness, so a mutant is always queued.
        assert_eq!(value["next_candidate"]["id"], "seed-mut1");
    }

    #[test]
    fn render_mentions_follow_up() {
        let (analysis, evaluation) = evaluated();
        let text = render(&analysis, &evaluation, 1);
        assert!(text.contains("Candidate `seed` generation 0"));
        assert!(text.contains("Queued follow-up candidate `seed-mut1` (generation 1)"));
        assert!(text.ends_with("Harness backlog size after evaluation: 1\n"));
    }
}
