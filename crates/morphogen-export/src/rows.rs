//! Flat per-step rows for the dashboard table.
//!
//! Each [`StepRow`] joins one step's metrics with its stimulus entry and the
//! run-level fitness annotation. Category maps are carried as compact JSON
//! objects so the table stays one row per step.

use std::collections::BTreeMap;

use morphogen_analysis::RunAnalysis;
use morphogen_types::{sum_counts, top_count};
use serde::Serialize;

/// Column names of the step table, in output order.
pub const STEP_COLUMNS: &[&str] = &[
    "step",
    "threat_score",
    "cell_count",
    "replications",
    "signals_total",
    "lineage_shifts_total",
    "stimulus_total",
    "top_signal_topic",
    "top_signal_count",
    "top_lineage",
    "top_lineage_count",
    "signals_by_topic",
    "lineage_shifts_by_lineage",
    "stimulus_by_topic",
    "lineage_pressure",
    "lineage_focus_ratio",
    "lineage_component",
    "fitness_score",
    "breach_observed",
    "recommended_mutation",
];

/// Column names of the long-form lineage table.
pub const LINEAGE_COLUMNS: &[&str] = &["step", "lineage", "count"];

/// One dashboard row. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRow {
    /// Step number.
    pub step: u64,
    /// Threat score at the boundary.
    pub threat_score: f64,
    /// Cell count at the boundary.
    pub cell_count: u64,
    /// Replications during the step.
    pub replications: u64,
    /// Signals during the step.
    pub signals_total: u64,
    /// Lineage shifts during the step.
    pub lineage_shifts_total: u64,
    /// Stimulus applied at the step.
    pub stimulus_total: f64,
    /// Most frequent signal topic, empty when none.
    pub top_signal_topic: String,
    /// Count for `top_signal_topic`.
    pub top_signal_count: u64,
    /// Most frequent lineage, empty when none.
    pub top_lineage: String,
    /// Count for `top_lineage`.
    pub top_lineage_count: u64,
    /// Signal counts by topic as JSON.
    pub signals_by_topic: String,
    /// Lineage shift counts by lineage as JSON.
    pub lineage_shifts_by_lineage: String,
    /// Stimulus sums by topic as JSON.
    pub stimulus_by_topic: String,
    /// Run-level lineage pressure.
    pub lineage_pressure: f64,
    /// Run-level lineage focus ratio.
    pub lineage_focus_ratio: f64,
    /// Run-level lineage component.
    pub lineage_component: f64,
    /// Run-level fitness.
    pub fitness_score: f64,
    /// Run-level breach flag.
    pub breach_observed: bool,
    /// Run-level recommendation, empty when none.
    pub recommended_mutation: String,
}

/// One `(step, lineage, count)` row of the lineage table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageRow {
    /// Step number.
    pub step: u64,
    /// Lineage name.
    pub lineage: String,
    /// Shifts into the lineage during the step.
    pub count: u64,
}

/// Round to six decimal places for stable CSV output.
fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Compact JSON for a string-keyed map. Keys come out sorted.
fn encode_map<V: Serialize>(map: &BTreeMap<String, V>) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| String::from("{}"))
}

/// Build one row per step in ascending step order.
pub fn build_step_rows(analysis: &RunAnalysis) -> Vec<StepRow> {
    let annotation = &analysis.annotation;
    let empty_topics = BTreeMap::new();

    analysis
        .steps
        .values()
        .map(|metrics| {
            let stimulus = analysis.stimuli.get(&metrics.step);
            let (top_signal_topic, top_signal_count) =
                top_count(&metrics.signals).unwrap_or(("", 0));
            let (top_lineage, top_lineage_count) =
                top_count(&metrics.lineage_shifts).unwrap_or(("", 0));

            StepRow {
                step: metrics.step,
                threat_score: metrics.threat_score,
                cell_count: metrics.cell_count,
                replications: metrics.replications,
                signals_total: sum_counts(&metrics.signals),
                lineage_shifts_total: sum_counts(&metrics.lineage_shifts),
                stimulus_total: stimulus.map_or(0.0, |entry| entry.total),
                top_signal_topic: top_signal_topic.to_owned(),
                top_signal_count,
                top_lineage: top_lineage.to_owned(),
                top_lineage_count,
                signals_by_topic: encode_map(&metrics.signals),
                lineage_shifts_by_lineage: encode_map(&metrics.lineage_shifts),
                stimulus_by_topic: encode_map(
                    stimulus.map_or(&empty_topics, |entry| &entry.topics),
                ),
                lineage_pressure: round6(annotation.lineage_pressure),
                lineage_focus_ratio: round6(annotation.lineage_focus_ratio),
                lineage_component: round6(annotation.lineage_component),
                fitness_score: round6(annotation.fitness_score),
                breach_observed: annotation.breach_observed,
                recommended_mutation: annotation.recommended_mutation.clone().unwrap_or_default(),
            }
        })
        .collect()
}

/// Long-form lineage rows: one per step and lineage with a nonzero count.
pub fn build_lineage_rows(analysis: &RunAnalysis) -> Vec<LineageRow> {
    analysis
        .steps
        .values()
        .flat_map(|metrics| {
            metrics
                .lineage_shifts
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(lineage, count)| LineageRow {
                    step: metrics.step,
                    lineage: lineage.clone(),
                    count: *count,
                })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use morphogen_analysis::{AnalysisConfig, TelemetryReader, analyze_reader};
    use morphogen_types::{StimulusEntry, StimulusTable};

    use super::*;

    const RUN: &str = concat!(
        r#"{"timestamp_ms": 1, "event": {"SignalEmitted": {"topic": "repair"}}}"#,
        "\n",
        r#"{"timestamp_ms": 2, "event": {"SignalEmitted": {"topic": "alarm"}}}"#,
        "\n",
        r#"{"timestamp_ms": 3, "event": {"LineageShift": {"cell_id": "a", "lineage": "Scout"}}}"#,
        "\n",
        r#"{"timestamp_ms": 4, "event": {"StepSummary": {"step": 2, "threat_score": 0.25, "cell_count": 7}}}"#,
        "\n",
        r#"{"timestamp_ms": 5, "event": {"StepSummary": {"step": 1, "threat_score": 0.5, "cell_count": 9}}}"#,
        "\n",
    );

    fn analysis(stimuli: StimulusTable) -> RunAnalysis {
        let reader = TelemetryReader::new(Cursor::new(RUN), "inline");
        let result = analyze_reader(reader, stimuli, &AnalysisConfig::default());
        result.unwrap()
    }

    #[test]
    fn rows_follow_step_order_and_columns() {
        let mut stimuli = StimulusTable::new();
        let mut entry = StimulusEntry::new(2);
        entry.add("inhibitor", 0.5);
        stimuli.insert(2, entry);

        let rows = build_step_rows(&analysis(stimuli));
        assert_eq!(rows.iter().map(|r| r.step).collect::<Vec<_>>(), vec![1, 2]);

        let step2 = rows.get(1);
        assert_eq!(step2.map(|r| r.signals_total), Some(2));
        // Tie between alarm and repair goes to the smaller key.
        assert_eq!(step2.map(|r| r.top_signal_topic.as_str()), Some("alarm"));
        assert_eq!(step2.map(|r| r.signals_by_topic.as_str()), Some(r#"{"alarm":1,"repair":1}"#));
        assert_eq!(step2.map(|r| r.stimulus_by_topic.as_str()), Some(r#"{"inhibitor":0.5}"#));

        let step1 = rows.first();
        assert_eq!(step1.map(|r| r.top_lineage.as_str()), Some(""));
        assert_eq!(step1.map(|r| r.top_lineage_count), Some(0));
        assert_eq!(step1.map(|r| r.stimulus_by_topic.as_str()), Some("{}"));
    }

    #[test]
    fn annotation_repeats_on_each_row() {
        let rows = build_step_rows(&analysis(StimulusTable::new()));
        let scores: Vec<f64> = rows.iter().map(|r| r.fitness_score).collect();
        assert_eq!(scores.len(), 2);
        assert!(scores.windows(2).all(|w| match w {
            [a, b] => (a - b).abs() < f64::EPSILON,
            _ => false,
        }));
    }

    #[test]
    fn lineage_rows_skip_empty_steps() {
        let rows = build_lineage_rows(&analysis(StimulusTable::new()));
        assert_eq!(
            rows,
            vec![LineageRow {
                step: 2,
                lineage: "Scout".to_owned(),
                count: 1,
            }]
        );
    }

    #[test]
    fn round6_truncates_noise() {
        assert!((round6(0.123_456_789) - 0.123_457).abs() < 1e-12);
        assert_eq!(STEP_COLUMNS.len(), 20);
    }
}
