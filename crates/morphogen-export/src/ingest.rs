//! Reload an exported step table as a [`RunAnalysis`].
//!
//! Only the per-step metric columns are read; the run-level annotation
//! columns are recomputed from the rebuilt tables so that a table scored
//! under one [`ScoringConfig`] can be rescored under another. Extra
//! columns are ignored, so tables from older exports load as long as the
//! metric columns are present.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use morphogen_analysis::{ReaderStats, RunAnalysis, RunStats, ScoringConfig, annotate};
use morphogen_types::{StepMetrics, StepTable, StimulusEntry, StimulusTable};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::ExportError;

/// The step table columns needed to rebuild a run.
#[derive(Debug, Deserialize)]
struct MetricsRow {
    step: u64,
    threat_score: f64,
    cell_count: u64,
    replications: u64,
    stimulus_total: f64,
    signals_by_topic: String,
    lineage_shifts_by_lineage: String,
    stimulus_by_topic: String,
}

/// Load a step table written by [`write_step_csv`](crate::write_step_csv)
/// and score it.
///
/// # Errors
///
/// Returns [`ExportError::Read`] if the file cannot be opened or a row does
/// not decode, [`ExportError::Column`] for a malformed map column, and
/// [`ExportError::EmptyTable`] when there are no rows.
pub fn read_step_csv(path: &Path, scoring: &ScoringConfig) -> Result<RunAnalysis, ExportError> {
    let file = File::open(path).map_err(|source| ExportError::Read {
        path: path.to_path_buf(),
        source: source.into(),
    })?;
    analysis_from_csv(file, path, scoring)
}

/// Rebuild and score a run from step table CSV read from `reader`. `path`
/// names the input in errors.
///
/// # Errors
///
/// Same as [`read_step_csv`].
pub fn analysis_from_csv<R: Read>(
    reader: R,
    path: &Path,
    scoring: &ScoringConfig,
) -> Result<RunAnalysis, ExportError> {
    let mut steps = StepTable::new();
    let mut stimuli = StimulusTable::new();
    let mut rows = 0usize;

    for record in csv::Reader::from_reader(reader).deserialize::<MetricsRow>() {
        let row = record.map_err(|source| ExportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        rows = rows.saturating_add(1);

        let column_err = |column, source| ExportError::Column {
            path: path.to_path_buf(),
            step: row.step,
            column,
            source,
        };
        let signals = decode_map(&row.signals_by_topic)
            .map_err(|source| column_err("signals_by_topic", source))?;
        let lineage_shifts = decode_map(&row.lineage_shifts_by_lineage)
            .map_err(|source| column_err("lineage_shifts_by_lineage", source))?;
        let topics: BTreeMap<String, f64> = decode_map(&row.stimulus_by_topic)
            .map_err(|source| column_err("stimulus_by_topic", source))?;

        if !topics.is_empty() {
            stimuli.insert(
                row.step,
                StimulusEntry {
                    step: row.step,
                    total: row.stimulus_total,
                    topics,
                },
            );
        }
        let replaced = steps.insert(
            row.step,
            StepMetrics {
                step: row.step,
                threat_score: row.threat_score,
                cell_count: row.cell_count,
                replications: row.replications,
                signals,
                lineage_shifts,
            },
        );
        if replaced.is_some() {
            debug!(step = row.step, "duplicate step row; keeping the later one");
        }
    }

    if steps.is_empty() {
        return Err(ExportError::EmptyTable {
            path: path.to_path_buf(),
        });
    }

    let stats = RunStats::from_tables(&steps, &stimuli);
    let annotation = annotate(&stats, scoring);
    info!(
        path = %path.display(),
        steps = stats.step_count,
        fitness = annotation.fitness_score,
        "step table reloaded"
    );
    Ok(RunAnalysis {
        source: path.display().to_string(),
        steps,
        stimuli,
        stats,
        annotation,
        reader: ReaderStats {
            lines_read: rows,
            records: rows,
            ..ReaderStats::default()
        },
        first_timestamp_ms: None,
        last_timestamp_ms: None,
    })
}

/// Decode a JSON object column. An empty cell is an empty map.
fn decode_map<V: DeserializeOwned>(raw: &str) -> Result<BTreeMap<String, V>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const HEADER: &str = "step,threat_score,cell_count,replications,stimulus_total,signals_by_topic,lineage_shifts_by_lineage,stimulus_by_topic\n";

    fn load(body: &str) -> Result<RunAnalysis, ExportError> {
        let input = format!("{HEADER}{body}");
        analysis_from_csv(
            Cursor::new(input),
            Path::new("inline.csv"),
            &ScoringConfig::default(),
        )
    }

    #[test]
    fn rebuilds_stats_from_rows() {
        let analysis = load(concat!(
            "0,0.5,10,2,0.0,\"{\"\"alarm\"\":1}\",{},{}\n",
            "1,1.0,8,0,0.75,{},\"{\"\"Healer\"\":2}\",\"{\"\"activator\"\":0.75}\"\n",
        ))
        .unwrap();

        let stats = &analysis.stats;
        assert_eq!(stats.step_count, 2);
        assert_eq!(stats.total_replications, 2);
        assert_eq!(stats.total_signals, 1);
        assert_eq!(stats.total_lineage_shifts, 2);
        assert_eq!(stats.min_cell_count, 8);
        assert!((stats.max_threat - 1.0).abs() < 1e-12);
        assert!((stats.stimulus_for("activator") - 0.75).abs() < 1e-12);
        assert_eq!(analysis.stimuli.len(), 1);
        assert!(analysis.annotation.recommended_mutation.is_some());
    }

    #[test]
    fn extra_columns_are_ignored() {
        let input = concat!(
            "step,threat_score,cell_count,replications,stimulus_total,signals_by_topic,",
            "lineage_shifts_by_lineage,stimulus_by_topic,fitness_score\n",
            "3,0.2,4,1,0.0,{},{},{},0.9\n",
        );
        let result = analysis_from_csv(
            Cursor::new(input),
            Path::new("inline.csv"),
            &ScoringConfig::default(),
        );
        let analysis = result.unwrap();
        assert_eq!(analysis.steps.keys().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn header_only_table_is_rejected() {
        assert!(matches!(load(""), Err(ExportError::EmptyTable { .. })));
    }

    #[test]
    fn malformed_map_column_names_the_step() {
        let result = load("7,0.1,3,0,0.0,not-json,{},{}\n");
        assert!(matches!(
            result,
            Err(ExportError::Column { step: 7, column: "signals_by_topic", .. })
        ));
    }

    #[test]
    fn missing_column_is_a_read_error() {
        let result = analysis_from_csv(
            Cursor::new("step,threat_score\n0,0.1\n"),
            Path::new("inline.csv"),
            &ScoringConfig::default(),
        );
        assert!(matches!(result, Err(ExportError::Read { .. })));
    }
}
