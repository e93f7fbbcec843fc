//! Per-step stimulus totals from the optional stimulus log.

use std::path::Path;

use morphogen_types::{StimulusEntry, StimulusRecord, StimulusTable};
use tracing::debug;

use crate::error::AnalysisError;
use crate::reader::StimulusReader;

/// Fold stimulus records into per-step totals keyed by each record's `step`.
///
/// # Errors
///
/// Propagates the first I/O error yielded by the stream.
pub fn aggregate_stimuli<I>(records: I) -> Result<StimulusTable, AnalysisError>
where
    I: IntoIterator<Item = Result<StimulusRecord, AnalysisError>>,
{
    let mut table = StimulusTable::new();
    for record in records {
        let record = record?;
        table
            .entry(record.step)
            .or_insert_with(|| StimulusEntry::new(record.step))
            .add(&record.topic, record.value);
    }
    Ok(table)
}

/// Load and fold a stimulus log. No path yields an empty table.
///
/// # Errors
///
/// Returns [`AnalysisError::MissingInput`] when a path is given but does not
/// exist, or any I/O error raised while reading it.
pub fn load_stimuli(
    path: Option<&Path>,
    line_limit: Option<usize>,
) -> Result<StimulusTable, AnalysisError> {
    let Some(path) = path else {
        return Ok(StimulusTable::new());
    };
    let reader = StimulusReader::open(path)?.with_line_limit(line_limit);
    let table = aggregate_stimuli(reader)?;
    debug!(path = %path.display(), steps = table.len(), "stimulus log loaded");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(step: u64, topic: &str, value: f64) -> Result<StimulusRecord, AnalysisError> {
        Ok(StimulusRecord {
            step,
            topic: topic.to_owned(),
            value,
            duration: 1,
        })
    }

    #[test]
    fn groups_by_step_and_topic() {
        let table = aggregate_stimuli(vec![
            record(2, "activator", 0.5),
            record(2, "inhibitor", 0.25),
            record(2, "activator", 0.5),
            record(5, "inhibitor", 1.0),
        ]);
        assert!(table.is_ok());
        let table = table.unwrap_or_default();

        assert_eq!(table.len(), 2);
        let entry = table.get(&2);
        assert!(entry.is_some_and(|e| (e.total - 1.25).abs() < 1e-12));
        assert!(entry
            .and_then(|e| e.topics.get("activator"))
            .is_some_and(|v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn no_path_is_empty() {
        let table = load_stimuli(None, None);
        assert!(matches!(table, Ok(ref t) if t.is_empty()));
    }

    #[test]
    fn missing_path_is_fatal() {
        let table = load_stimuli(Some(Path::new("/no/such/stimulus.jsonl")), None);
        assert!(matches!(table, Err(AnalysisError::MissingInput { .. })));
    }
}
