//! Single entry point for analyzing one telemetry run.
//!
//! Reads the telemetry log through the step aggregator, folds the optional
//! stimulus log, then computes statistics, scores, and a recommendation.
//! The telemetry input is opened first so that a missing log fails before
//! any other work is done.

use std::io::BufRead;
use std::path::Path;

use chrono::{DateTime, Utc};
use morphogen_types::{StepTable, StimulusTable};
use serde::Serialize;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::fitness::{self, FitnessAnnotation};
use crate::reader::{ReaderStats, TelemetryReader};
use crate::stats::RunStats;
use crate::step::StepAggregator;
use crate::stimulus::load_stimuli;

/// Everything derived from one telemetry run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunAnalysis {
    /// Name of the telemetry input.
    pub source: String,
    /// Finalized steps keyed by step number.
    pub steps: StepTable,
    /// Stimulus totals keyed by step number.
    pub stimuli: StimulusTable,
    /// Run-level statistics.
    pub stats: RunStats,
    /// Scores and recommendation.
    pub annotation: FitnessAnnotation,
    /// Telemetry line accounting.
    pub reader: ReaderStats,
    /// Timestamp of the first record, if any.
    pub first_timestamp_ms: Option<u64>,
    /// Timestamp of the last record, if any.
    pub last_timestamp_ms: Option<u64>,
}

impl RunAnalysis {
    /// Whether no step boundary was found.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Wall-clock span covered by the log, first record to last.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = millis_to_datetime(self.first_timestamp_ms?)?;
        let end = millis_to_datetime(self.last_timestamp_ms?)?;
        Some((start, end))
    }
}

fn millis_to_datetime(ms: u64) -> Option<DateTime<Utc>> {
    i64::try_from(ms).ok().and_then(DateTime::from_timestamp_millis)
}

/// Analyze a telemetry file and optional stimulus file.
///
/// # Errors
///
/// Returns [`AnalysisError::MissingInput`] if either supplied file is
/// missing, or an I/O error raised while reading.
pub fn analyze(
    telemetry: &Path,
    stimulus: Option<&Path>,
    config: &AnalysisConfig,
) -> Result<RunAnalysis, AnalysisError> {
    let reader = TelemetryReader::open(telemetry)?;
    let stimuli = load_stimuli(stimulus, config.reader.line_limit)?;
    analyze_reader(reader, stimuli, config)
}

/// Analyze an already-open telemetry reader against pre-loaded stimuli.
///
/// # Errors
///
/// Returns the first I/O error yielded by the reader.
pub fn analyze_reader<R: BufRead>(
    reader: TelemetryReader<R>,
    stimuli: StimulusTable,
    config: &AnalysisConfig,
) -> Result<RunAnalysis, AnalysisError> {
    let mut reader = reader.with_line_limit(config.reader.line_limit);
    let mut aggregator = StepAggregator::new(config.reader.trailing_events);
    let mut first_timestamp_ms = None;
    let mut last_timestamp_ms = None;

    for record in reader.by_ref() {
        let record = record?;
        first_timestamp_ms.get_or_insert(record.timestamp_ms);
        last_timestamp_ms = Some(record.timestamp_ms);
        aggregator.push(record.event);
    }
    let steps = aggregator.finish();

    let stats = RunStats::from_tables(&steps, &stimuli);
    let annotation = fitness::annotate(&stats, &config.scoring);
    let analysis = RunAnalysis {
        source: reader.source().to_owned(),
        steps,
        stimuli,
        stats,
        annotation,
        reader: reader.stats(),
        first_timestamp_ms,
        last_timestamp_ms,
    };

    if analysis.is_empty() {
        info!(
            source = %analysis.source,
            lines = analysis.reader.lines_read,
            "no step boundaries found; run is empty"
        );
    } else {
        info!(
            source = %analysis.source,
            steps = analysis.stats.step_count,
            fitness = analysis.annotation.fitness_score,
            breach = analysis.annotation.breach_observed,
            skipped = analysis.reader.malformed,
            "run analyzed"
        );
    }
    Ok(analysis)
}
