//! Boundary-driven step aggregation.
//!
//! The aggregator alternates between two phases. While accumulating, every
//! non-boundary event is appended to a buffer. When a `StepSummary` arrives
//! the buffer is digested into a [`StepMetrics`] keyed by the summary's own
//! `step` number, stored, and cleared. Event position never determines the
//! step.
//!
//! Events left in the buffer when the stream ends are handled according to
//! [`TrailingEvents`].

use std::collections::BTreeMap;

use morphogen_types::{Event, StepMetrics, StepSummary, StepTable, TelemetryRecord};
use tracing::debug;

use crate::config::TrailingEvents;
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Explicit state for one pass over a telemetry stream.
#[derive(Debug, Default)]
pub struct StepAggregator {
    buffer: Vec<Event>,
    steps: StepTable,
    trailing: TrailingEvents,
    last_boundary: Option<StepSummary>,
}

impl StepAggregator {
    /// A fresh aggregator using the given trailing-event policy.
    pub const fn new(trailing: TrailingEvents) -> Self {
        Self {
            buffer: Vec::new(),
            steps: BTreeMap::new(),
            trailing,
            last_boundary: None,
        }
    }

    /// Feed one event in log order.
    pub fn push(&mut self, event: Event) {
        match event {
            Event::StepSummary(summary) => self.finalize(summary),
            other => self.buffer.push(other),
        }
    }

    /// Number of events buffered since the last boundary.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Steps finalized so far.
    pub const fn steps(&self) -> &StepTable {
        &self.steps
    }

    /// End the stream and return the finalized steps.
    pub fn finish(mut self) -> StepTable {
        if self.buffer.is_empty() {
            return self.steps;
        }

        match self.trailing {
            TrailingEvents::Discard => {
                debug!(
                    dropped = self.buffer.len(),
                    "discarding events after final step boundary"
                );
            }
            TrailingEvents::SyntheticStep => {
                let summary = self.synthetic_boundary();
                debug!(
                    step = summary.step,
                    events = self.buffer.len(),
                    "finalizing trailing events as synthetic step"
                );
                self.finalize(summary);
            }
        }
        self.steps
    }

    fn synthetic_boundary(&self) -> StepSummary {
        self.last_boundary.as_ref().map_or(
            StepSummary {
                step: 0,
                threat_score: 0.0,
                cell_count: 0,
            },
            |last| StepSummary {
                step: last.step.saturating_add(1),
                threat_score: last.threat_score,
                cell_count: last.cell_count,
            },
        )
    }

    fn finalize(&mut self, summary: StepSummary) {
        let metrics = digest(&summary, &self.buffer);
        self.buffer.clear();

        if self.steps.insert(summary.step, metrics).is_some() {
            debug!(step = summary.step, "duplicate step boundary, keeping latest");
        }
        self.last_boundary = Some(summary);
    }
}

/// Fold a buffered interval into metrics for `summary`.
fn digest(summary: &StepSummary, buffer: &[Event]) -> StepMetrics {
    let mut replications: u64 = 0;
    let mut signals: BTreeMap<String, u64> = BTreeMap::new();
    let mut lineage_shifts: BTreeMap<String, u64> = BTreeMap::new();

    for event in buffer {
        match event {
            Event::CellReplicated(_) => replications = replications.saturating_add(1),
            Event::SignalEmitted(signal) => {
                let count = signals.entry(signal.topic.clone()).or_insert(0);
                *count = count.saturating_add(1);
            }
            Event::LineageShift(shift) => {
                let count = lineage_shifts.entry(shift.lineage.clone()).or_insert(0);
                *count = count.saturating_add(1);
            }
            _ => {}
        }
    }

    StepMetrics {
        step: summary.step,
        threat_score: summary.threat_score,
        cell_count: summary.cell_count,
        replications,
        signals,
        lineage_shifts,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Drive a fresh aggregator over a record stream.
///
/// # Errors
///
/// Propagates the first I/O error yielded by the stream.
pub fn aggregate_steps<I>(records: I, trailing: TrailingEvents) -> Result<StepTable, AnalysisError>
where
    I: IntoIterator<Item = Result<TelemetryRecord, AnalysisError>>,
{
    let mut aggregator = StepAggregator::new(trailing);
    for record in records {
        aggregator.push(record?.event);
    }
    Ok(aggregator.finish())
}
