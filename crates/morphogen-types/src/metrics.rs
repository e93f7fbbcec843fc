//! Per-interval metrics and stimulus summaries.
//!
//! All category maps are `BTreeMap`s so that every downstream export
//! iterates keys in a stable order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-step metrics, keyed by the step number carried in the boundary event.
pub type StepTable = BTreeMap<u64, StepMetrics>;

/// Per-step stimulus totals, keyed by the step named in each stimulus record.
pub type StimulusTable = BTreeMap<u64, StimulusEntry>;

// ---------------------------------------------------------------------------
// StepMetrics
// ---------------------------------------------------------------------------

/// Metrics finalized at one `StepSummary` boundary.
///
/// Built once by the step aggregator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Step number from the boundary event.
    pub step: u64,
    /// Threat score from the boundary event.
    pub threat_score: f64,
    /// Cell count from the boundary event.
    pub cell_count: u64,
    /// `CellReplicated` events seen since the previous boundary.
    pub replications: u64,
    /// `SignalEmitted` occurrences grouped by topic.
    pub signals: BTreeMap<String, u64>,
    /// `LineageShift` occurrences grouped by lineage.
    pub lineage_shifts: BTreeMap<String, u64>,
}

impl StepMetrics {
    /// Total signals emitted during the step.
    pub fn signals_total(&self) -> u64 {
        sum_counts(&self.signals)
    }

    /// Total lineage shifts during the step.
    pub fn lineage_shifts_total(&self) -> u64 {
        sum_counts(&self.lineage_shifts)
    }
}

/// Sum the values of a count map without overflowing.
pub fn sum_counts(counts: &BTreeMap<String, u64>) -> u64 {
    counts.values().fold(0u64, |acc, n| acc.saturating_add(*n))
}

/// The entry with the largest count. Ties go to the smallest key.
pub fn top_count(counts: &BTreeMap<String, u64>) -> Option<(&str, u64)> {
    let mut best: Option<(&str, u64)> = None;
    for (key, &count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((key.as_str(), count));
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Stimulus
// ---------------------------------------------------------------------------

/// One line of the stimulus log fed into the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusRecord {
    /// Step the stimulus was applied at.
    pub step: u64,
    /// Stimulus topic (e.g. `activator`, `inhibitor`).
    pub topic: String,
    /// Stimulus magnitude.
    pub value: f64,
    /// Number of steps the stimulus was held for.
    #[serde(default)]
    pub duration: u64,
}

/// Stimulus totals for a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusEntry {
    /// Step the totals belong to.
    pub step: u64,
    /// Sum of all stimulus values at this step.
    pub total: f64,
    /// Per-topic sums.
    pub topics: BTreeMap<String, f64>,
}

impl StimulusEntry {
    /// An empty entry for `step`.
    pub const fn new(step: u64) -> Self {
        Self {
            step,
            total: 0.0,
            topics: BTreeMap::new(),
        }
    }

    /// Fold one stimulus value into the entry.
    pub fn add(&mut self, topic: &str, value: f64) {
        self.total += value;
        *self.topics.entry(topic.to_owned()).or_insert(0.0) += value;
    }
}
