//! Run-level statistics folded from per-step metrics.
//!
//! Means are kept as running sums so that statistics from several files can
//! be combined exactly with [`RunStats::merge`]. Every category map is a
//! `BTreeMap`, which keeps summaries and exports deterministic.

use std::collections::BTreeMap;

use morphogen_types::{StepMetrics, StepTable, StimulusTable, top_count};
use serde::{Deserialize, Serialize};

/// Aggregate statistics over one or more runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of finalized steps.
    pub step_count: u64,
    /// Sum of per-step threat scores.
    pub threat_sum: f64,
    /// Highest per-step threat score (0 when empty).
    pub max_threat: f64,
    /// Sum of per-step cell counts.
    pub cell_count_sum: u64,
    /// Lowest per-step cell count (0 when empty).
    pub min_cell_count: u64,
    /// Highest per-step cell count (0 when empty).
    pub max_cell_count: u64,
    /// Replications across all steps.
    pub total_replications: u64,
    /// Signals across all steps.
    pub total_signals: u64,
    /// Lineage shifts across all steps.
    pub total_lineage_shifts: u64,
    /// Stimulus applied at the analyzed steps.
    pub total_stimulus: f64,
    /// Signal counts by topic.
    pub signals_by_topic: BTreeMap<String, u64>,
    /// Lineage shift counts by lineage.
    pub lineage_by_type: BTreeMap<String, u64>,
    /// Stimulus sums by topic, over the analyzed steps.
    pub stimuli_by_topic: BTreeMap<String, f64>,
}

impl RunStats {
    /// Fold a step table and its stimulus table.
    ///
    /// Stimulus entries for steps absent from `steps` do not contribute.
    pub fn from_tables(steps: &StepTable, stimuli: &StimulusTable) -> Self {
        let mut stats = Self::default();
        for metrics in steps.values() {
            stats.observe(metrics, stimuli);
        }
        stats
    }

    /// Fold one step. Steps must be observed at most once.
    pub fn observe(&mut self, metrics: &StepMetrics, stimuli: &StimulusTable) {
        if self.step_count == 0 {
            self.min_cell_count = metrics.cell_count;
            self.max_cell_count = metrics.cell_count;
            self.max_threat = metrics.threat_score;
        } else {
            self.min_cell_count = self.min_cell_count.min(metrics.cell_count);
            self.max_cell_count = self.max_cell_count.max(metrics.cell_count);
            self.max_threat = self.max_threat.max(metrics.threat_score);
        }
        self.step_count = self.step_count.saturating_add(1);
        self.threat_sum += metrics.threat_score;
        self.cell_count_sum = self.cell_count_sum.saturating_add(metrics.cell_count);
        self.total_replications = self.total_replications.saturating_add(metrics.replications);

        add_counts(&mut self.signals_by_topic, &metrics.signals);
        add_counts(&mut self.lineage_by_type, &metrics.lineage_shifts);
        self.total_signals = self.total_signals.saturating_add(metrics.signals_total());
        self.total_lineage_shifts = self
            .total_lineage_shifts
            .saturating_add(metrics.lineage_shifts_total());

        if let Some(entry) = stimuli.get(&metrics.step) {
            self.total_stimulus += entry.total;
            add_amounts(&mut self.stimuli_by_topic, &entry.topics);
        }
    }

    /// Combine two aggregates. The operation is commutative; an empty side
    /// contributes nothing to the extrema.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let (min_cell_count, max_cell_count, max_threat) = match (self.step_count, other.step_count) {
            (0, _) => (other.min_cell_count, other.max_cell_count, other.max_threat),
            (_, 0) => (self.min_cell_count, self.max_cell_count, self.max_threat),
            _ => (
                self.min_cell_count.min(other.min_cell_count),
                self.max_cell_count.max(other.max_cell_count),
                self.max_threat.max(other.max_threat),
            ),
        };

        let mut signals_by_topic = self.signals_by_topic.clone();
        add_counts(&mut signals_by_topic, &other.signals_by_topic);
        let mut lineage_by_type = self.lineage_by_type.clone();
        add_counts(&mut lineage_by_type, &other.lineage_by_type);
        let mut stimuli_by_topic = self.stimuli_by_topic.clone();
        add_amounts(&mut stimuli_by_topic, &other.stimuli_by_topic);

        Self {
            step_count: self.step_count.saturating_add(other.step_count),
            threat_sum: self.threat_sum + other.threat_sum,
            max_threat,
            cell_count_sum: self.cell_count_sum.saturating_add(other.cell_count_sum),
            min_cell_count,
            max_cell_count,
            total_replications: self
                .total_replications
                .saturating_add(other.total_replications),
            total_signals: self.total_signals.saturating_add(other.total_signals),
            total_lineage_shifts: self
                .total_lineage_shifts
                .saturating_add(other.total_lineage_shifts),
            total_stimulus: self.total_stimulus + other.total_stimulus,
            signals_by_topic,
            lineage_by_type,
            stimuli_by_topic,
        }
    }

    /// `step_count` floored at 1, for use as a divisor.
    #[allow(clippy::cast_precision_loss)]
    pub fn denominator(&self) -> f64 {
        self.step_count.max(1) as f64
    }

    /// Mean threat score per step.
    pub fn avg_threat(&self) -> f64 {
        self.threat_sum / self.denominator()
    }

    /// Mean cell count per step.
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_cell_count(&self) -> f64 {
        self.cell_count_sum as f64 / self.denominator()
    }

    /// Replications per step.
    #[allow(clippy::cast_precision_loss)]
    pub fn replication_rate(&self) -> f64 {
        self.total_replications as f64 / self.denominator()
    }

    /// Lineage shifts per step.
    #[allow(clippy::cast_precision_loss)]
    pub fn lineage_shift_rate(&self) -> f64 {
        self.total_lineage_shifts as f64 / self.denominator()
    }

    /// Signals per step.
    #[allow(clippy::cast_precision_loss)]
    pub fn signal_rate(&self) -> f64 {
        self.total_signals as f64 / self.denominator()
    }

    /// Lineage with the most shifts. Ties go to the smallest name.
    pub fn dominant_lineage(&self) -> Option<(&str, u64)> {
        top_count(&self.lineage_by_type)
    }

    /// Stimulus total for `topic`, 0 when never applied.
    pub fn stimulus_for(&self, topic: &str) -> f64 {
        self.stimuli_by_topic.get(topic).copied().unwrap_or(0.0)
    }
}

fn add_counts(into: &mut BTreeMap<String, u64>, from: &BTreeMap<String, u64>) {
    for (key, count) in from {
        let slot = into.entry(key.clone()).or_insert(0);
        *slot = slot.saturating_add(*count);
    }
}

fn add_amounts(into: &mut BTreeMap<String, f64>, from: &BTreeMap<String, f64>) {
    for (key, amount) in from {
        *into.entry(key.clone()).or_insert(0.0) += amount;
    }
}
