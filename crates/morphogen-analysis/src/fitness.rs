//! Composite fitness scoring.
//!
//! Every sub-score is normalized into `[0, 1]` before weighting, so the
//! composite score stays in range for any input. The constants come from
//! [`ScoringConfig`]; its defaults are the reference model:
//!
//! | Component | Definition |
//! |-----------|------------|
//! | threat | `avg_threat / 1.5` |
//! | suppression | `1 - min(replications per step, 1)` |
//! | cell loss | `(max_cells - min_cells) / max_cells` |
//! | lineage | `0.6 * pressure + 0.4 * focus` |
//! | stimulus | `total_stimulus / (steps * 1.5)` |

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::policy;
use crate::stats::RunStats;

/// Scores and recommendation derived from one [`RunStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessAnnotation {
    /// Normalized mean threat.
    pub threat_component: f64,
    /// How far replication stayed below one per step.
    pub suppression_component: f64,
    /// Fraction of the peak population lost at the trough.
    pub cell_loss_component: f64,
    /// Normalized lineage shifts per step.
    pub lineage_pressure: f64,
    /// Share of lineage shifts landing in the dominant lineage.
    pub lineage_focus_ratio: f64,
    /// Blend of lineage pressure and focus.
    pub lineage_component: f64,
    /// Normalized stimulus per step.
    pub stimulus_component: f64,
    /// Weighted composite in `[0, 1]`.
    pub fitness_score: f64,
    /// Whether any breach threshold was crossed.
    pub breach_observed: bool,
    /// Recommended next mutation, if any rule matched.
    pub recommended_mutation: Option<String>,
}

/// Clamp into `[0, 1]`. NaN maps to 0.
pub const fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Compute the scores for `stats` without a recommendation.
///
/// An empty run scores all zeros with no breach.
#[allow(clippy::cast_precision_loss)]
pub fn score(stats: &RunStats, config: &ScoringConfig) -> FitnessAnnotation {
    if stats.step_count == 0 {
        return FitnessAnnotation::default();
    }
    let steps = stats.denominator();

    let lineage_pressure = clamp01(stats.lineage_shift_rate() / config.lineage_pressure_scale);
    let lineage_focus_ratio = if stats.total_lineage_shifts == 0 {
        0.0
    } else {
        let dominant = stats.dominant_lineage().map_or(0, |(_, count)| count);
        clamp01(dominant as f64 / stats.total_lineage_shifts as f64)
    };
    let lineage_component = clamp01(
        config.lineage_pressure_mix * lineage_pressure
            + config.lineage_focus_mix * lineage_focus_ratio,
    );

    let suppression_component = (1.0 - stats.replication_rate().min(1.0)).max(0.0);
    let cell_loss_component = if stats.max_cell_count == 0 {
        0.0
    } else {
        let lost = stats.max_cell_count.saturating_sub(stats.min_cell_count);
        clamp01(lost as f64 / stats.max_cell_count as f64)
    };
    let stimulus_component = clamp01(stats.total_stimulus / (steps * config.stimulus_scale));
    let threat_component = clamp01(stats.avg_threat() / config.threat_scale);

    let fitness_score = clamp01(
        config.threat_weight * threat_component
            + config.suppression_weight * suppression_component
            + config.cell_loss_weight * cell_loss_component
            + config.lineage_weight * lineage_component
            + config.stimulus_weight * stimulus_component,
    );

    let breach_observed = fitness_score > config.breach_fitness
        || stats.max_threat > config.breach_max_threat
        || cell_loss_component > config.breach_cell_loss
        || lineage_component > config.breach_lineage;

    FitnessAnnotation {
        threat_component,
        suppression_component,
        cell_loss_component,
        lineage_pressure,
        lineage_focus_ratio,
        lineage_component,
        stimulus_component,
        fitness_score,
        breach_observed,
        recommended_mutation: None,
    }
}

/// Score `stats` and attach the policy's recommendation.
pub fn annotate(stats: &RunStats, config: &ScoringConfig) -> FitnessAnnotation {
    let mut annotation = score(stats, config);
    annotation.recommended_mutation = policy::recommend(stats, &annotation);
    annotation
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn near(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn clamp01_bounds() {
        assert!(near(clamp01(-3.0), 0.0));
        assert!(near(clamp01(0.25), 0.25));
        assert!(near(clamp01(7.0), 1.0));
        assert!(near(clamp01(f64::NAN), 0.0));
        assert!(near(clamp01(f64::INFINITY), 1.0));
    }

    #[test]
    fn empty_run_is_zero() {
        let annotation = annotate(&RunStats::default(), &ScoringConfig::default());
        assert_eq!(annotation, FitnessAnnotation::default());
        assert!(annotation.recommended_mutation.is_none());
    }

    #[test]
    fn reference_model_arithmetic() {
        let stats = RunStats {
            step_count: 4,
            threat_sum: 2.4,
            max_threat: 0.9,
            cell_count_sum: 32,
            min_cell_count: 6,
            max_cell_count: 10,
            total_replications: 2,
            total_signals: 8,
            total_lineage_shifts: 2,
            total_stimulus: 3.0,
            signals_by_topic: BTreeMap::new(),
            lineage_by_type: BTreeMap::from([("Healer".to_owned(), 2)]),
            stimuli_by_topic: BTreeMap::new(),
        };
        let a = score(&stats, &ScoringConfig::default());

        // avg_threat 0.6 -> 0.4; replication rate 0.5 -> 0.5; loss 0.4;
        // pressure 0.5/0.6; focus 1.0; stimulus 3/6.
        assert!(near(a.threat_component, 0.4));
        assert!(near(a.suppression_component, 0.5));
        assert!(near(a.cell_loss_component, 0.4));
        assert!(near(a.lineage_pressure, 0.5 / 0.6));
        assert!(near(a.lineage_focus_ratio, 1.0));
        assert!(near(a.lineage_component, 0.6 * (0.5 / 0.6) + 0.4));
        assert!(near(a.stimulus_component, 0.5));

        let expected = 0.35 * 0.4 + 0.20 * 0.5 + 0.15 * 0.4 + 0.20 * 0.9 + 0.10 * 0.5;
        assert!(near(a.fitness_score, expected));
        // lineage_component 0.9 > 0.8
        assert!(a.breach_observed);
    }

    #[test]
    fn no_lineage_shifts_means_no_focus() {
        let stats = RunStats {
            step_count: 3,
            max_cell_count: 5,
            min_cell_count: 5,
            ..RunStats::default()
        };
        let a = score(&stats, &ScoringConfig::default());
        assert!(near(a.lineage_focus_ratio, 0.0));
        assert!(near(a.lineage_component, 0.0));
        assert!(near(a.cell_loss_component, 0.0));
    }

    #[test]
    fn threat_spike_alone_breaches() {
        let stats = RunStats {
            step_count: 10,
            threat_sum: 1.2,
            max_threat: 1.2,
            total_replications: 100,
            ..RunStats::default()
        };
        let a = score(&stats, &ScoringConfig::default());
        assert!(a.fitness_score < 0.65);
        assert!(a.breach_observed);
    }
}
