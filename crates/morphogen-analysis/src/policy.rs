//! Mutation recommendation policy.
//!
//! An ordered table of rules, each a predicate over [`PolicyInputs`] paired
//! with an action. Rules are evaluated top to bottom and the first match
//! wins, so earlier rows shadow later ones.
//!
//! | # | Rule | Fires when |
//! |---|------|------------|
//! | 1 | `amplify_activator` | fitness < 0.4, activator <= inhibitor |
//! | 2 | `cooperative_decoys` | fitness < 0.4, activator > inhibitor |
//! | 3 | `extend_breach_window` | breach, fewer signals than steps |
//! | 4 | `tighten_cadence` | breach |
//! | 5 | `escalate_lineage_churn` | lineage shifts per step < 0.2 |
//! | 6 | `focus_dominant_lineage` | focus < 0.5 and more than 3 shifts |
//! | 7 | `slow_replication` | replications per step > 0.6 |
//! | 8 | `rebalance_stimuli` | inhibitor > activator > 0 |

use tracing::debug;

use crate::fitness::FitnessAnnotation;
use crate::stats::RunStats;

/// Stimulus topic driving the attack.
pub const ACTIVATOR_TOPIC: &str = "activator";

/// Stimulus topic damping the attack.
pub const INHIBITOR_TOPIC: &str = "inhibitor";

/// Fitness below which the run is treated as a failed attack.
const LOW_FITNESS: f64 = 0.4;

/// Values the rule predicates read.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInputs<'a> {
    /// Run statistics.
    pub stats: &'a RunStats,
    /// Scores for the run.
    pub annotation: &'a FitnessAnnotation,
    /// Total activator stimulus.
    pub activator: f64,
    /// Total inhibitor stimulus.
    pub inhibitor: f64,
    /// Replications per step.
    pub reproductions: f64,
    /// Lineage shifts per step, before normalization.
    pub raw_lineage_pressure: f64,
    /// Share of lineage shifts in the dominant lineage.
    pub dominant_ratio: f64,
}

impl<'a> PolicyInputs<'a> {
    /// Derive the inputs from a run.
    pub fn new(stats: &'a RunStats, annotation: &'a FitnessAnnotation) -> Self {
        Self {
            stats,
            annotation,
            activator: stats.stimulus_for(ACTIVATOR_TOPIC),
            inhibitor: stats.stimulus_for(INHIBITOR_TOPIC),
            reproductions: stats.replication_rate(),
            raw_lineage_pressure: stats.lineage_shift_rate(),
            dominant_ratio: annotation.lineage_focus_ratio,
        }
    }

    fn low_fitness(&self) -> bool {
        self.annotation.fitness_score < LOW_FITNESS
    }
}

/// One row of the policy table.
#[derive(Debug, Clone, Copy)]
pub struct MutationRule {
    /// Stable rule name, used in logs.
    pub name: &'static str,
    /// Whether the rule fires.
    pub applies: fn(&PolicyInputs<'_>) -> bool,
    /// The recommendation produced when it fires.
    pub action: fn(&PolicyInputs<'_>) -> String,
}

/// The policy, in priority order.
pub const MUTATION_RULES: &[MutationRule] = &[
    MutationRule {
        name: "amplify_activator",
        applies: |p| p.low_fitness() && p.activator <= p.inhibitor,
        action: |_| "increase activator spike amplitude and damp inhibitor recovery".to_owned(),
    },
    MutationRule {
        name: "cooperative_decoys",
        applies: |p| p.low_fitness() && p.activator > p.inhibitor,
        action: |_| {
            "inject cooperative decoys ahead of activator bursts to overwhelm defences".to_owned()
        },
    },
    MutationRule {
        name: "extend_breach_window",
        applies: |p| p.annotation.breach_observed && p.stats.total_signals < p.stats.step_count,
        action: |_| "extend breach window with sustained activator pulses post-impact".to_owned(),
    },
    MutationRule {
        name: "tighten_cadence",
        applies: |p| p.annotation.breach_observed,
        action: |_| {
            "tighten attack cadence: alternate activator and inhibitor surges faster".to_owned()
        },
    },
    MutationRule {
        name: "escalate_lineage_churn",
        applies: |p| p.raw_lineage_pressure < 0.2,
        action: |_| "escalate lineage churn by targeting secondary lineages".to_owned(),
    },
    MutationRule {
        name: "focus_dominant_lineage",
        applies: |p| p.dominant_ratio < 0.5 && p.stats.total_lineage_shifts > 3,
        action: |p| match p.stats.dominant_lineage() {
            Some((name, _)) => format!("focus mutation pressure on the dominant {name} lineage"),
            None => "focus mutation pressure on the dominant lineage".to_owned(),
        },
    },
    MutationRule {
        name: "slow_replication",
        applies: |p| p.reproductions > 0.6,
        action: |_| {
            "slow defensive replication by scheduling inhibitor spikes before activator peaks"
                .to_owned()
        },
    },
    MutationRule {
        name: "rebalance_stimuli",
        applies: |p| p.inhibitor > p.activator && p.activator > 0.0,
        action: |_| {
            "rebalance stimuli by boosting activator intensity relative to inhibitor damping"
                .to_owned()
        },
    },
];

/// First matching rule for the run, if any.
pub fn matching_rule(inputs: &PolicyInputs<'_>) -> Option<&'static MutationRule> {
    MUTATION_RULES.iter().find(|rule| (rule.applies)(inputs))
}

/// Recommend the next mutation for a scored run.
///
/// An empty run gets no recommendation.
pub fn recommend(stats: &RunStats, annotation: &FitnessAnnotation) -> Option<String> {
    if stats.step_count == 0 {
        return None;
    }
    let inputs = PolicyInputs::new(stats, annotation);
    let rule = matching_rule(&inputs)?;
    debug!(rule = rule.name, "mutation rule matched");
    Some((rule.action)(&inputs))
}
