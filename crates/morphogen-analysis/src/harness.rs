//! Mutation harness for iterative attack search.
//!
//! The harness holds a FIFO backlog of [`AttackCandidate`]s and an archive
//! of [`AttackOutcome`]s. Callers pull a batch, run the simulation for each
//! candidate, analyze the resulting telemetry, and hand the analysis back
//! through [`MutationHarness::evaluate`]. A recommended mutation becomes a
//! new candidate one generation deeper; otherwise the candidate may be
//! requeued unchanged.
//!
//! State persists between invocations as a single pretty-printed JSON file.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pipeline::RunAnalysis;

/// Mutation label given to a candidate requeued without a recommendation.
pub const RETAINED_NOTE: &str = "retained for future mutation";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while persisting or restoring harness state.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The state file could not be read or written.
    #[error("harness state I/O error at {}: {source}", path.display())]
    Io {
        /// The state file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The state file is not valid harness JSON.
    #[error("harness state JSON error at {}: {source}", path.display())]
    Json {
        /// The state file path.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Harness sizing knobs. Defaults suit a quick smoke test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Maximum candidates handed out per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of most recent outcomes reported by
    /// [`MutationHarness::recent_outcomes`].
    #[serde(default = "default_max_generations")]
    pub max_generations: u32,

    /// Requeue a candidate when its run produced no recommendation.
    #[serde(default = "default_retain_elite")]
    pub retain_elite: bool,

    /// Outcomes kept in the archive; the oldest are dropped first.
    #[serde(default = "default_archive_limit")]
    pub archive_limit: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_generations: default_max_generations(),
            retain_elite: default_retain_elite(),
            archive_limit: default_archive_limit(),
        }
    }
}

const fn default_batch_size() -> usize {
    3
}

const fn default_max_generations() -> u32 {
    10
}

const fn default_retain_elite() -> bool {
    true
}

const fn default_archive_limit() -> usize {
    256
}

// ---------------------------------------------------------------------------
// Candidates and outcomes
// ---------------------------------------------------------------------------

/// A scenario queued for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCandidate {
    /// Unique identifier, carried into telemetry file names by callers.
    pub id: String,
    /// Scenario manifest or generator seed.
    pub scenario_ref: String,
    /// Stimulus log the scenario was driven with.
    #[serde(default)]
    pub stimulus_ref: Option<String>,
    /// 0 for seed scenarios.
    pub generation: u32,
    /// Candidate this one was derived from.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Mutation applied to derive this candidate.
    #[serde(default)]
    pub mutation: Option<String>,
}

impl AttackCandidate {
    /// A generation-0 candidate.
    pub fn seed(id: impl Into<String>, scenario_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scenario_ref: scenario_ref.into(),
            stimulus_ref: None,
            generation: 0,
            parent_id: None,
            mutation: None,
        }
    }

    /// The follow-up candidate carrying `mutation`.
    #[must_use]
    pub fn mutant(&self, mutation: &str) -> Self {
        let generation = self.generation.saturating_add(1);
        Self {
            id: format!("{}-mut{generation}", self.id),
            scenario_ref: self.scenario_ref.clone(),
            stimulus_ref: self.stimulus_ref.clone(),
            generation,
            parent_id: Some(self.id.clone()),
            mutation: Some(mutation.to_owned()),
        }
    }
}

/// Result of running one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOutcome {
    /// The evaluated candidate.
    pub candidate: AttackCandidate,
    /// Composite fitness of the run.
    pub fitness_score: f64,
    /// Whether the run breached.
    pub breach_observed: bool,
    /// One-line run summary.
    pub notes: Option<String>,
}

/// Everything [`MutationHarness::evaluate`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The archived outcome.
    pub outcome: AttackOutcome,
    /// The mutant enqueued, if a mutation was recommended.
    pub next_candidate: Option<AttackCandidate>,
    /// Whether the evaluated candidate itself was requeued.
    pub requeued: bool,
}

/// Summary line stored with each outcome.
pub fn outcome_note(analysis: &RunAnalysis) -> String {
    let stats = &analysis.stats;
    let base = format!(
        "avg_threat={:.2}, replications_total={}, signals_total={}",
        stats.avg_threat(),
        stats.total_replications,
        stats.total_signals
    );
    match &analysis.annotation.recommended_mutation {
        Some(mutation) => format!("{base}; next_mutation={mutation}"),
        None => base,
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Candidate backlog and outcome archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationHarness {
    config: EvolutionConfig,
    backlog: VecDeque<AttackCandidate>,
    archive: Vec<AttackOutcome>,
}

impl MutationHarness {
    /// An empty harness.
    pub const fn new(config: EvolutionConfig) -> Self {
        Self {
            config,
            backlog: VecDeque::new(),
            archive: Vec::new(),
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Candidates waiting to run.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Number of archived outcomes.
    pub fn archive_len(&self) -> usize {
        self.archive.len()
    }

    /// Queue a candidate at the back.
    pub fn enqueue(&mut self, candidate: AttackCandidate) {
        self.backlog.push_back(candidate);
    }

    /// Remove and return up to `batch_size` candidates in queue order.
    pub fn next_batch(&mut self) -> Vec<AttackCandidate> {
        let take = self.config.batch_size.min(self.backlog.len());
        self.backlog.drain(..take).collect()
    }

    /// Archive an outcome, dropping the oldest beyond `archive_limit`.
    pub fn record_outcome(&mut self, outcome: AttackOutcome) {
        self.archive.push(outcome);
        let excess = self.archive.len().saturating_sub(self.config.archive_limit);
        if excess > 0 {
            self.archive.drain(..excess);
            debug!(dropped = excess, kept = self.archive.len(), "archive trimmed");
        }
    }

    /// Archive the outcome of `candidate`'s run and schedule its follow-up.
    pub fn evaluate(&mut self, candidate: AttackCandidate, analysis: &RunAnalysis) -> Evaluation {
        let annotation = &analysis.annotation;
        let outcome = AttackOutcome {
            candidate: candidate.clone(),
            fitness_score: annotation.fitness_score,
            breach_observed: annotation.breach_observed,
            notes: Some(outcome_note(analysis)),
        };
        self.record_outcome(outcome.clone());

        let next_candidate = annotation
            .recommended_mutation
            .as_deref()
            .map(|mutation| candidate.mutant(mutation));

        let mut requeued = false;
        if let Some(mutant) = &next_candidate {
            self.enqueue(mutant.clone());
        } else if self.config.retain_elite {
            let mut retained = candidate;
            retained.mutation = Some(RETAINED_NOTE.to_owned());
            self.enqueue(retained);
            requeued = true;
        }

        info!(
            candidate = %outcome.candidate.id,
            generation = outcome.candidate.generation,
            fitness = outcome.fitness_score,
            breach = outcome.breach_observed,
            next = next_candidate.as_ref().map(|c| c.id.as_str()),
            backlog = self.backlog.len(),
            "candidate evaluated"
        );

        Evaluation {
            outcome,
            next_candidate,
            requeued,
        }
    }

    /// Newest outcomes first, at most `max_generations` of them.
    pub fn recent_outcomes(&self) -> Vec<&AttackOutcome> {
        let limit = usize::try_from(self.config.max_generations).unwrap_or(usize::MAX);
        self.archive.iter().rev().take(limit).collect()
    }

    /// Write the harness to `path` as pretty JSON, creating parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] if serialization or the write fails.
    pub fn save_state(&self, path: &Path) -> Result<(), HarnessError> {
        let io_err = |source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|source| HarnessError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, json).map_err(io_err)
    }

    /// Restore a harness written by [`save_state`](Self::save_state).
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] if the file cannot be read or parsed.
    pub fn load_state(path: &Path) -> Result<Self, HarnessError> {
        let contents = fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| HarnessError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
