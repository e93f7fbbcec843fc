//! Telemetry aggregation, fitness scoring, and mutation policy.
//!
//! Data flows strictly forward through the modules below:
//!
//! ```text
//! reader ─┬─> step ──────┬─> stats ─> fitness ─> policy
//!         └─> stimulus ──┘
//! ```
//!
//! [`pipeline::analyze`] wires the whole chain for one run. The
//! [`harness`] consumes finished analyses to schedule follow-up candidates.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with reference defaults
//! - [`error`] -- Fatal analysis errors
//! - [`reader`] -- Lazy JSONL readers
//! - [`step`] -- Boundary-driven step aggregation
//! - [`stimulus`] -- Per-step stimulus totals
//! - [`stats`] -- Run-level statistics and merging
//! - [`fitness`] -- Composite fitness scoring
//! - [`policy`] -- Ordered mutation recommendation rules
//! - [`pipeline`] -- End-to-end analysis of one run
//! - [`harness`] -- Candidate backlog and outcome archive

pub mod config;
pub mod error;
pub mod fitness;
pub mod harness;
pub mod pipeline;
pub mod policy;
pub mod reader;
pub mod stats;
pub mod step;
pub mod stimulus;

pub use config::{AnalysisConfig, ConfigError, LogFormat, ScoringConfig, TrailingEvents};
pub use error::AnalysisError;
pub use fitness::{FitnessAnnotation, annotate, clamp01, score};
pub use harness::{
    AttackCandidate, AttackOutcome, Evaluation, EvolutionConfig, HarnessError, MutationHarness,
};
pub use pipeline::{RunAnalysis, analyze, analyze_reader};
pub use policy::{MUTATION_RULES, MutationRule, recommend};
pub use reader::{JsonlReader, ReaderStats, StimulusReader, TelemetryReader};
pub use stats::RunStats;
pub use step::{StepAggregator, aggregate_steps};
pub use stimulus::{aggregate_stimuli, load_stimuli};
