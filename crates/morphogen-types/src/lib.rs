//! Shared type definitions for the Morphogen telemetry analyzer.
//!
//! This crate is the single source of truth for the data exchanged between
//! the analysis pipeline and its exporters.
//!
//! # Modules
//!
//! - [`events`] -- Tagged telemetry events and the per-line record
//! - [`metrics`] -- Per-step metrics and stimulus summaries

pub mod events;
pub mod metrics;

// Re-export all public types at crate root for convenience.
pub use events::{
    CellDied, CellReplicated, DecodeError, Event, LineageShift, LinkChange, Scenario,
    SignalEmitted, StepSummary, TelemetryRecord, VoteCast,
};
pub use metrics::{
    StepMetrics, StepTable, StimulusEntry, StimulusRecord, StimulusTable, sum_counts, top_count,
};
