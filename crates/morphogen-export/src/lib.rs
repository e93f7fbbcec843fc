//! Dashboard exports for analyzed telemetry runs.
//!
//! Turns a [`morphogen_analysis::RunAnalysis`] into the files a dashboard
//! consumes: a per-step CSV table, a long-form lineage CSV, and a Vega-Lite
//! chart specification. A written step table can be loaded back with
//! [`read_step_csv`] and rescored.
//!
//! # Modules
//!
//! - [`rows`] -- Flat step and lineage rows
//! - [`writer`] -- CSV output
//! - [`chart`] -- Chart spec generation and metric validation
//! - [`ingest`] -- Step table reload
//! - [`error`] -- Export errors

pub mod chart;
pub mod error;
pub mod ingest;
pub mod rows;
pub mod writer;

pub use chart::{VEGA_LITE_SCHEMA, build_chart_spec, validate_metrics, write_chart_spec};
pub use error::ExportError;
pub use ingest::{analysis_from_csv, read_step_csv};
pub use rows::{LINEAGE_COLUMNS, LineageRow, STEP_COLUMNS, StepRow, build_lineage_rows, build_step_rows};
pub use writer::{write_lineage_csv, write_step_csv};
