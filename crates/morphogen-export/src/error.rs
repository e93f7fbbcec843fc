//! Error types for the `morphogen-export` crate.

use std::path::PathBuf;

/// Errors raised while building or writing dashboard exports.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A requested chart metric is not a step column.
    #[error("unknown chart metric `{metric}`; expected one of the step columns")]
    UnknownMetric {
        /// The rejected metric name.
        metric: String,
    },

    /// No chart metrics were requested.
    #[error("at least one chart metric is required")]
    NoMetrics,

    /// An output file or directory could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// The output path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A CSV row could not be encoded or flushed.
    #[error("failed to write CSV {}: {source}", path.display())]
    Csv {
        /// The output path.
        path: PathBuf,
        /// The underlying CSV error.
        source: csv::Error,
    },

    /// A step table could not be opened or a row could not be decoded.
    #[error("failed to read CSV {}: {source}", path.display())]
    Read {
        /// The input path.
        path: PathBuf,
        /// The underlying CSV error.
        source: csv::Error,
    },

    /// A map column of a step table row is not a JSON object.
    #[error("invalid `{column}` at step {step} in {}: {source}", path.display())]
    Column {
        /// The input path.
        path: PathBuf,
        /// Step of the offending row.
        step: u64,
        /// Name of the offending column.
        column: &'static str,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A step table has a header but no rows.
    #[error("step table {} has no rows", path.display())]
    EmptyTable {
        /// The input path.
        path: PathBuf,
    },

    /// The chart specification could not be serialized.
    #[error("failed to encode chart spec: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
