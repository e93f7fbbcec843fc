//! Error types for the `morphogen-analysis` crate.
//!
//! Malformed lines never reach this type: readers log and skip them. What
//! remains are the conditions that stop an analysis outright.

use std::path::PathBuf;

/// Errors that abort an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// An input file named by the caller does not exist.
    #[error("input file not found: {}", path.display())]
    MissingInput {
        /// The missing path.
        path: PathBuf,
    },

    /// An input file exists but could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        /// The path that failed to open.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Reading from an already-open input failed part way through.
    #[error("failed to read {source_name} at line {line}: {source}")]
    Read {
        /// Human-readable name of the input.
        source_name: String,
        /// 1-based physical line number that failed.
        line: usize,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl AnalysisError {
    /// Classify a failed `File::open` on `path`.
    pub fn from_open(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingInput { path }
        } else {
            Self::Open { path, source }
        }
    }
}
