//! CSV writers for the step and lineage tables.
//!
//! Both writers always emit the header row, so an empty run still produces
//! a well-formed file. Parent directories are created as needed.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::ExportError;
use crate::rows::{LINEAGE_COLUMNS, LineageRow, STEP_COLUMNS, StepRow};

/// Write the per-step table to `path`.
///
/// # Errors
///
/// Returns [`ExportError::Io`] or [`ExportError::Csv`] if the file cannot
/// be written.
pub fn write_step_csv(rows: &[StepRow], path: &Path) -> Result<(), ExportError> {
    write_table(rows, STEP_COLUMNS, path)?;
    info!(path = %path.display(), rows = rows.len(), "step table written");
    Ok(())
}

/// Write the long-form lineage table to `path`.
///
/// # Errors
///
/// Returns [`ExportError::Io`] or [`ExportError::Csv`] if the file cannot
/// be written.
pub fn write_lineage_csv(rows: &[LineageRow], path: &Path) -> Result<(), ExportError> {
    write_table(rows, LINEAGE_COLUMNS, path)?;
    info!(path = %path.display(), rows = rows.len(), "lineage table written");
    Ok(())
}

/// Create the parent directory of `path` if it has one.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn write_table<T: Serialize>(rows: &[T], header: &[&str], path: &Path) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    // Headers are written explicitly so that an empty table still has one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_err)?;
    writer.write_record(header).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_has_header_only() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok());
        let Ok(dir) = dir else { return };
        let path = dir.path().join("nested").join("steps.csv");

        assert!(write_step_csv(&[], &path).is_ok());
        let contents = fs::read_to_string(&path).unwrap_or_default();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.starts_with("step,threat_score,cell_count,"));
        assert!(contents.trim_end().ends_with("breach_observed,recommended_mutation"));
    }

    #[test]
    fn lineage_table_rows() {
        let dir = tempfile::tempdir();
        let Ok(dir) = dir else { return };
        let path = dir.path().join("lineage.csv");
        let rows = vec![
            LineageRow {
                step: 0,
                lineage: "Healer".to_owned(),
                count: 2,
            },
            LineageRow {
                step: 3,
                lineage: "Scout".to_owned(),
                count: 1,
            },
        ];

        assert!(write_lineage_csv(&rows, &path).is_ok());
        let contents = fs::read_to_string(&path).unwrap_or_default();
        assert_eq!(contents, "step,lineage,count\n0,Healer,2\n3,Scout,1\n");
    }
}
