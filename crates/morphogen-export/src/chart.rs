//! Vega-Lite chart specification for the step table.
//!
//! The spec embeds the rows inline and folds the selected metric columns
//! into `(metric, value)` pairs, giving one line per metric over `step`
//! with independent y scales.

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tracing::info;

use crate::error::ExportError;
use crate::rows::{STEP_COLUMNS, StepRow};
use crate::writer::ensure_parent;

/// Vega-Lite schema the spec targets.
pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Check that `metrics` is non-empty and names only step columns.
///
/// # Errors
///
/// Returns [`ExportError::NoMetrics`] for an empty list, or
/// [`ExportError::UnknownMetric`] for the first unknown name.
pub fn validate_metrics<S: AsRef<str>>(metrics: &[S]) -> Result<(), ExportError> {
    if metrics.is_empty() {
        return Err(ExportError::NoMetrics);
    }
    if let Some(unknown) = metrics
        .iter()
        .map(AsRef::as_ref)
        .find(|metric| !STEP_COLUMNS.contains(metric))
    {
        return Err(ExportError::UnknownMetric {
            metric: unknown.to_owned(),
        });
    }
    Ok(())
}

/// Build the chart spec for `rows`, folding `metrics`.
///
/// # Errors
///
/// Returns the [`validate_metrics`] errors, or [`ExportError::Json`] if the
/// rows cannot be encoded.
pub fn build_chart_spec<S: AsRef<str>>(rows: &[StepRow], metrics: &[S]) -> Result<Value, ExportError> {
    validate_metrics(metrics)?;
    let fold: Vec<&str> = metrics.iter().map(AsRef::as_ref).collect();

    Ok(json!({
        "$schema": VEGA_LITE_SCHEMA,
        "description": "Morphogen telemetry step metrics (auto-generated).",
        "data": { "values": serde_json::to_value(rows)? },
        "transform": [
            { "fold": fold, "as": ["metric", "value"] }
        ],
        "mark": { "type": "line", "interpolate": "monotone" },
        "encoding": {
            "x": { "field": "step", "type": "quantitative" },
            "y": { "field": "value", "type": "quantitative" },
            "color": { "field": "metric", "type": "nominal" },
            "tooltip": [
                { "field": "step", "type": "quantitative" },
                { "field": "metric", "type": "nominal" },
                { "field": "value", "type": "quantitative" }
            ]
        },
        "resolve": { "scale": { "y": "independent" } }
    }))
}

/// Write a chart spec as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns [`ExportError::Json`] or [`ExportError::Io`] on failure.
pub fn write_chart_spec(spec: &Value, path: &Path) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let mut body = serde_json::to_string_pretty(spec)?;
    body.push('\n');
    fs::write(path, body).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "chart spec written");
    Ok(())
}
