//! End-to-end tests: telemetry file in, dashboard files out.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;

use morphogen_analysis::{AnalysisConfig, analyze};
use morphogen_export::{
    ExportError, build_chart_spec, build_lineage_rows, build_step_rows, read_step_csv,
    write_chart_spec, write_lineage_csv, write_step_csv,
};
use serde_json::Value;
use tempfile::TempDir;

const TELEMETRY: &str = r#"{"timestamp_ms": 1, "event": {"Scenario": {"name": "breach-drill"}}}
{"timestamp_ms": 2, "event": {"CellReplicated": {"cell_id": "c-1", "child_id": "c-2"}}}
{"timestamp_ms": 3, "event": {"LineageShift": {"cell_id": "c-2", "lineage": "Healer"}}}
{"timestamp_ms": 4, "event": {"SignalEmitted": {"cell_id": "c-1", "topic": "alarm", "value": 0.4}}}
{"timestamp_ms": 5, "event": {"StepSummary": {"step": 0, "threat_score": 0.35, "cell_count": 12}}}
{"timestamp_ms": 6, "event": {"LineageShift": {"cell_id": "c-1", "lineage": "Warrior"}}}
{"timestamp_ms": 7, "event": {"LineageShift": {"cell_id": "c-3", "lineage": "Warrior"}}}
{"timestamp_ms": 8, "event": {"CellDied": {"cell_id": "c-3"}}}
{"timestamp_ms": 9, "event": {"StepSummary": {"step": 1, "threat_score": 1.25, "cell_count": 7}}}
"#;

const STIMULUS: &str = r#"{"step": 0, "topic": "activator", "value": 0.8, "duration": 1}
{"step": 1, "topic": "inhibitor", "value": 0.3, "duration": 1}
"#;

fn fixture(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let telemetry = dir.path().join("telemetry.jsonl");
    let stimulus = dir.path().join("stimulus.jsonl");
    fs::write(&telemetry, TELEMETRY).unwrap();
    fs::write(&stimulus, STIMULUS).unwrap();
    (telemetry, stimulus)
}

fn export_steps(telemetry: &Path, stimulus: &Path, out: &Path) {
    let analysis = analyze(telemetry, Some(stimulus), &AnalysisConfig::default()).unwrap();
    write_step_csv(&build_step_rows(&analysis), out).unwrap();
}

#[test]
fn step_csv_is_byte_identical_across_runs() {
    let dir = TempDir::new().unwrap();
    let (telemetry, stimulus) = fixture(&dir);
    let first = dir.path().join("out/first.csv");
    let second = dir.path().join("out/second.csv");

    export_steps(&telemetry, &stimulus, &first);
    export_steps(&telemetry, &stimulus, &second);

    let a = fs::read(&first).unwrap();
    let b = fs::read(&second).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn step_csv_contents() {
    let dir = TempDir::new().unwrap();
    let (telemetry, stimulus) = fixture(&dir);
    let out = dir.path().join("steps.csv");
    export_steps(&telemetry, &stimulus, &out);

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 20);
    assert_eq!(headers.get(0), Some("step"));
    assert_eq!(headers.get(19), Some("recommended_mutation"));

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 2);

    let step1 = &records[1];
    assert_eq!(step1.get(0), Some("1"));
    assert_eq!(step1.get(5), Some("2"));
    assert_eq!(step1.get(9), Some("Warrior"));
    assert_eq!(step1.get(12), Some(r#"{"Warrior":2}"#));
    assert_eq!(step1.get(13), Some(r#"{"inhibitor":0.3}"#));
    // max_threat 1.25 > 1.1 breaches.
    assert_eq!(step1.get(18), Some("true"));
    assert_eq!(records[0].get(18), step1.get(18));
    assert_eq!(records[0].get(17), step1.get(17));
}

#[test]
fn lineage_csv_is_long_form() {
    let dir = TempDir::new().unwrap();
    let (telemetry, stimulus) = fixture(&dir);
    let analysis = analyze(&telemetry, Some(&stimulus), &AnalysisConfig::default()).unwrap();
    let out = dir.path().join("lineage.csv");
    write_lineage_csv(&build_lineage_rows(&analysis), &out).unwrap();

    let contents = fs::read_to_string(&out).unwrap();
    assert_eq!(contents, "step,lineage,count\n0,Healer,1\n1,Warrior,2\n");
}

#[test]
fn empty_run_writes_header_only() {
    let dir = TempDir::new().unwrap();
    let telemetry = dir.path().join("empty.jsonl");
    fs::write(&telemetry, "\n").unwrap();
    let analysis = analyze(&telemetry, None, &AnalysisConfig::default()).unwrap();

    let out = dir.path().join("steps.csv");
    write_step_csv(&build_step_rows(&analysis), &out).unwrap();
    let contents = fs::read_to_string(&out).unwrap();
    assert_eq!(contents.lines().count(), 1);
}

#[test]
fn chart_spec_embeds_rows() {
    let dir = TempDir::new().unwrap();
    let (telemetry, stimulus) = fixture(&dir);
    let analysis = analyze(&telemetry, Some(&stimulus), &AnalysisConfig::default()).unwrap();
    let rows = build_step_rows(&analysis);

    let spec = build_chart_spec(&rows, &["threat_score", "cell_count"]).unwrap();
    let out = dir.path().join("charts/spec.json");
    write_chart_spec(&spec, &out).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["data"]["values"].as_array().map(Vec::len), Some(2));
    assert_eq!(written["data"]["values"][1]["cell_count"], 7);
}

#[test]
fn unknown_metric_rejected_before_write() {
    let dir = TempDir::new().unwrap();
    let (telemetry, stimulus) = fixture(&dir);
    let analysis = analyze(&telemetry, Some(&stimulus), &AnalysisConfig::default()).unwrap();
    let rows = build_step_rows(&analysis);

    let result = build_chart_spec(&rows, &["threat_score", "not_a_column"]);
    assert!(matches!(result, Err(ExportError::UnknownMetric { .. })));
}

#[test]
fn reloaded_step_csv_scores_like_the_telemetry() {
    let dir = TempDir::new().unwrap();
    let (telemetry, stimulus) = fixture(&dir);
    let config = AnalysisConfig::default();
    let analysis = analyze(&telemetry, Some(&stimulus), &config).unwrap();
    let out = dir.path().join("steps.csv");
    write_step_csv(&build_step_rows(&analysis), &out).unwrap();

    let reloaded = read_step_csv(&out, &config.scoring).unwrap();
    assert_eq!(reloaded.steps, analysis.steps);
    assert_eq!(reloaded.stats, analysis.stats);
    assert_eq!(reloaded.annotation, analysis.annotation);
}

#[test]
fn missing_step_csv_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let result = read_step_csv(&dir.path().join("absent.csv"), &AnalysisConfig::default().scoring);
    assert!(matches!(result, Err(ExportError::Read { .. })));
}
