//! Line-delimited JSON readers for telemetry and stimulus logs.
//!
//! [`JsonlReader`] is a lazy, single-pass iterator over a `BufRead`. Blank
//! lines are skipped silently; lines that fail to decode are logged at
//! `warn` and skipped so that one corrupt line never aborts the rest of the
//! file. A line that is not valid UTF-8 counts as malformed. Only I/O
//! failures surface as `Err` items.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;

use morphogen_types::{DecodeError, StimulusRecord, TelemetryRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AnalysisError;

/// A record type that can be decoded from one non-blank JSONL line.
pub trait LineRecord: Sized {
    /// Short label used in diagnostics.
    const KIND: &'static str;

    /// Decode failure type.
    type Error: std::fmt::Display;

    /// Decode one line.
    fn decode(line: &str) -> Result<Self, Self::Error>;
}

impl LineRecord for TelemetryRecord {
    const KIND: &'static str = "telemetry";
    type Error = DecodeError;

    fn decode(line: &str) -> Result<Self, Self::Error> {
        Self::from_line(line)
    }
}

impl LineRecord for StimulusRecord {
    const KIND: &'static str = "stimulus";
    type Error = serde_json::Error;

    fn decode(line: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(line)
    }
}

/// Line accounting for one input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    /// Physical lines consumed, blank lines included.
    pub lines_read: usize,
    /// Lines decoded into records.
    pub records: usize,
    /// Blank lines skipped.
    pub blank: usize,
    /// Malformed lines skipped.
    pub malformed: usize,
}

/// Lazy JSONL reader yielding decoded records.
#[derive(Debug)]
pub struct JsonlReader<R, T> {
    reader: R,
    buf: Vec<u8>,
    source: String,
    line_limit: Option<usize>,
    stats: ReaderStats,
    done: bool,
    _record: PhantomData<T>,
}

/// Reader over a telemetry log.
pub type TelemetryReader<R> = JsonlReader<R, TelemetryRecord>;

/// Reader over a stimulus log.
pub type StimulusReader<R> = JsonlReader<R, StimulusRecord>;

impl<T: LineRecord> JsonlReader<BufReader<File>, T> {
    /// Open a file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingInput`] if the file does not exist,
    /// or [`AnalysisError::Open`] for any other open failure.
    pub fn open(path: &Path) -> Result<Self, AnalysisError> {
        let file =
            File::open(path).map_err(|source| AnalysisError::from_open(path.to_path_buf(), source))?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: BufRead, T: LineRecord> JsonlReader<R, T> {
    /// Wrap an already-open reader. `source` names the input in log lines.
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            source: source.into(),
            line_limit: None,
            stats: ReaderStats::default(),
            done: false,
            _record: PhantomData,
        }
    }

    /// Stop after `limit` physical lines. `None` reads to the end.
    #[must_use]
    pub const fn with_line_limit(mut self, limit: Option<usize>) -> Self {
        self.line_limit = limit;
        self
    }

    /// Line accounting so far.
    pub const fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Name of the input, as given at construction.
    pub fn source(&self) -> &str {
        &self.source
    }

    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            debug!(
                kind = T::KIND,
                source = %self.source,
                lines_read = self.stats.lines_read,
                records = self.stats.records,
                malformed = self.stats.malformed,
                "input exhausted"
            );
        }
    }
}

impl<R: BufRead, T: LineRecord> Iterator for JsonlReader<R, T> {
    type Item = Result<T, AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self
                .line_limit
                .is_some_and(|limit| self.stats.lines_read >= limit)
            {
                self.finish();
                return None;
            }

            let line_number = self.stats.lines_read.saturating_add(1);
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finish();
                    return None;
                }
                Ok(_) => {}
                Err(source) => {
                    self.done = true;
                    return Some(Err(AnalysisError::Read {
                        source_name: self.source.clone(),
                        line: line_number,
                        source,
                    }));
                }
            }
            self.stats.lines_read = line_number;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim_end_matches(['\n', '\r']),
                Err(err) => {
                    self.stats.malformed = self.stats.malformed.saturating_add(1);
                    warn!(
                        kind = T::KIND,
                        source = %self.source,
                        line = line_number,
                        error = %err,
                        "skipping line that is not valid UTF-8"
                    );
                    continue;
                }
            };

            if line.trim().is_empty() {
                self.stats.blank = self.stats.blank.saturating_add(1);
                continue;
            }

            match T::decode(line) {
                Ok(record) => {
                    self.stats.records = self.stats.records.saturating_add(1);
                    return Some(Ok(record));
                }
                Err(err) => {
                    self.stats.malformed = self.stats.malformed.saturating_add(1);
                    warn!(
                        kind = T::KIND,
                        source = %self.source,
                        line = line_number,
                        error = %err,
                        "skipping malformed line"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use morphogen_types::Event;

    use super::*;

    const LOG: &str = r#"{"timestamp_ms": 1, "event": {"Scenario": {"name": "baseline"}}}

{"timestamp_ms": 2, "event": {"CellReplicated": {"cell_id": "a", "child_id": "b"}}}
this is not json
{"timestamp_ms": 3, "event": {"StepSummary": {"step": 0, "threat_score": 0.1, "cell_count": 2}}}
"#;

    fn collect(reader: &mut TelemetryReader<Cursor<&str>>) -> Vec<TelemetryRecord> {
        reader.by_ref().filter_map(Result::ok).collect()
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let mut reader = TelemetryReader::new(Cursor::new(LOG), "inline");
        let records = collect(&mut reader);

        assert_eq!(records.len(), 3);
        assert!(matches!(records.last().map(|r| &r.event), Some(Event::StepSummary(_))));

        let stats = reader.stats();
        assert_eq!(stats.lines_read, 5);
        assert_eq!(stats.records, 3);
        assert_eq!(stats.blank, 1);
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let mut input = Vec::new();
        input.extend_from_slice(
            br#"{"timestamp_ms": 1, "event": {"StepSummary": {"step": 0, "threat_score": 0.1, "cell_count": 2}}}"#,
        );
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(
            br#"{"timestamp_ms": 2, "event": {"StepSummary": {"step": 1, "threat_score": 0.2, "cell_count": 3}}}"#,
        );

        let mut reader = TelemetryReader::new(Cursor::new(input), "inline");
        let results: Vec<_> = reader.by_ref().collect();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_ok));
        let stats = reader.stats();
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn line_limit_counts_physical_lines() {
        let mut reader =
            TelemetryReader::new(Cursor::new(LOG), "inline").with_line_limit(Some(3));
        let records = collect(&mut reader);

        // Lines 1-3: one record, one blank line, one record.
        assert_eq!(records.len(), 2);
        assert_eq!(reader.stats().lines_read, 3);
    }

    #[test]
    fn missing_file_is_reported() {
        let result = TelemetryReader::open(Path::new("/definitely/not/here.jsonl"));
        assert!(matches!(result, Err(AnalysisError::MissingInput { .. })));
    }

    #[test]
    fn stimulus_lines_decode() {
        let input = "{\"step\": 1, \"topic\": \"activator\", \"value\": 0.5, \"duration\": 2}\n{bad}\n";
        let mut reader = StimulusReader::new(Cursor::new(input), "stim");
        let records: Vec<StimulusRecord> = reader.by_ref().filter_map(Result::ok).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(reader.stats().malformed, 1);
    }
}
