//! Telemetry event vocabulary emitted by the morphogenetic simulation.
//!
//! Every log line is a JSON object holding a millisecond timestamp and a
//! single-key `event` object whose key names the event kind:
//!
//! ```text
//! {"timestamp_ms": 1712, "event": {"LineageShift": {"cell_id": "c-4", "lineage": "Healer"}}}
//! ```
//!
//! Decoding goes through [`Event::from_tagged`], which matches the kind name
//! against the known variants and falls back to [`Event::Unknown`] for
//! anything newer than this crate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while decoding a single telemetry line.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The line is not valid JSON or does not have the record shape.
    #[error("invalid record JSON: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The `event` object did not hold exactly one kind key.
    #[error("event object must carry exactly one kind, found {found}")]
    NotSingleKind {
        /// Number of keys present in the `event` object.
        found: usize,
    },

    /// The payload of a known kind did not match its schema.
    #[error("malformed {kind} payload: {source}")]
    Payload {
        /// Event kind whose payload failed to decode.
        kind: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Boundary event closing one simulation interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Authoritative step number for the interval.
    pub step: u64,
    /// Threat score reported by the simulation for the interval.
    pub threat_score: f64,
    /// Live cell count at the end of the interval.
    pub cell_count: u64,
}

/// A cell produced a child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellReplicated {
    /// Parent cell.
    pub cell_id: String,
    /// Newly created cell.
    pub child_id: String,
}

/// A cell switched behavioral class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageShift {
    /// Cell whose lineage changed.
    pub cell_id: String,
    /// The lineage the cell moved into.
    pub lineage: String,
}

/// A cell broadcast a signal on a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEmitted {
    /// Emitting cell (absent in older logs).
    #[serde(default)]
    pub cell_id: String,
    /// Signal topic.
    pub topic: String,
    /// Signal magnitude (absent in older logs).
    #[serde(default)]
    pub value: f64,
}

/// A cell was removed from the population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDied {
    /// The dead cell.
    pub cell_id: String,
}

/// A topology edge between two cells, used for both link events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkChange {
    /// Edge source cell.
    pub source: String,
    /// Edge target cell.
    pub target: String,
}

/// A cell voted in a quorum decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCast {
    /// Voting cell.
    pub cell_id: String,
    /// Topic the vote targets, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_topic: Option<String>,
}

/// Scenario header written at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A single telemetry event. Exactly one variant is populated per record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    /// Interval boundary carrying the authoritative step number.
    StepSummary(StepSummary),
    /// A cell replicated.
    CellReplicated(CellReplicated),
    /// A cell changed lineage.
    LineageShift(LineageShift),
    /// A signal was broadcast.
    SignalEmitted(SignalEmitted),
    /// A cell died.
    CellDied(CellDied),
    /// A topology link was added.
    LinkAdded(LinkChange),
    /// A topology link was removed.
    LinkRemoved(LinkChange),
    /// A quorum vote was cast.
    VoteCast(VoteCast),
    /// Scenario header.
    Scenario(Scenario),
    /// An event kind this crate does not model. Kept in the stream but
    /// never digested.
    #[serde(skip_serializing)]
    Unknown {
        /// The unrecognized kind name.
        kind: String,
    },
}

impl Event {
    /// Decode an event from its single-key tagged object.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotSingleKind`] when the object does not hold
    /// exactly one key, or [`DecodeError::Payload`] when a known kind's
    /// payload does not match its schema.
    pub fn from_tagged(tagged: BTreeMap<String, Value>) -> Result<Self, DecodeError> {
        let found = tagged.len();
        let mut entries = tagged.into_iter();
        let (Some((kind, payload)), None) = (entries.next(), entries.next()) else {
            return Err(DecodeError::NotSingleKind { found });
        };

        let event = match kind.as_str() {
            "StepSummary" => Self::StepSummary(decode_payload(&kind, payload)?),
            "CellReplicated" => Self::CellReplicated(decode_payload(&kind, payload)?),
            "LineageShift" => Self::LineageShift(decode_payload(&kind, payload)?),
            "SignalEmitted" => Self::SignalEmitted(decode_payload(&kind, payload)?),
            "CellDied" => Self::CellDied(decode_payload(&kind, payload)?),
            "LinkAdded" => Self::LinkAdded(decode_payload(&kind, payload)?),
            "LinkRemoved" => Self::LinkRemoved(decode_payload(&kind, payload)?),
            "VoteCast" => Self::VoteCast(decode_payload(&kind, payload)?),
            "Scenario" => Self::Scenario(decode_payload(&kind, payload)?),
            _ => Self::Unknown { kind },
        };
        Ok(event)
    }

    /// The kind name as it appears in the log.
    pub fn kind(&self) -> &str {
        match self {
            Self::StepSummary(_) => "StepSummary",
            Self::CellReplicated(_) => "CellReplicated",
            Self::LineageShift(_) => "LineageShift",
            Self::SignalEmitted(_) => "SignalEmitted",
            Self::CellDied(_) => "CellDied",
            Self::LinkAdded(_) => "LinkAdded",
            Self::LinkRemoved(_) => "LinkRemoved",
            Self::VoteCast(_) => "VoteCast",
            Self::Scenario(_) => "Scenario",
            Self::Unknown { kind } => kind,
        }
    }

    /// Whether this event closes an interval.
    pub const fn is_boundary(&self) -> bool {
        matches!(self, Self::StepSummary(_))
    }
}

fn decode_payload<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, DecodeError> {
    serde_json::from_value(payload).map_err(|source| DecodeError::Payload {
        kind: kind.to_owned(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One decoded log line.
///
/// Log order is the only sequencing guarantee; the timestamp is
/// informational.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// Wall-clock milliseconds since the Unix epoch at emission time.
    pub timestamp_ms: u64,
    /// The event carried by the line.
    pub event: Event,
}

/// Wire shape of a line before the event is resolved to a variant.
#[derive(Deserialize)]
struct RawRecord {
    timestamp_ms: u64,
    event: BTreeMap<String, Value>,
}

impl TelemetryRecord {
    /// Decode a single JSONL line.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the line is not a well-formed record.
    pub fn from_line(line: &str) -> Result<Self, DecodeError> {
        let raw: RawRecord = serde_json::from_str(line)?;
        Ok(Self {
            timestamp_ms: raw.timestamp_ms,
            event: Event::from_tagged(raw.event)?,
        })
    }

    /// The emission time as a UTC datetime, if representable.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_step_summary_with_extra_fields() {
        let line = r#"{"timestamp_ms": 10, "event": {"StepSummary": {"step": 4, "threat_score": 0.5, "cell_count": 12, "population_stats": null}}}"#;
        let record = TelemetryRecord::from_line(line);
        assert!(record.is_ok());
        let Ok(record) = record else { return };
        assert_eq!(record.timestamp_ms, 10);
        assert!(record.event.is_boundary());
        match record.event {
            Event::StepSummary(summary) => {
                assert_eq!(summary.step, 4);
                assert_eq!(summary.cell_count, 12);
                assert!((summary.threat_score - 0.5).abs() < f64::EPSILON);
            }
            other => assert_eq!(other.kind(), "StepSummary"),
        }
    }

    #[test]
    fn unknown_kind_is_preserved() {
        let line = r#"{"timestamp_ms": 1, "event": {"PeerQuarantined": {"cell_id": "a", "target_id": "b"}}}"#;
        let record = TelemetryRecord::from_line(line);
        assert!(matches!(
            record.map(|r| r.event),
            Ok(Event::Unknown { ref kind }) if kind == "PeerQuarantined"
        ));
    }

    #[test]
    fn rejects_multi_key_event() {
        let line = r#"{"timestamp_ms": 1, "event": {"CellDied": {"cell_id": "a"}, "Scenario": {"name": "x"}}}"#;
        assert!(matches!(
            TelemetryRecord::from_line(line),
            Err(DecodeError::NotSingleKind { found: 2 })
        ));
    }

    #[test]
    fn rejects_empty_event() {
        let line = r#"{"timestamp_ms": 1, "event": {}}"#;
        assert!(matches!(
            TelemetryRecord::from_line(line),
            Err(DecodeError::NotSingleKind { found: 0 })
        ));
    }

    #[test]
    fn rejects_bad_payload_for_known_kind() {
        let line = r#"{"timestamp_ms": 1, "event": {"LineageShift": {"cell_id": "a"}}}"#;
        assert!(matches!(
            TelemetryRecord::from_line(line),
            Err(DecodeError::Payload { ref kind, .. }) if kind == "LineageShift"
        ));
    }

    #[test]
    fn signal_without_value_defaults() {
        let line = r#"{"timestamp_ms": 1, "event": {"SignalEmitted": {"topic": "alarm"}}}"#;
        let event = TelemetryRecord::from_line(line).map(|r| r.event);
        assert!(matches!(event, Ok(Event::SignalEmitted(ref s)) if s.topic == "alarm"));
    }

    #[test]
    fn serializes_externally_tagged() {
        let record = TelemetryRecord {
            timestamp_ms: 7,
            event: Event::CellDied(CellDied {
                cell_id: "c-1".to_owned(),
            }),
        };
        let json = serde_json::to_string(&record).unwrap_or_default();
        assert_eq!(json, r#"{"timestamp_ms":7,"event":{"CellDied":{"cell_id":"c-1"}}}"#);

        let back = TelemetryRecord::from_line(&json);
        assert!(matches!(back, Ok(ref r) if *r == record));
    }

    #[test]
    fn timestamp_converts_to_datetime() {
        let record = TelemetryRecord {
            timestamp_ms: 1_000,
            event: Event::Scenario(Scenario {
                name: "baseline".to_owned(),
            }),
        };
        assert_eq!(record.timestamp().map(|t| t.timestamp()), Some(1));
    }
}
