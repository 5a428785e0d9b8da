// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Column payload used by the melody generation service.
//!
//! The service exchanges notes field-major: one object per field, each
//! mapping a stringified event index to that event's value.
//!
//! ```json
//! {
//!   "pitch":    {"0": 60,  "1": 64},
//!   "start":    {"0": 0.0, "1": 0.2},
//!   "end":      {"0": 0.2, "1": 0.4},
//!   "step":     {"0": 0.0, "1": 0.2},
//!   "duration": {"0": 0.2, "1": 0.2}
//! }
//! ```
//!
//! `end` and `step` are derived from `start` and `duration`; they are sent
//! because the service expects them and ignored when decoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recording::{NoteError, NoteEvent, RecordingLog};

/// Errors turning a payload back into note events
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    /// A key of the pitch column is not a non-negative integer
    #[error("invalid event index {0:?}")]
    BadIndex(String),
    /// An authoritative column has no value for an index present in `pitch`
    #[error("missing {field} for event {index}")]
    MissingField {
        /// Column name
        field: &'static str,
        /// Index key
        index: String,
    },
    /// Values do not form a valid note
    #[error("event {index}: {source}")]
    InvalidNote {
        /// Index key
        index: String,
        /// Validation failure
        source: NoteError,
    },
}

/// Field-major note table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnPayload {
    /// MIDI note numbers
    pub pitch: BTreeMap<String, u8>,
    /// Start times in seconds
    pub start: BTreeMap<String, f64>,
    /// End times in seconds (derived)
    #[serde(default)]
    pub end: BTreeMap<String, f64>,
    /// Seconds since the previous event's start (derived)
    #[serde(default)]
    pub step: BTreeMap<String, f64>,
    /// Durations in seconds
    pub duration: BTreeMap<String, f64>,
}

impl ColumnPayload {
    /// Number of events described by the pitch column
    pub fn len(&self) -> usize {
        self.pitch.len()
    }

    /// Whether the payload describes no events
    pub fn is_empty(&self) -> bool {
        self.pitch.is_empty()
    }
}

/// Convert a log to the column payload, keyed by event order
pub fn to_payload(log: &RecordingLog) -> ColumnPayload {
    let mut payload = ColumnPayload::default();
    let mut previous_start = None;

    for (i, event) in log.events().iter().enumerate() {
        let key = i.to_string();
        let step = previous_start.map_or(0.0, |prev| event.start() - prev);
        previous_start = Some(event.start());

        payload.pitch.insert(key.clone(), event.pitch());
        payload.start.insert(key.clone(), event.start());
        payload.end.insert(key.clone(), event.end());
        payload.step.insert(key.clone(), step);
        payload.duration.insert(key, event.duration());
    }

    payload
}

/// Rebuild note events from a payload, ordered by numeric index.
///
/// Every index in `pitch` needs a `start` and a `duration`; `end` and
/// `step` are not consulted.
pub fn from_payload(payload: &ColumnPayload) -> Result<Vec<NoteEvent>, PayloadError> {
    let mut indexed = Vec::with_capacity(payload.pitch.len());
    for (key, &pitch) in &payload.pitch {
        let index: usize = key
            .trim()
            .parse()
            .map_err(|_| PayloadError::BadIndex(key.clone()))?;
        indexed.push((index, key, pitch));
    }
    indexed.sort_by_key(|&(index, _, _)| index);

    indexed
        .into_iter()
        .map(|(_, key, pitch)| {
            let start = column_value(&payload.start, "start", key)?;
            let duration = column_value(&payload.duration, "duration", key)?;
            NoteEvent::new(pitch, start, duration).map_err(|source| PayloadError::InvalidNote {
                index: key.clone(),
                source,
            })
        })
        .collect()
}

fn column_value(
    column: &BTreeMap<String, f64>,
    field: &'static str,
    key: &str,
) -> Result<f64, PayloadError> {
    column
        .get(key)
        .copied()
        .ok_or_else(|| PayloadError::MissingField {
            field,
            index: key.to_string(),
        })
}
