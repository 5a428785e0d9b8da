// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The recording log.
//!
//! An ordered list of note events plus the time cursor that new chords
//! are placed at, the recorder mode, and the snapshot of notes active
//! at the current playback instant.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::event::{validate_duration, Mode, NoteError, NoteEvent};

/// Note event log owned by a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingLog {
    /// Events in insertion order
    events: Vec<NoteEvent>,
    /// Start time for the next captured chord, in seconds
    current_time: f64,
    /// Current mode
    mode: Mode,
    /// Events sounding at the current playback instant
    current_events: Vec<NoteEvent>,
}

impl RecordingLog {
    /// Create an empty log in recording mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from existing events.
    ///
    /// The time cursor is placed at the end of the timeline so further
    /// captures land after the supplied notes.
    pub fn from_events(events: Vec<NoteEvent>) -> Self {
        let current_time = timeline_end(&events);
        Self {
            events,
            current_time,
            mode: Mode::Recording,
            current_events: Vec::new(),
        }
    }

    /// Recorded events in insertion order
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events have been recorded
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time cursor in seconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the log is being replayed
    pub fn is_playing(&self) -> bool {
        self.mode == Mode::Playing
    }

    /// Events active at the current playback instant
    pub fn current_events(&self) -> &[NoteEvent] {
        &self.current_events
    }

    /// End of the timeline: the latest note end, or 0 when empty
    pub fn end_time(&self) -> f64 {
        timeline_end(&self.events)
    }

    /// Append one chord at the time cursor and advance the cursor.
    ///
    /// Every distinct pitch becomes one event sharing the same start and
    /// duration. Returns the number of events appended, which is 0 when
    /// the log is not recording or the chord is empty. Nothing is appended
    /// if any pitch or the duration is invalid.
    pub fn append(&mut self, pitches: &[u8], duration: f64) -> Result<usize, NoteError> {
        if self.mode != Mode::Recording {
            warn!(?pitches, "ignoring chord while playing");
            return Ok(0);
        }
        let duration = validate_duration(duration)?;

        let chord: BTreeSet<u8> = pitches.iter().copied().collect();
        if chord.is_empty() {
            debug!("ignoring empty chord");
            return Ok(0);
        }

        let notes = chord
            .iter()
            .map(|&pitch| NoteEvent::new(pitch, self.current_time, duration))
            .collect::<Result<Vec<_>, _>>()?;

        let count = notes.len();
        self.events.extend(notes);
        self.current_time += duration;

        debug!(
            count,
            duration,
            current_time = self.current_time,
            "chord appended"
        );
        Ok(count)
    }

    /// Change mode. Returning to recording drops the playback snapshot.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        debug!(from = ?self.mode, to = ?mode, "mode change");
        if mode == Mode::Recording {
            self.current_events.clear();
        }
        self.mode = mode;
    }

    /// Replace the playback snapshot
    pub fn publish_snapshot(&mut self, active: Vec<NoteEvent>) {
        self.current_events = active;
    }

    /// Discard all history and return to the initial state.
    ///
    /// Callers holding a scheduler must stop it first; see `Session::clear`.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Latest note end over `events`, or 0 when there are none
pub fn timeline_end(events: &[NoteEvent]) -> f64 {
    events.iter().map(NoteEvent::end).fold(0.0, f64::max)
}
