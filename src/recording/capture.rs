// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Chord capture from live key input.
//!
//! The keyboard reports every key press and release on its own. Releasing
//! a chord produces one release per finger, so logging each release
//! would split one chord into several. The capture latch records the
//! chord on the first release after a press and swallows the remaining
//! releases of the same gesture.

use tracing::debug;

use super::event::{validate_duration, NoteError};
use super::log::RecordingLog;

/// Duration unit for captured chords, in seconds.
///
/// The keyboard does not report release timing precisely enough to
/// derive per-note durations, so every chord gets the same unit.
pub const DEFAULT_NOTE_DURATION: f64 = 0.2;

/// Latch state between a press and the releases that follow it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureLatch {
    /// Set once the current gesture has been captured
    pub armed: bool,
    /// Duration given to the next captured chord
    pub pending_duration: f64,
}

impl CaptureLatch {
    /// Create a disarmed latch
    pub fn new(pending_duration: f64) -> Self {
        Self {
            armed: false,
            pending_duration,
        }
    }
}

/// Converts raw press/release input into chord events
#[derive(Debug, Clone)]
pub struct NoteCapture {
    latch: CaptureLatch,
    chord_duration: f64,
}

impl NoteCapture {
    /// Create a capture with the given chord duration in seconds
    pub fn new(chord_duration: f64) -> Result<Self, NoteError> {
        let chord_duration = validate_duration(chord_duration)?;
        Ok(Self {
            latch: CaptureLatch::new(chord_duration),
            chord_duration,
        })
    }

    /// Current latch state
    pub fn latch(&self) -> CaptureLatch {
        self.latch
    }

    /// Whether releases are currently being swallowed
    pub fn is_armed(&self) -> bool {
        self.latch.armed
    }

    /// Duration given to each captured chord
    pub fn chord_duration(&self) -> f64 {
        self.chord_duration
    }

    /// A key went down: start a new gesture
    pub fn on_press(&mut self, pitch: u8) {
        if self.latch.armed {
            debug!(pitch, "latch disarmed");
        }
        self.latch.armed = false;
    }

    /// A key came up.
    ///
    /// `active_before` is the set of keys held just before this release.
    /// The first release of a gesture captures that whole set as one chord
    /// and arms the latch; later releases are ignored until the next press.
    /// Returns the number of events appended to `log`.
    pub fn on_release(
        &mut self,
        pitch: u8,
        active_before: &[u8],
        log: &mut RecordingLog,
    ) -> Result<usize, NoteError> {
        if self.latch.armed {
            return Ok(0);
        }
        if active_before.is_empty() {
            debug!(pitch, "release with no held keys");
            return Ok(0);
        }

        // The gesture is spent whether or not the chord was valid
        let result = Self::capture_chord(log, active_before, self.latch.pending_duration);
        self.latch = CaptureLatch {
            armed: true,
            pending_duration: self.chord_duration,
        };
        let captured = result?;
        debug!(pitch, captured, "latch armed");
        Ok(captured)
    }

    /// Append a chord to the log; ignored unless the log is recording
    pub fn capture_chord(
        log: &mut RecordingLog,
        pitches: &[u8],
        duration: f64,
    ) -> Result<usize, NoteError> {
        log.append(pitches, duration)
    }
}

impl Default for NoteCapture {
    fn default() -> Self {
        Self {
            latch: CaptureLatch::new(DEFAULT_NOTE_DURATION),
            chord_duration: DEFAULT_NOTE_DURATION,
        }
    }
}
