// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note events and the recorder mode.

use thiserror::Error;

/// Highest valid MIDI note number
pub const MAX_PITCH: u8 = 127;

/// Latest time in seconds a note may start or end: one day
pub const MAX_TIME: f64 = 86_400.0;

/// Errors raised when constructing a note event
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NoteError {
    /// Pitch outside 0-127
    #[error("pitch {0} is outside the MIDI range 0-127")]
    InvalidPitch(u32),
    /// Start time negative, not finite, or past `MAX_TIME`
    #[error("start time {0} must be within 0-86400 seconds")]
    InvalidStart(f64),
    /// Duration zero, negative or not finite
    #[error("duration {0} must be a finite value > 0")]
    InvalidDuration(f64),
    /// Note would end past `MAX_TIME`
    #[error("note ending at {0} seconds is past the 86400 second limit")]
    EndOutOfRange(f64),
}

/// Recorder mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Capturing chords into the log
    #[default]
    Recording,
    /// Replaying the log; the event list is read-only
    Playing,
}

/// A single captured pitch with start time and duration, both in seconds.
///
/// Fields are private so an event can only exist in a validated state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pitch: u8,
    start: f64,
    duration: f64,
}

impl NoteEvent {
    /// Create a validated note event
    pub fn new(pitch: u8, start: f64, duration: f64) -> Result<Self, NoteError> {
        if pitch > MAX_PITCH {
            return Err(NoteError::InvalidPitch(pitch as u32));
        }
        validate_duration(duration)?;
        if !start.is_finite() || !(0.0..=MAX_TIME).contains(&start) {
            return Err(NoteError::InvalidStart(start));
        }
        let end = start + duration;
        if end > MAX_TIME {
            return Err(NoteError::EndOutOfRange(end));
        }
        Ok(Self {
            pitch,
            start,
            duration,
        })
    }

    /// MIDI note number
    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    /// Start time in seconds
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// End time in seconds (exclusive)
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether the note sounds at `time`, using the half-open interval `[start, end)`
    pub fn is_active_at(&self, time: f64) -> bool {
        self.start <= time && time < self.end()
    }
}

/// Check that a duration is usable for a note
pub fn validate_duration(duration: f64) -> Result<f64, NoteError> {
    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(NoteError::InvalidDuration(duration))
    }
}
