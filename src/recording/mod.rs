// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording and export system.
//!
//! This module provides:
//! - Validated note events and the recorder mode
//! - The recording log with its time cursor
//! - Chord capture from live key input
//! - Standard MIDI file export

pub mod capture;
pub mod event;
pub mod export;
pub mod log;

pub use capture::{CaptureLatch, NoteCapture, DEFAULT_NOTE_DURATION};
pub use event::{Mode, NoteError, NoteEvent, MAX_PITCH, MAX_TIME};
pub use export::{encode, MidiExporter, DEFAULT_FILE_NAME};
pub use log::{timeline_end, RecordingLog};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_creation() {
        let capture = NoteCapture::default();
        assert!(!capture.is_armed());
    }

    #[test]
    fn test_exporter_creation() {
        let exporter = MidiExporter::new();
        assert_eq!(exporter.ppqn(), 480);
    }

    #[test]
    fn test_log_creation() {
        let log = RecordingLog::new();
        assert_eq!(log.mode(), Mode::Recording);
    }
}
