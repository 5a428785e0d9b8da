// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI output abstraction layer.
//!
//! The sound engine talks to a `MidiOutput`; midir provides the hardware
//! implementation and tests provide in-memory ones.

#[cfg(feature = "midi-hardware")]
pub mod midir_backend;

use anyhow::Result;

#[cfg(feature = "midi-hardware")]
pub use midir_backend::{list_outputs, print_outputs, MidirOutput};

/// Destination for raw MIDI messages
pub trait MidiOutput: Send {
    /// Send raw MIDI bytes, e.g. `[0x90, 60, 127]` for a Note On.
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

/// Channel voice message bytes
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const CONTROL_CHANGE: u8 = 0xB0;

    // Channel Mode controller numbers
    pub const ALL_NOTES_OFF: u8 = 0x7B;

    /// Note On bytes for `channel`
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
        [NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
    }

    /// Note Off bytes for `channel`
    pub fn note_off(channel: u8, note: u8) -> [u8; 3] {
        [NOTE_OFF | (channel & 0x0F), note & 0x7F, 0]
    }

    /// All Notes Off bytes for `channel`
    pub fn all_notes_off(channel: u8) -> [u8; 3] {
        [CONTROL_CHANGE | (channel & 0x0F), ALL_NOTES_OFF, 0]
    }
}
