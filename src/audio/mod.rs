// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sound engine capability.
//!
//! Synthesis lives outside this crate. A session is handed something
//! that can start and stop a pitch, and calls it on key input and while
//! replaying snapshots.

use std::collections::BTreeSet;

use tracing::{trace, warn};

use crate::midi::{messages, MidiOutput};

/// Something that can voice a pitch
pub trait SoundEngine: Send {
    /// Start sounding `pitch`
    fn play_pitch(&mut self, pitch: u8);

    /// Stop sounding `pitch`
    fn stop_pitch(&mut self, pitch: u8);

    /// Silence everything, including notes this engine did not start
    fn all_notes_off(&mut self) {}
}

/// Engine that makes no sound
#[derive(Debug, Default)]
pub struct SilentEngine;

impl SoundEngine for SilentEngine {
    fn play_pitch(&mut self, pitch: u8) {
        trace!(pitch, "play (silent)");
    }

    fn stop_pitch(&mut self, pitch: u8) {
        trace!(pitch, "stop (silent)");
    }
}

/// Engine that voices pitches through a MIDI output
pub struct MidiSoundEngine<O: MidiOutput> {
    output: O,
    channel: u8,
    velocity: u8,
    /// Pitches with an outstanding note-on
    sounding: BTreeSet<u8>,
}

impl<O: MidiOutput> MidiSoundEngine<O> {
    /// Create an engine sending on `channel` with a fixed `velocity`
    pub fn new(output: O, channel: u8, velocity: u8) -> Self {
        Self {
            output,
            channel: channel & 0x0F,
            velocity: velocity.clamp(1, 127),
            sounding: BTreeSet::new(),
        }
    }

    /// Pitches currently sounding
    pub fn sounding(&self) -> impl Iterator<Item = u8> + '_ {
        self.sounding.iter().copied()
    }

    /// Send All Notes Off and forget every sounding pitch
    pub fn panic(&mut self) {
        self.sounding.clear();
        self.send(&messages::all_notes_off(self.channel));
    }

    fn send(&mut self, message: &[u8]) {
        // A dropped note must not interrupt recording or playback
        if let Err(e) = self.output.send(message) {
            warn!("MIDI send failed: {}", e);
        }
    }
}

impl<O: MidiOutput> SoundEngine for MidiSoundEngine<O> {
    fn play_pitch(&mut self, pitch: u8) {
        if self.sounding.insert(pitch) {
            self.send(&messages::note_on(self.channel, pitch, self.velocity));
        }
    }

    fn stop_pitch(&mut self, pitch: u8) {
        if self.sounding.remove(&pitch) {
            self.send(&messages::note_off(self.channel, pitch));
        }
    }

    fn all_notes_off(&mut self) {
        self.panic();
    }
}
