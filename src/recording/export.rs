// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Standard MIDI file export.
//!
//! Writes a recording log as a single-track (Type 0) MIDI file with one
//! note-on/note-off pair per event.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::event::NoteEvent;
use super::log::RecordingLog;
use crate::config::ExportConfig;
use crate::midi::messages;

/// Default file name for exports
pub const DEFAULT_FILE_NAME: &str = "output.mid";

/// Default ticks per quarter note
pub const DEFAULT_PPQN: u16 = 480;

/// Default tempo in BPM
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Default note-on velocity
pub const DEFAULT_VELOCITY: u8 = 127;

/// Largest delta time a variable-length quantity can carry
const MAX_DELTA: u64 = 0x0FFF_FFFF;

/// MIDI event for export
#[derive(Debug, Clone)]
struct MidiExportEvent {
    /// Absolute tick
    tick: u64,
    /// Orders events sharing a tick: meta, then note-offs, then note-ons
    rank: u8,
    /// Event data
    data: Vec<u8>,
}

impl MidiExportEvent {
    fn note_on(tick: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            tick,
            rank: 2,
            data: vec![
                messages::NOTE_ON | (channel & 0x0F),
                note & 0x7F,
                velocity & 0x7F,
            ],
        }
    }

    fn note_off(tick: u64, channel: u8, note: u8) -> Self {
        Self {
            tick,
            rank: 1,
            data: vec![messages::NOTE_OFF | (channel & 0x0F), note & 0x7F, 0],
        }
    }

    fn tempo(bpm: f64) -> Self {
        let microseconds = (60_000_000.0 / bpm) as u32;
        Self {
            tick: 0,
            rank: 0,
            data: vec![
                0xFF,
                0x51,
                0x03,
                ((microseconds >> 16) & 0xFF) as u8,
                ((microseconds >> 8) & 0xFF) as u8,
                (microseconds & 0xFF) as u8,
            ],
        }
    }

    fn end_of_track() -> Self {
        Self {
            tick: 0,
            rank: 0,
            data: vec![0xFF, 0x2F, 0x00],
        }
    }
}

/// MIDI file exporter
#[derive(Debug, Clone)]
pub struct MidiExporter {
    /// PPQN (ticks per quarter note)
    ppqn: u16,
    /// Tempo in BPM
    tempo: f64,
    /// Note-on velocity
    velocity: u8,
    /// MIDI channel (0-15)
    channel: u8,
}

impl MidiExporter {
    /// Create an exporter with default tempo and velocity
    pub fn new() -> Self {
        Self {
            ppqn: DEFAULT_PPQN,
            tempo: DEFAULT_TEMPO,
            velocity: DEFAULT_VELOCITY,
            channel: 0,
        }
    }

    /// Create an exporter from configuration
    pub fn from_config(config: &ExportConfig) -> Self {
        let mut exporter = Self::new();
        exporter.set_ppqn(config.ppqn);
        exporter.set_tempo(config.tempo);
        exporter.set_velocity(config.velocity);
        exporter.set_channel(config.channel);
        exporter
    }

    /// Set PPQN
    pub fn set_ppqn(&mut self, ppqn: u16) {
        self.ppqn = ppqn.max(1);
    }

    /// Get PPQN
    pub fn ppqn(&self) -> u16 {
        self.ppqn
    }

    /// Set tempo
    pub fn set_tempo(&mut self, bpm: f64) {
        self.tempo = bpm.clamp(20.0, 300.0);
    }

    /// Get tempo
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Set note-on velocity
    pub fn set_velocity(&mut self, velocity: u8) {
        self.velocity = velocity.clamp(1, 127);
    }

    /// Get note-on velocity
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Set output channel
    pub fn set_channel(&mut self, channel: u8) {
        self.channel = channel & 0x0F;
    }

    /// Get output channel
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Convert seconds to ticks at the export tempo
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        let ticks_per_second = self.ppqn as f64 * self.tempo / 60.0;
        (seconds * ticks_per_second).round() as u64
    }

    /// Encode a log to bytes.
    ///
    /// Fails with `InvalidData` when two consecutive events are further
    /// apart than a MIDI delta time can express at this tempo and PPQN.
    pub fn encode(&self, log: &RecordingLog) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, log.events())?;
        Ok(buffer)
    }

    /// Write `dir/<file_name>` and return the path written
    pub fn export_to(&self, log: &RecordingLog, dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = dir.join(file_name);
        let bytes = self.encode(log).context("Failed to encode MIDI file")?;
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write MIDI file: {:?}", path))?;
        info!(path = %path.display(), notes = log.len(), "exported MIDI file");
        Ok(path)
    }

    /// Write a Type 0 MIDI file
    pub fn write<W: Write>(&self, writer: &mut W, notes: &[NoteEvent]) -> io::Result<()> {
        let mut events = Vec::with_capacity(notes.len() * 2 + 1);
        events.push(MidiExportEvent::tempo(self.tempo));

        for note in notes {
            let start = self.seconds_to_ticks(note.start());
            let end = self.seconds_to_ticks(note.end()).max(start.saturating_add(1));
            events.push(MidiExportEvent::note_on(
                start,
                self.channel,
                note.pitch(),
                self.velocity,
            ));
            events.push(MidiExportEvent::note_off(end, self.channel, note.pitch()));
        }

        // Stable, so log order holds within a tick
        events.sort_by_key(|e| (e.tick, e.rank));

        self.write_header(writer)?;
        self.write_track(writer, &events)
    }

    /// Write MIDI file header chunk
    fn write_header<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        // MThd
        writer.write_all(b"MThd")?;
        // Chunk length (always 6)
        writer.write_all(&[0, 0, 0, 6])?;
        // Format 0
        writer.write_all(&0u16.to_be_bytes())?;
        // One track
        writer.write_all(&1u16.to_be_bytes())?;
        // PPQN
        writer.write_all(&self.ppqn.to_be_bytes())?;
        Ok(())
    }

    /// Write a track chunk
    fn write_track<W: Write>(&self, writer: &mut W, events: &[MidiExportEvent]) -> io::Result<()> {
        let mut track_data = Vec::new();
        let mut last_tick = 0u64;

        for event in events {
            let delta = event.tick.saturating_sub(last_tick);
            if delta > MAX_DELTA {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("delta of {} ticks exceeds the MIDI limit of {}", delta, MAX_DELTA),
                ));
            }
            write_variable_length(&mut track_data, delta as u32)?;
            track_data.extend_from_slice(&event.data);
            last_tick = event.tick;
        }

        write_variable_length(&mut track_data, 0)?;
        track_data.extend_from_slice(&MidiExportEvent::end_of_track().data);

        // MTrk
        writer.write_all(b"MTrk")?;
        writer.write_all(&(track_data.len() as u32).to_be_bytes())?;
        writer.write_all(&track_data)?;

        Ok(())
    }
}

impl Default for MidiExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a log with default tempo and velocity
pub fn encode(log: &RecordingLog) -> io::Result<Vec<u8>> {
    MidiExporter::new().encode(log)
}

/// Write variable-length quantity
fn write_variable_length<W: Write>(writer: &mut W, mut value: u32) -> io::Result<()> {
    let mut bytes = Vec::new();

    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    writer.write_all(&bytes)
}
