// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording session.
//!
//! Owns the recording log together with everything allowed to change it:
//! the capture latch fed by key input, the playback scheduler and its
//! timer queue, and the sound engine. All mutation goes through `&mut
//! Session`, so sharing a session between tasks means wrapping it in one
//! lock.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::audio::SoundEngine;
use crate::config::AppConfig;
use crate::recording::{Mode, MidiExporter, NoteCapture, NoteError, RecordingLog};
use crate::sequencer::{Cue, PlaybackScheduler, PlaybackUpdate, TimerQueue};

/// A single user's recording session
pub struct Session {
    log: RecordingLog,
    capture: NoteCapture,
    scheduler: PlaybackScheduler,
    timers: TimerQueue<Cue>,
    engine: Box<dyn SoundEngine>,
    exporter: MidiExporter,
    export_file_name: String,
    /// Incremented every time playback starts
    playback_id: u64,
    /// Pitches the engine is sounding on behalf of playback
    voiced: BTreeSet<u8>,
}

impl Session {
    /// Create a session with default settings
    pub fn new(engine: Box<dyn SoundEngine>) -> Self {
        Self {
            log: RecordingLog::new(),
            capture: NoteCapture::default(),
            scheduler: PlaybackScheduler::new(),
            timers: TimerQueue::new(),
            engine,
            exporter: MidiExporter::new(),
            export_file_name: crate::recording::DEFAULT_FILE_NAME.to_string(),
            playback_id: 0,
            voiced: BTreeSet::new(),
        }
    }

    /// Create a session from configuration
    pub fn with_config(config: &AppConfig, engine: Box<dyn SoundEngine>) -> Result<Self, NoteError> {
        let mut session = Self::new(engine);
        session.capture = NoteCapture::new(config.capture.chord_duration)?;
        session.exporter = MidiExporter::from_config(&config.export);
        session.export_file_name = config.export.file_name.clone();
        Ok(session)
    }

    /// The recording log
    pub fn log(&self) -> &RecordingLog {
        &self.log
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.log.mode()
    }

    /// Whether playback is running
    pub fn is_playing(&self) -> bool {
        self.scheduler.is_running()
    }

    /// The capture latch
    pub fn capture(&self) -> &NoteCapture {
        &self.capture
    }

    /// Identifier of the latest playback session
    pub fn playback_id(&self) -> u64 {
        self.playback_id
    }

    /// Pitches to highlight on the keyboard: the playback snapshot while
    /// playing, `None` otherwise
    pub fn active_notes(&self) -> Option<Vec<u8>> {
        if self.log.is_playing() {
            Some(self.log.current_events().iter().map(|e| e.pitch()).collect())
        } else {
            None
        }
    }

    /// A key went down
    pub fn press(&mut self, pitch: u8) {
        self.engine.play_pitch(pitch);
        self.capture.on_press(pitch);
    }

    /// A key came up while `active_before` were held.
    ///
    /// Returns the number of events captured. Invalid input is logged and
    /// dropped rather than reported.
    pub fn release(&mut self, pitch: u8, active_before: &[u8]) -> usize {
        self.engine.stop_pitch(pitch);
        match self.capture.on_release(pitch, active_before, &mut self.log) {
            Ok(count) => count,
            Err(e) => {
                warn!(pitch, "dropping chord: {}", e);
                0
            }
        }
    }

    /// Start replaying the log. Returns false if playback is already running.
    pub fn play(&mut self) -> bool {
        if !self.scheduler.start(&mut self.log, &mut self.timers) {
            return false;
        }
        self.playback_id += 1;
        true
    }

    /// Stop playback; no snapshot fires after this returns.
    ///
    /// Interrupting a running playback also sends the engine an all-off.
    pub fn stop(&mut self) {
        let was_playing = self.scheduler.is_running();
        self.scheduler.stop(&mut self.log, &mut self.timers);
        self.silence();
        if was_playing {
            self.engine.all_notes_off();
        }
    }

    /// Stop playback and discard the whole recording
    pub fn clear(&mut self) {
        self.stop();
        self.log.clear();
        info!("recording cleared");
    }

    /// Adopt a log wholesale, e.g. one returned by the generation service
    pub fn replace_log(&mut self, log: RecordingLog) {
        self.stop();
        info!(notes = log.len(), "log replaced");
        self.log = log;
        self.log.set_mode(Mode::Recording);
    }

    /// Session clock: time of the timer queue
    pub fn clock(&self) -> Duration {
        self.timers.now()
    }

    /// Clock time of the next playback cue, if playback is running
    pub fn next_deadline(&mut self) -> Option<Duration> {
        if !self.scheduler.is_running() {
            return None;
        }
        self.timers.next_due()
    }

    /// Move the session clock to `time` and fire every cue due by then.
    ///
    /// Cues fire one at a time, so a cue that stops playback cancels the
    /// rest before they are popped.
    pub fn advance_to(&mut self, time: Duration) -> Vec<PlaybackUpdate> {
        self.timers.set_now(time);

        let mut updates = Vec::new();
        while let Some((handle, cue)) = self.timers.pop_due() {
            if let Some(update) =
                self.scheduler
                    .fire(handle, cue, &mut self.log, &mut self.timers)
            {
                self.voice(&update);
                updates.push(update);
            }
        }
        updates
    }

    /// Encode the log as a MIDI file
    pub fn export_bytes(&self) -> std::io::Result<Vec<u8>> {
        self.exporter.encode(&self.log)
    }

    /// Write the log as a MIDI file into `dir`
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        self.exporter.export_to(&self.log, dir, &self.export_file_name)
    }

    /// Bring the engine in line with a playback update
    fn voice(&mut self, update: &PlaybackUpdate) {
        match update {
            PlaybackUpdate::Snapshot { .. } => {
                let next: BTreeSet<u8> = update.pitches().into_iter().collect();
                for &pitch in self.voiced.difference(&next) {
                    self.engine.stop_pitch(pitch);
                }
                for &pitch in next.difference(&self.voiced) {
                    self.engine.play_pitch(pitch);
                }
                self.voiced = next;
            }
            PlaybackUpdate::Finished => self.silence(),
        }
    }

    fn silence(&mut self) {
        if self.voiced.is_empty() {
            return;
        }
        debug!(count = self.voiced.len(), "silencing playback");
        for pitch in std::mem::take(&mut self.voiced) {
            self.engine.stop_pitch(pitch);
        }
    }
}
