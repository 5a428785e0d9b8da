// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! KEYREC - chord-capturing note recorder.
//!
//! Key presses and releases become a time-stamped note log, which can be
//! replayed with deferred snapshot cues, exported as a Standard MIDI File,
//! or sent to a melody generation service and replaced by its answer.

pub mod audio;
pub mod config;
pub mod generation;
pub mod midi;
pub mod recording;
pub mod sequencer;
pub mod session;

pub use config::AppConfig;
pub use session::Session;
