// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequencer core for replaying a recording log.
//!
//! This module provides the playback infrastructure:
//! - A timer queue of deferred, cancelable cues
//! - The playback scheduler that turns a log into snapshot cues
//! - A real-time player that fires due cues on the wall clock

pub mod player;
pub mod scheduler;
pub mod timer;

pub use player::{drive, spawn_player};
pub use scheduler::{
    active_at, compute_breakpoints, Cue, PlaybackScheduler, PlaybackUpdate, SchedulerState,
};
pub use timer::{TimerHandle, TimerQueue};
