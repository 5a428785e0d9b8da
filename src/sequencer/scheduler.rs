// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback scheduler.
//!
//! Replays a recording log by scheduling one deferred snapshot per
//! breakpoint (every instant a note starts or ends) and a final cue that
//! stops playback at the end of the timeline. Each snapshot publishes the
//! notes sounding at its instant to the log.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::timer::{TimerHandle, TimerQueue};
use crate::recording::{Mode, NoteEvent, RecordingLog};

/// Payload of a playback timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cue {
    /// Publish the notes active at this time in seconds
    Snapshot(f64),
    /// End of the timeline
    Finish,
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// No playback in progress
    #[default]
    Idle,
    /// Timers are pending for a playback session
    Running,
}

/// Something observable that a fired cue changed
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackUpdate {
    /// New set of sounding notes
    Snapshot {
        /// Timeline position in seconds
        time: f64,
        /// Notes active at `time`
        active: Vec<NoteEvent>,
    },
    /// Playback reached the end of the timeline
    Finished,
}

impl PlaybackUpdate {
    /// Pitches of a snapshot, empty for `Finished`
    pub fn pitches(&self) -> Vec<u8> {
        match self {
            PlaybackUpdate::Snapshot { active, .. } => active.iter().map(NoteEvent::pitch).collect(),
            PlaybackUpdate::Finished => Vec::new(),
        }
    }
}

/// Sorted, deduplicated note start and end times
pub fn compute_breakpoints(events: &[NoteEvent]) -> Vec<f64> {
    let mut times: Vec<f64> = events
        .iter()
        .flat_map(|event| [event.start(), event.end()])
        .collect();
    times.sort_by(f64::total_cmp);
    times.dedup();
    times
}

/// Notes sounding at `time`, in log order
pub fn active_at(events: &[NoteEvent], time: f64) -> Vec<NoteEvent> {
    events
        .iter()
        .filter(|event| event.is_active_at(time))
        .copied()
        .collect()
}

/// Delay of a cue at `seconds` on the timeline.
///
/// Note times are bounded by `MAX_TIME`; anything that still does not fit
/// a `Duration` saturates instead of panicking.
fn cue_delay(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// Schedules and cancels the timers of one playback session at a time
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    state: SchedulerState,
    /// Timers created by the running session
    scheduled: Vec<TimerHandle>,
}

impl PlaybackScheduler {
    /// Create an idle scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Whether a playback session is running
    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Handles of the running session's pending timers
    pub fn scheduled(&self) -> &[TimerHandle] {
        &self.scheduled
    }

    /// Start replaying `log`.
    ///
    /// Returns false without doing anything if a session is already running.
    pub fn start(&mut self, log: &mut RecordingLog, queue: &mut TimerQueue<Cue>) -> bool {
        if self.is_running() {
            warn!("playback already running");
            return false;
        }
        // Leftovers from an earlier session must never survive into this one
        self.cancel_all(queue);

        log.set_mode(Mode::Playing);
        self.state = SchedulerState::Running;

        let breakpoints = compute_breakpoints(log.events());
        for &time in &breakpoints {
            let handle = queue.defer(cue_delay(time), Cue::Snapshot(time));
            self.scheduled.push(handle);
        }

        let end = log.end_time();
        let handle = queue.defer(cue_delay(end), Cue::Finish);
        self.scheduled.push(handle);

        info!(
            notes = log.len(),
            breakpoints = breakpoints.len(),
            end,
            "playback started"
        );
        true
    }

    /// Stop playback: cancel every pending timer and return to recording.
    ///
    /// Safe to call when idle. Returns the number of timers canceled.
    pub fn stop(&mut self, log: &mut RecordingLog, queue: &mut TimerQueue<Cue>) -> usize {
        let canceled = self.cancel_all(queue);
        if self.is_running() {
            debug!(canceled, "playback stopped");
        }
        self.state = SchedulerState::Idle;
        log.set_mode(Mode::Recording);
        canceled
    }

    /// Handle a timer popped from the queue.
    ///
    /// Timers that do not belong to the running session are ignored.
    pub fn fire(
        &mut self,
        handle: TimerHandle,
        cue: Cue,
        log: &mut RecordingLog,
        queue: &mut TimerQueue<Cue>,
    ) -> Option<PlaybackUpdate> {
        let index = self.scheduled.iter().position(|&h| h == handle)?;
        self.scheduled.swap_remove(index);

        match cue {
            Cue::Snapshot(time) => {
                let active = active_at(log.events(), time);
                debug!(time, active = active.len(), "snapshot");
                log.publish_snapshot(active.clone());
                Some(PlaybackUpdate::Snapshot { time, active })
            }
            Cue::Finish => {
                self.stop(log, queue);
                info!("playback finished");
                Some(PlaybackUpdate::Finished)
            }
        }
    }

    fn cancel_all(&mut self, queue: &mut TimerQueue<Cue>) -> usize {
        self.scheduled
            .drain(..)
            .filter(|&handle| queue.cancel(handle))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::MAX_TIME;

    fn note(pitch: u8, start: f64, duration: f64) -> NoteEvent {
        NoteEvent::new(pitch, start, duration).unwrap()
    }

    /// Pop and fire every cue due by `time`
    fn run_until(
        scheduler: &mut PlaybackScheduler,
        log: &mut RecordingLog,
        queue: &mut TimerQueue<Cue>,
        time: Duration,
    ) -> Vec<PlaybackUpdate> {
        queue.set_now(time);
        let mut updates = Vec::new();
        while let Some((handle, cue)) = queue.pop_due() {
            if let Some(update) = scheduler.fire(handle, cue, log, queue) {
                updates.push(update);
            }
        }
        updates
    }

    #[test]
    fn test_scheduler_creation() {
        let scheduler = PlaybackScheduler::new();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.scheduled().is_empty());
    }

    #[test]
    fn test_compute_breakpoints() {
        let events = vec![note(60, 0.0, 0.2), note(64, 0.2, 0.2)];
        assert_eq!(compute_breakpoints(&events), vec![0.0, 0.2, 0.4]);
    }

    #[test]
    fn test_breakpoints_sorted_from_unsorted_log() {
        let events = vec![note(67, 1.0, 0.5), note(60, 0.0, 0.25), note(64, 0.0, 0.25)];
        assert_eq!(compute_breakpoints(&events), vec![0.0, 0.25, 1.0, 1.5]);
        assert!(compute_breakpoints(&[]).is_empty());
    }

    #[test]
    fn test_active_at_half_open() {
        let events = vec![note(60, 0.0, 0.2)];
        assert_eq!(active_at(&events, 0.0), events);
        assert!(active_at(&events, 0.2).is_empty());
    }

    #[test]
    fn test_note_starting_at_breakpoint_is_active() {
        let events = vec![note(60, 0.0, 0.2), note(64, 0.2, 0.2)];
        let active = active_at(&events, 0.2);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].pitch(), 64);
    }

    #[test]
    fn test_start_schedules_breakpoints_and_finish() {
        let mut log = RecordingLog::new();
        log.append(&[60], 0.2).unwrap();
        log.append(&[64], 0.2).unwrap();
        let mut queue = TimerQueue::new();
        let mut scheduler = PlaybackScheduler::new();

        assert!(scheduler.start(&mut log, &mut queue));
        assert_eq!(log.mode(), Mode::Playing);
        // Three breakpoints plus the finish cue
        assert_eq!(scheduler.scheduled().len(), 4);
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_start_while_running_is_ignored() {
        let mut log = RecordingLog::new();
        log.append(&[60], 0.2).unwrap();
        let mut queue = TimerQueue::new();
        let mut scheduler = PlaybackScheduler::new();

        assert!(scheduler.start(&mut log, &mut queue));
        assert!(!scheduler.start(&mut log, &mut queue));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_full_playback() {
        let mut log = RecordingLog::new();
        log.append(&[60, 64], 0.2).unwrap();
        log.append(&[67], 0.2).unwrap();
        let mut queue = TimerQueue::new();
        let mut scheduler = PlaybackScheduler::new();
        scheduler.start(&mut log, &mut queue);

        let updates = run_until(&mut scheduler, &mut log, &mut queue, Duration::ZERO);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].pitches(), vec![60, 64]);
        assert_eq!(log.current_events().len(), 2);

        let updates = run_until(&mut scheduler, &mut log, &mut queue, Duration::from_millis(200));
        assert_eq!(updates[0].pitches(), vec![67]);

        let updates = run_until(&mut scheduler, &mut log, &mut queue, Duration::from_millis(400));
        assert_eq!(updates.len(), 2);
        assert!(updates[0].pitches().is_empty());
        assert_eq!(updates[1], PlaybackUpdate::Finished);

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(log.mode(), Mode::Recording);
        assert!(log.current_events().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_log_finishes_immediately() {
        let mut log = RecordingLog::new();
        let mut queue = TimerQueue::new();
        let mut scheduler = PlaybackScheduler::new();
        scheduler.start(&mut log, &mut queue);

        let updates = run_until(&mut scheduler, &mut log, &mut queue, Duration::ZERO);
        assert_eq!(updates, vec![PlaybackUpdate::Finished]);
        assert_eq!(log.mode(), Mode::Recording);
    }

    #[test]
    fn test_stop_cancels_pending_snapshots() {
        let mut log = RecordingLog::new();
        log.append(&[60], 0.2).unwrap();
        log.append(&[62], 0.2).unwrap();
        log.append(&[64], 0.2).unwrap();
        let mut queue = TimerQueue::new();
        let mut scheduler = PlaybackScheduler::new();
        scheduler.start(&mut log, &mut queue);

        let first = run_until(&mut scheduler, &mut log, &mut queue, Duration::from_millis(100));
        assert_eq!(first.len(), 1);

        let canceled = scheduler.stop(&mut log, &mut queue);
        assert_eq!(canceled, 4);
        assert_eq!(log.mode(), Mode::Recording);

        let later = run_until(&mut scheduler, &mut log, &mut queue, Duration::from_secs(10));
        assert!(later.is_empty());
        assert!(log.current_events().is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut log = RecordingLog::new();
        let mut queue = TimerQueue::new();
        let mut scheduler = PlaybackScheduler::new();

        assert_eq!(scheduler.stop(&mut log, &mut queue), 0);
        scheduler.start(&mut log, &mut queue);
        assert_eq!(scheduler.stop(&mut log, &mut queue), 1);
        assert_eq!(scheduler.stop(&mut log, &mut queue), 0);
    }

    #[test]
    fn test_foreign_timer_is_ignored() {
        let mut log = RecordingLog::new();
        let mut queue = TimerQueue::new();
        let mut scheduler = PlaybackScheduler::new();
        let stray = queue.defer(Duration::ZERO, Cue::Finish);

        assert_eq!(scheduler.fire(stray, Cue::Finish, &mut log, &mut queue), None);
    }

    #[test]
    fn test_cue_delay_saturates() {
        assert_eq!(cue_delay(0.2), Duration::from_millis(200));
        assert_eq!(cue_delay(1e20), Duration::MAX);
        assert_eq!(cue_delay(f64::NAN), Duration::MAX);
    }

    #[test]
    fn test_plays_note_at_time_limit() {
        let mut log = RecordingLog::from_events(vec![note(60, MAX_TIME - 0.5, 0.5)]);
        let mut queue = TimerQueue::new();
        let mut scheduler = PlaybackScheduler::new();

        assert!(scheduler.start(&mut log, &mut queue));
        let updates = run_until(
            &mut scheduler,
            &mut log,
            &mut queue,
            Duration::from_secs_f64(MAX_TIME),
        );
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].pitches(), vec![60]);
        assert!(updates[1].pitches().is_empty());
        assert_eq!(updates[2], PlaybackUpdate::Finished);
    }

    #[test]
    fn test_restart_after_stop() {
        let mut log = RecordingLog::new();
        log.append(&[60], 0.2).unwrap();
        let mut queue = TimerQueue::new();
        let mut scheduler = PlaybackScheduler::new();

        scheduler.start(&mut log, &mut queue);
        scheduler.stop(&mut log, &mut queue);
        assert!(scheduler.start(&mut log, &mut queue));
        assert_eq!(queue.len(), 3);
    }
}
