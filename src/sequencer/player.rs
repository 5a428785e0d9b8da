// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Real-time playback driver.
//!
//! Maps the session clock onto the wall clock: sleeps until the next cue
//! is due, then advances the session under its lock and forwards what
//! fired. The lock is never held across a sleep, so key input and `stop`
//! from other tasks interleave freely with playback.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::scheduler::PlaybackUpdate;
use crate::session::Session;

/// Drive the playback session that is current when this is called.
///
/// Returns once playback finishes, is stopped, or a newer playback
/// session replaces it. Updates are sent to `updates`; a closed receiver
/// does not stop playback.
pub async fn drive(session: Arc<Mutex<Session>>, updates: UnboundedSender<PlaybackUpdate>) {
    let (playback_id, base) = match session.lock() {
        Ok(session) => (session.playback_id(), session.clock()),
        Err(_) => return,
    };
    let started = Instant::now();
    debug!(playback_id, "player started");

    loop {
        let deadline = {
            let Ok(mut session) = session.lock() else {
                break;
            };
            if session.playback_id() != playback_id {
                break;
            }
            match session.next_deadline() {
                Some(deadline) => deadline,
                None => break,
            }
        };

        sleep_until(started + deadline.saturating_sub(base)).await;

        let fired = {
            let Ok(mut session) = session.lock() else {
                break;
            };
            if session.playback_id() != playback_id {
                break;
            }
            session.advance_to(base + started.elapsed())
        };

        for update in fired {
            let _ = updates.send(update);
        }
    }

    debug!(playback_id, "player exited");
}

/// Spawn `drive` on the current tokio runtime
pub fn spawn_player(
    session: Arc<Mutex<Session>>,
    updates: UnboundedSender<PlaybackUpdate>,
) -> JoinHandle<()> {
    tokio::spawn(drive(session, updates))
}
