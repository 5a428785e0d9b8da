// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for KEYREC
//!
//! These tests drive the public API end to end: key input through the
//! session, playback on the session clock and in real time, export, and
//! the generation round trip against a local mock service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use keyrec::audio::{SilentEngine, SoundEngine};
use keyrec::generation::{from_payload, to_payload, ColumnPayload, GenerationClient};
use keyrec::recording::{encode, Mode, NoteEvent, RecordingLog};
use keyrec::sequencer::{compute_breakpoints, spawn_player, PlaybackUpdate};
use keyrec::{AppConfig, Session};
use midly::{MidiMessage, Smf, TrackEventKind};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Sound engine that records what it was asked to voice
#[derive(Clone, Default)]
struct CountingEngine {
    sounding: Arc<Mutex<Vec<u8>>>,
}

impl SoundEngine for CountingEngine {
    fn play_pitch(&mut self, pitch: u8) {
        self.sounding.lock().unwrap().push(pitch);
    }

    fn stop_pitch(&mut self, pitch: u8) {
        self.sounding.lock().unwrap().retain(|&p| p != pitch);
    }
}

/// Press every pitch, then release them one by one
fn play_chord(session: &mut Session, pitches: &[u8]) {
    for &pitch in pitches {
        session.press(pitch);
    }
    let mut held = pitches.to_vec();
    for &pitch in pitches {
        session.release(pitch, &held);
        held.retain(|&p| p != pitch);
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<PlaybackUpdate>) -> Vec<PlaybackUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn generation_config(endpoint: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.generation.endpoint = endpoint.to_string();
    config.generation.timeout_ms = 5_000;
    config
}

#[test]
fn test_chord_shares_start_and_duration() {
    let mut session = Session::new(Box::new(SilentEngine));
    play_chord(&mut session, &[60, 64, 67]);

    let events = session.log().events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.start() == 0.0 && e.duration() == 0.2));
    assert_eq!(session.log().current_time(), 0.2);
}

#[test]
fn test_current_time_is_sum_of_durations() {
    let mut config = AppConfig::default();
    config.capture.chord_duration = 0.25;
    let mut session = Session::with_config(&config, Box::new(SilentEngine)).unwrap();

    let progression: [&[u8]; 4] = [&[60], &[62, 65], &[64], &[67, 71, 74]];
    for chord in progression {
        play_chord(&mut session, chord);
    }

    assert_eq!(session.log().len(), 7);
    assert_eq!(session.log().current_time(), 1.0);
}

#[test]
fn test_breakpoints_of_sequential_notes() {
    let events = vec![
        NoteEvent::new(60, 0.0, 0.2).unwrap(),
        NoteEvent::new(64, 0.2, 0.2).unwrap(),
    ];
    assert_eq!(compute_breakpoints(&events), vec![0.0, 0.2, 0.4]);
}

#[test]
fn test_single_note_snapshots() {
    let mut session = Session::new(Box::new(SilentEngine));
    play_chord(&mut session, &[60]);

    session.play();
    let updates = session.advance_to(Duration::from_secs(1));

    assert_eq!(updates.len(), 3);
    assert_eq!(updates[0].pitches(), vec![60]);
    assert!(updates[1].pitches().is_empty());
    assert_eq!(updates[2], PlaybackUpdate::Finished);
    assert_eq!(session.mode(), Mode::Recording);
}

#[test]
fn test_stop_prevents_further_snapshots() {
    let engine = CountingEngine::default();
    let sounding = Arc::clone(&engine.sounding);
    let mut session = Session::new(Box::new(engine));
    play_chord(&mut session, &[60, 64]);
    play_chord(&mut session, &[67]);

    session.play();
    assert_eq!(session.advance_to(Duration::from_millis(50)).len(), 1);
    assert_eq!(*sounding.lock().unwrap(), vec![60, 64]);

    session.stop();
    assert!(sounding.lock().unwrap().is_empty());
    assert!(session.advance_to(Duration::from_secs(10)).is_empty());
    assert_eq!(session.active_notes(), None);
}

#[test]
fn test_clear_cancels_playback() {
    let mut session = Session::new(Box::new(SilentEngine));
    play_chord(&mut session, &[60]);
    play_chord(&mut session, &[62]);
    session.play();
    session.advance_to(Duration::from_millis(100));

    session.clear();

    assert!(session.log().is_empty());
    assert_eq!(session.log().current_time(), 0.0);
    assert_eq!(session.mode(), Mode::Recording);
    assert!(session.advance_to(Duration::from_secs(10)).is_empty());

    // Recording resumes from zero
    play_chord(&mut session, &[72]);
    assert_eq!(session.log().events()[0].start(), 0.0);
}

#[test]
fn test_payload_round_trip_of_recorded_take() {
    let mut session = Session::new(Box::new(SilentEngine));
    play_chord(&mut session, &[48, 52, 55]);
    play_chord(&mut session, &[53]);
    play_chord(&mut session, &[55, 59]);

    let json = serde_json::to_string(&to_payload(session.log())).unwrap();
    let payload: ColumnPayload = serde_json::from_str(&json).unwrap();
    let events = from_payload(&payload).unwrap();

    assert_eq!(events, session.log().events());
}

#[test]
fn test_encode_empty_log() {
    let bytes = encode(&RecordingLog::new()).unwrap();
    let smf = Smf::parse(&bytes).unwrap();

    assert_eq!(smf.tracks.len(), 1);
    let notes = smf.tracks[0]
        .iter()
        .filter(|e| matches!(e.kind, TrackEventKind::Midi { .. }))
        .count();
    assert_eq!(notes, 0);
}

#[test]
fn test_export_recorded_take() {
    let mut session = Session::new(Box::new(SilentEngine));
    play_chord(&mut session, &[60, 64]);
    play_chord(&mut session, &[67]);

    let dir = tempfile::tempdir().unwrap();
    let path = session.export_to(dir.path()).unwrap();
    assert!(path.ends_with("output.mid"));

    let bytes = std::fs::read(&path).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    let note_ons: Vec<u8> = smf.tracks[0]
        .iter()
        .filter_map(|e| match e.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } if vel.as_int() > 0 => Some(key.as_int()),
            _ => None,
        })
        .collect();
    assert_eq!(note_ons, vec![60, 64, 67]);
}

#[tokio::test(start_paused = true)]
async fn test_real_time_playback() {
    let mut session = Session::new(Box::new(SilentEngine));
    play_chord(&mut session, &[60]);
    play_chord(&mut session, &[62]);
    let session = Arc::new(Mutex::new(session));
    session.lock().unwrap().play();

    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_player(Arc::clone(&session), tx).await.unwrap();

    let updates = drain(&mut rx);
    let pitches: Vec<Vec<u8>> = updates.iter().map(|u| u.pitches()).collect();
    assert_eq!(pitches, vec![vec![60], vec![62], vec![], vec![]]);
    assert_eq!(updates.last(), Some(&PlaybackUpdate::Finished));
    assert!(!session.lock().unwrap().is_playing());
}

#[tokio::test]
async fn test_generation_replaces_log() {
    let app = Router::new().route(
        "/",
        post(|Json(mut payload): Json<ColumnPayload>| async move {
            // Transpose everything up an octave
            for pitch in payload.pitch.values_mut() {
                *pitch += 12;
            }
            Json(payload)
        }),
    );
    let endpoint = serve(app).await;
    let config = generation_config(&endpoint);

    let mut session = Session::with_config(&config, Box::new(SilentEngine)).unwrap();
    play_chord(&mut session, &[60, 64]);
    play_chord(&mut session, &[67]);

    let client = GenerationClient::new(&config.generation).unwrap();
    let generated = client.request(session.log()).await.unwrap();
    session.replace_log(generated);

    let pitches: Vec<u8> = session.log().events().iter().map(|e| e.pitch()).collect();
    assert_eq!(pitches, vec![72, 76, 79]);
    assert_eq!(session.log().current_time(), 0.4);
    assert_eq!(session.mode(), Mode::Recording);

    // The adopted log plays like a recorded one
    assert!(session.play());
    let updates = session.advance_to(Duration::from_secs(1));
    assert_eq!(updates[0].pitches(), vec![72, 76]);
}

#[tokio::test]
async fn test_failed_generation_leaves_log_unchanged() {
    let app = Router::new().route("/", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let endpoint = serve(app).await;
    let config = generation_config(&endpoint);

    let mut session = Session::with_config(&config, Box::new(SilentEngine)).unwrap();
    play_chord(&mut session, &[60]);
    let before = session.log().clone();

    let client = GenerationClient::new(&config.generation).unwrap();
    let result = client.request(session.log()).await;

    assert!(result.is_err());
    assert!(!client.is_loading());
    assert_eq!(*session.log(), before);
}

#[tokio::test]
async fn test_generated_start_past_limit_is_rejected() {
    let app = Router::new().route(
        "/",
        post(|| async {
            Json(serde_json::json!({
                "pitch": {"0": 60},
                "start": {"0": 1e20},
                "duration": {"0": 0.2}
            }))
        }),
    );
    let endpoint = serve(app).await;
    let config = generation_config(&endpoint);

    let mut session = Session::with_config(&config, Box::new(SilentEngine)).unwrap();
    play_chord(&mut session, &[60]);
    let before = session.log().clone();

    let client = GenerationClient::new(&config.generation).unwrap();
    let err = client.request(session.log()).await.unwrap_err();

    assert!(err.is_decode());
    assert!(!client.is_loading());
    assert_eq!(*session.log(), before);

    // The kept take still plays and exports
    assert!(session.play());
    let updates = session.advance_to(Duration::from_secs(1));
    assert_eq!(updates.last(), Some(&PlaybackUpdate::Finished));
    assert!(session.export_bytes().is_ok());
}

#[tokio::test]
async fn test_generated_notes_at_time_limit_play_and_export() {
    let app = Router::new().route(
        "/",
        post(|| async {
            Json(serde_json::json!({
                "pitch": {"0": 60, "1": 64},
                "start": {"0": 0.0, "1": 86399.5},
                "duration": {"0": 0.2, "1": 0.5}
            }))
        }),
    );
    let endpoint = serve(app).await;
    let config = generation_config(&endpoint);

    let mut session = Session::with_config(&config, Box::new(SilentEngine)).unwrap();
    play_chord(&mut session, &[60]);

    let client = GenerationClient::new(&config.generation).unwrap();
    let generated = client.request(session.log()).await.unwrap();
    session.replace_log(generated);
    assert_eq!(session.log().current_time(), 86_400.0);

    assert!(session.play());
    let updates = session.advance_to(Duration::from_secs(86_400));
    let pitches: Vec<Vec<u8>> = updates.iter().map(|u| u.pitches()).collect();
    assert_eq!(pitches, vec![vec![60], vec![], vec![64], vec![], vec![]]);
    assert_eq!(updates.last(), Some(&PlaybackUpdate::Finished));

    let bytes = session.export_bytes().unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    let note_ons = smf.tracks[0]
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { .. },
                    ..
                }
            )
        })
        .count();
    assert_eq!(note_ons, 2);
}
