// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use anyhow::{anyhow, Context, Result};
use keyrec::audio::{SilentEngine, SoundEngine};
use keyrec::generation::GenerationClient;
use keyrec::sequencer::{spawn_player, PlaybackUpdate};
use keyrec::{AppConfig, Session};
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{info, Level};

/// C - F - G - C, held one at a time like a player releasing each key
const DEMO_PROGRESSION: &[&[u8]] = &[&[60, 64, 67], &[65, 69, 72], &[67, 71, 74], &[60, 64, 67, 72]];

fn print_usage() {
    println!("KEYREC - Chord Recorder");
    println!();
    println!("Usage: keyrec [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --demo                  Record a demo progression, play it back and export it");
    println!("  --generate              Like --demo, but replace the take with a generated melody");
    println!("  --config <FILE>         Load settings from a YAML or TOML file");
    println!("  --out <DIR>             Directory for the exported MIDI file (default .)");
    #[cfg(feature = "midi-hardware")]
    println!("  --list-midi             List available MIDI outputs");
    #[cfg(feature = "midi-hardware")]
    println!("  --midi-out <N|NAME>     Voice notes on MIDI output N, or the first whose name contains NAME");
    println!("  --verbose               Enable debug logging");
    println!("  --help                  Show this help message");
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Demo,
    Generate,
    #[cfg(feature = "midi-hardware")]
    ListMidi,
    Help,
}

#[derive(Debug)]
struct Options {
    command: Option<Command>,
    config: Option<PathBuf>,
    out: PathBuf,
    midi_out: Option<String>,
    verbose: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options {
        command: None,
        config: None,
        out: PathBuf::from("."),
        midi_out: None,
        verbose: false,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--demo" => options.command = Some(Command::Demo),
            "--generate" => options.command = Some(Command::Generate),
            #[cfg(feature = "midi-hardware")]
            "--list-midi" => options.command = Some(Command::ListMidi),
            "--help" | "-h" => options.command = Some(Command::Help),
            "--verbose" | "-v" => options.verbose = true,
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--out" => {
                let dir = iter
                    .next()
                    .ok_or_else(|| anyhow!("--out requires a directory"))?;
                options.out = PathBuf::from(dir);
            }
            "--midi-out" => {
                let port = iter
                    .next()
                    .ok_or_else(|| anyhow!("--midi-out requires an output number or name"))?;
                options.midi_out = Some(port.clone());
            }
            other => return Err(anyhow!("Unknown option: {}", other)),
        }
    }

    Ok(options)
}

#[cfg(feature = "midi-hardware")]
fn sound_engine(options: &Options, config: &AppConfig) -> Result<Box<dyn SoundEngine>> {
    use keyrec::audio::MidiSoundEngine;
    use keyrec::midi::MidirOutput;

    match options.midi_out.as_deref() {
        Some(port) => {
            let output = match port.parse::<usize>() {
                Ok(index) => MidirOutput::new(index)?,
                Err(_) => MidirOutput::new_by_name(port)?,
            };
            println!("Voicing notes on {}", output.port_name());
            Ok(Box::new(MidiSoundEngine::new(
                output,
                config.export.channel,
                config.export.velocity,
            )))
        }
        None => Ok(Box::new(SilentEngine)),
    }
}

#[cfg(not(feature = "midi-hardware"))]
fn sound_engine(options: &Options, _config: &AppConfig) -> Result<Box<dyn SoundEngine>> {
    if options.midi_out.is_some() {
        return Err(anyhow!(
            "--midi-out needs a build with the midi-hardware feature"
        ));
    }
    Ok(Box::new(SilentEngine))
}

/// Feed the progression through the session as key presses and releases
fn record_progression(session: &mut Session, progression: &[&[u8]]) {
    for chord in progression {
        for &pitch in chord.iter() {
            session.press(pitch);
        }
        let mut held = chord.to_vec();
        for &pitch in chord.iter() {
            session.release(pitch, &held);
            held.retain(|&p| p != pitch);
        }
    }
}

/// Play the session's log in real time, printing each snapshot
async fn play(session: &Arc<Mutex<Session>>) -> Result<()> {
    {
        let mut session = session.lock().map_err(|_| anyhow!("session lock poisoned"))?;
        if !session.play() {
            return Ok(());
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let player = spawn_player(Arc::clone(session), tx);

    while let Some(update) = rx.recv().await {
        match update {
            PlaybackUpdate::Snapshot { time, .. } => {
                println!("  {:>6.2}s  {:?}", time, update.pitches());
            }
            PlaybackUpdate::Finished => println!("  finished"),
        }
    }

    player.await.context("playback task failed")?;
    Ok(())
}

fn export(session: &Arc<Mutex<Session>>, options: &Options) -> Result<()> {
    let session = session.lock().map_err(|_| anyhow!("session lock poisoned"))?;
    let path = session.export_to(&options.out)?;
    println!("Exported {} notes to {}", session.log().len(), path.display());
    Ok(())
}

async fn run_demo(options: &Options, config: &AppConfig, generate: bool) -> Result<()> {
    let mut session = Session::with_config(config, sound_engine(options, config)?)
        .context("Invalid capture settings")?;
    record_progression(&mut session, DEMO_PROGRESSION);
    println!(
        "Recorded {} notes ({:.2}s)",
        session.log().len(),
        session.log().current_time()
    );
    let session = Arc::new(Mutex::new(session));

    println!("Playback:");
    play(&session).await?;

    if generate {
        let client = GenerationClient::new(&config.generation)?;
        let take = session
            .lock()
            .map_err(|_| anyhow!("session lock poisoned"))?
            .log()
            .clone();

        println!("Requesting generation from {}...", client.endpoint());
        let generated = client.request(&take).await?;
        info!(notes = generated.len(), "adopting generated log");
        session
            .lock()
            .map_err(|_| anyhow!("session lock poisoned"))?
            .replace_log(generated);

        println!("Generated playback:");
        play(&session).await?;
    }

    export(&session, options)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    let level = if options.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = match &options.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match options.command {
        Some(Command::Demo) => run_demo(&options, &config, false).await?,
        Some(Command::Generate) => run_demo(&options, &config, true).await?,
        #[cfg(feature = "midi-hardware")]
        Some(Command::ListMidi) => keyrec::midi::print_outputs(),
        Some(Command::Help) => print_usage(),
        None => {
            println!("KEYREC - Chord Recorder");
            println!("Run with --help for usage information");
        }
    }

    Ok(())
}
