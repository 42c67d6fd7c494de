//! A small REPL that reads music/sound lumps out of a DOOM-style WAD and
//! drives them through the engine's public API. No audio backend is
//! wired up here — playback runs against a `NullDriver`, so this binary
//! exercises the engine's control surface and format detection without
//! needing a sound card.

use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use djmm::engine::driver::{Driver, NullDriver};
use djmm::engine::DriverFactory;
use djmm::Engine;

use djmm::wad::Wad;

#[derive(Parser, Debug)]
struct Opt {
    /// Path to a DOOM or DOOM2 WAD
    wad: PathBuf,
}

const MUSIC_PREFIXES: &[&str] = &["D_", "MUS_"];

/// Accepts: RUNNIN, D_RUNNIN, E1M1, MUS_E1M1, etc.
fn find_song<'a>(names: &'a [String], input: &str) -> Option<&'a str> {
    let q = input.trim().to_ascii_uppercase();
    if q.is_empty() {
        return None;
    }
    if let Some(hit) = names.iter().find(|n| **n == q) {
        return Some(hit.as_str());
    }
    for p in MUSIC_PREFIXES {
        let cand = format!("{p}{q}");
        if let Some(hit) = names.iter().find(|n| **n == cand) {
            return Some(hit.as_str());
        }
    }
    None
}

fn null_driver_factory() -> DriverFactory {
    Arc::new(|| Box::new(NullDriver::new()) as Box<dyn Driver>)
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::parse();
    let mut wad = Wad::open(&opt.wad)?;
    let engine = Arc::new(Engine::new(null_driver_factory()));

    let music_lumps: Vec<_> = wad.iter_with_prefixes(MUSIC_PREFIXES).collect();
    println!("\nAvailable songs:");
    for l in &music_lumps {
        println!("  {} ({} bytes)", l.name, l.size);
    }
    let music_names: Vec<String> = music_lumps.iter().map(|l| l.name.clone()).collect();

    loop {
        print!("\n> Enter song (RUNNIN / E1M1), 'list' to show all, or empty to quit: ");
        stdout().flush().ok();

        let mut line = String::new();
        if stdin().read_line(&mut line).is_err() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        if line.eq_ignore_ascii_case("list") {
            println!("\nAvailable songs:");
            for name in &music_names {
                println!("  {name}");
            }
            continue;
        }

        let Some(candidate) = find_song(&music_names, line) else {
            println!("Not found. Suggestions:");
            let q = line.to_ascii_uppercase();
            for n in music_names.iter().filter(|n| n.contains(&q)).take(6) {
                println!("  {n}");
            }
            continue;
        };

        let bytes = match wad.read(candidate) {
            Ok(b) => b,
            Err(e) => {
                println!("Failed to read {candidate}: {e}");
                continue;
            }
        };
        println!("\nRead {candidate}: {} bytes", bytes.len());

        if bytes.starts_with(b"MUS\x1A") {
            println!("Format: MUS");
            let pb = match engine.open_mus_playback(&bytes) {
                Ok(pb) => pb,
                Err(e) => {
                    println!("MUS open failed: {e}");
                    continue;
                }
            };
            run_transport(&pb);
        } else if bytes.starts_with(b"MThd") {
            println!("Format: Standard MIDI");
            let pb = match engine.open_midi_playback(&bytes) {
                Ok(pb) => pb,
                Err(e) => {
                    println!("MIDI open failed: {e}");
                    continue;
                }
            };
            run_transport(&pb);
        } else {
            println!("Format: unknown");
        }
    }

    Ok(())
}

/// A trivial line-oriented transport shared by MIDI and MUS playback:
/// play, poll until it self-stops (the `NullDriver` completes every
/// buffer quickly, so this is mostly for demonstrating the control API).
fn run_transport<S: djmm::engine::Kind>(pb: &djmm::api::Playback<S>) {
    pb.set_looping(false).ok();
    if let Err(e) = pb.play() {
        println!("play failed: {e}");
        return;
    }
    println!("Playing. Waiting for it to finish...");
    while pb.is_playing() {
        thread::sleep(Duration::from_millis(20));
    }
    println!("Stopped.");
}
