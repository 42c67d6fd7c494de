//! Multi-module scenarios that need the registry, the worker, and a
//! driver double wired together, not exercisable from a single module's
//! `#[cfg(test)]` block.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use djmm::engine::driver::{Driver, NullDriver};
use djmm::engine::DriverFactory;
use djmm::Engine;

fn null_factory() -> DriverFactory {
    Arc::new(|| Box::new(NullDriver::new()) as Box<dyn Driver>)
}

fn dmx(samples: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&3u16.to_le_bytes());
    bytes.extend_from_slice(&11025u16.to_le_bytes());
    bytes.extend_from_slice(&((samples.len() + 32) as u32).to_le_bytes());
    bytes.extend_from_slice(&[0u8; 16]);
    bytes.extend_from_slice(samples);
    bytes.extend_from_slice(&[0u8; 16]);
    bytes
}

fn note_on_off_midi() -> Vec<u8> {
    let mut track = Vec::new();
    track.extend_from_slice(&[0x00, 0x90, 60, 64]);
    track.extend_from_slice(&[0x60, 0x80, 60, 0]);
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    let mut bytes = vec![b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96];
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&track);
    bytes
}

/// Two PCM players open concurrently; stop one, close both, and the
/// other keeps playing in the interim. The registry ends up empty.
#[test]
fn two_pcm_players_independent_lifecycle() {
    let engine = Arc::new(Engine::new(null_factory()));
    let a = engine.open_pcm_playback(&dmx(&vec![7u8; 4096])).unwrap();
    let b = engine.open_pcm_playback(&dmx(&vec![9u8; 4096])).unwrap();

    a.play().unwrap();
    b.play().unwrap();
    assert!(a.is_playing());
    assert!(b.is_playing());

    a.stop().unwrap();
    assert!(a.is_stopped());
    assert!(b.is_playing());

    a.close();
    b.close();

    assert_eq!(engine.pcm_registry_len(), 0);
}

#[test]
fn midi_player_runs_to_completion_and_self_stops() {
    let engine = Arc::new(Engine::new(null_factory()));
    let pb = engine.open_midi_playback(&note_on_off_midi()).unwrap();
    pb.play().unwrap();

    let mut waited = Duration::ZERO;
    while pb.is_playing() && waited < Duration::from_secs(2) {
        thread::sleep(Duration::from_millis(5));
        waited += Duration::from_millis(5);
    }
    assert!(pb.is_stopped(), "player did not reach STOPPED in time");
    pb.close();
}

#[test]
fn looping_pcm_player_keeps_playing_past_one_pass() {
    let engine = Arc::new(Engine::new(null_factory()));
    let pb = engine.open_pcm_playback(&dmx(&[1, 2, 3, 4])).unwrap();
    pb.set_looping(true).unwrap();
    pb.play().unwrap();

    thread::sleep(Duration::from_millis(50));
    assert!(pb.is_playing(), "a looping player must not self-stop");

    pb.stop().unwrap();
    assert!(pb.is_stopped());
    pb.close();
}

#[test]
fn pause_then_resume_returns_to_playing() {
    let engine = Arc::new(Engine::new(null_factory()));
    let pb = engine.open_pcm_playback(&dmx(&vec![3u8; 8192])).unwrap();
    pb.play().unwrap();
    assert!(pb.is_playing());

    pb.pause().unwrap();
    assert!(pb.is_paused());

    pb.resume().unwrap();
    assert!(pb.is_playing());

    pb.stop().unwrap();
    pb.close();
}

#[test]
fn closing_an_already_stopped_player_is_safe() {
    let engine = Arc::new(Engine::new(null_factory()));
    let pb = engine.open_pcm_playback(&dmx(&[1, 2])).unwrap();
    assert!(pb.is_stopped());
    pb.close();
    assert_eq!(engine.pcm_registry_len(), 0);
}

#[test]
fn malformed_input_never_registers_a_handle() {
    let engine = Arc::new(Engine::new(null_factory()));
    let mut bad_midi = note_on_off_midi();
    bad_midi[0] = b'X'; // corrupt MThd magic
    assert!(engine.open_midi_playback(&bad_midi).is_err());
    assert_eq!(engine.midi_registry_len(), 0);
}
