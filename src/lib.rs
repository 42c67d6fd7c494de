//! A concurrent playback engine for DOS-era game audio: Standard MIDI
//! Files, id Software's MUS format, and DMX PCM sound effects, behind
//! one uniform control API and a pluggable output [`engine::driver::Driver`].
//!
//! The three format readers (`midi`, `mus`, `pcm`) only parse and decode;
//! all state, threading, and driver plumbing lives in [`engine`]. Most
//! callers want [`Engine`] and the [`api::Playback`] handles it returns.

pub mod api;
pub mod codec;
pub mod engine;
pub mod error;
pub mod event;
pub mod midi;
pub mod mus;
pub mod pcm;
pub mod wad;

pub use api::{MidiPlayback, MusPlayback, PcmPlayback};
pub use engine::{DriverFactory, Engine};
pub use error::{EngineError, Result, Status};
