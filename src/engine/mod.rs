//! The playback engine: three independent registries (MIDI, MUS, PCM),
//! each holding `Arc<Player<_>>` values reachable only through an opaque
//! [`registry::Handle`].
//!
//! Replaces the original's module-level `players`/`players_mutex`
//! statics (one pair shared by every caller in the process) with an
//! `Engine` value the caller owns, per spec.md §9's "mutable global
//! registry → per-Engine registry" design note.

pub mod buffer;
pub mod driver;
pub mod player;
pub mod pool;
pub mod registry;
pub mod source;
pub mod state;
mod worker;

use std::sync::Arc;

use crate::error::{EngineError, Result};
use driver::Driver;
use player::{NotifyCallback, Player};
use registry::{Handle, Registry};
use source::{MidiSource, MusSource, PcmSource};

/// A factory for the `Driver` each newly opened player binds to. In
/// production this closes over a real backend; tests and the demo
/// binary use one that builds `NullDriver`s.
pub type DriverFactory = Arc<dyn Fn() -> Box<dyn Driver> + Send + Sync>;

pub struct Engine {
    midi: Registry<Player<MidiSource>>,
    mus: Registry<Player<MusSource>>,
    pcm: Registry<Player<PcmSource>>,
    pcm_pool: std::sync::Mutex<pool::Pool>,
    driver_factory: DriverFactory,
}

const DEFAULT_PCM_POOL_CAPACITY: usize = 16;

impl Engine {
    pub fn new(driver_factory: DriverFactory) -> Self {
        Engine {
            midi: Registry::new(),
            mus: Registry::new(),
            pcm: Registry::new(),
            pcm_pool: std::sync::Mutex::new(pool::Pool::new(DEFAULT_PCM_POOL_CAPACITY)),
            driver_factory,
        }
    }

    pub fn open_midi(&self, bytes: &[u8]) -> Result<Handle> {
        let source = MidiSource::open(bytes)?;
        let player = Player::spawn(source, (self.driver_factory)(), None);
        Ok(self.midi.insert(player))
    }

    pub fn open_mus(&self, bytes: &[u8]) -> Result<Handle> {
        let source = MusSource::open(bytes)?;
        let player = Player::spawn(source, (self.driver_factory)(), None);
        Ok(self.mus.insert(player))
    }

    pub fn open_pcm(&self, bytes: &[u8]) -> Result<Handle> {
        let source = PcmSource::open(bytes)?;
        let player = {
            let mut pool = self.pcm_pool.lock()?;
            match pool.take() {
                Some(p) => {
                    p.reattach_source(source)?;
                    p
                }
                None => pool.make_fresh(source, (self.driver_factory)(), None as Option<NotifyCallback>),
            }
        };
        Ok(self.pcm.insert(player))
    }

    pub fn close_midi(&self, h: Handle) {
        if let Some(p) = self.midi.remove(h) {
            p.close();
        }
    }

    pub fn close_mus(&self, h: Handle) {
        if let Some(p) = self.mus.remove(h) {
            p.close();
        }
    }

    /// Closing a PCM player drives it to STOPPED and returns the shell
    /// to the pool instead of tearing its worker down, unless the pool
    /// is already full.
    pub fn close_pcm(&self, h: Handle) {
        if let Some(p) = self.pcm.remove(h) {
            if p.stop().is_ok() {
                if let Ok(mut pool) = self.pcm_pool.lock() {
                    pool.release(p);
                    return;
                }
            }
            p.close();
        }
    }

    pub fn midi(&self, h: Handle) -> Result<Arc<Player<MidiSource>>> {
        self.midi.get(h).ok_or(EngineError::InvalidHandle)
    }

    pub fn mus(&self, h: Handle) -> Result<Arc<Player<MusSource>>> {
        self.mus.get(h).ok_or(EngineError::InvalidHandle)
    }

    pub fn pcm(&self, h: Handle) -> Result<Arc<Player<PcmSource>>> {
        self.pcm.get(h).ok_or(EngineError::InvalidHandle)
    }

    pub fn midi_registry_len(&self) -> usize {
        self.midi.len()
    }
    pub fn mus_registry_len(&self) -> usize {
        self.mus.len()
    }
    pub fn pcm_registry_len(&self) -> usize {
        self.pcm.len()
    }
}

/// Ties a source type to the `Engine` registry and close routine that
/// handle it, so `api::Playback<S>` can be written once and used for
/// all three player kinds instead of three near-identical facades.
pub trait Kind: source::Refillable + Sized + 'static {
    fn open(engine: &Engine, bytes: &[u8]) -> Result<Handle>;
    fn get(engine: &Engine, h: Handle) -> Result<Arc<Player<Self>>>;
    fn close(engine: &Engine, h: Handle);
}

impl Kind for MidiSource {
    fn open(engine: &Engine, bytes: &[u8]) -> Result<Handle> {
        engine.open_midi(bytes)
    }
    fn get(engine: &Engine, h: Handle) -> Result<Arc<Player<Self>>> {
        engine.midi(h)
    }
    fn close(engine: &Engine, h: Handle) {
        engine.close_midi(h)
    }
}

impl Kind for MusSource {
    fn open(engine: &Engine, bytes: &[u8]) -> Result<Handle> {
        engine.open_mus(bytes)
    }
    fn get(engine: &Engine, h: Handle) -> Result<Arc<Player<Self>>> {
        engine.mus(h)
    }
    fn close(engine: &Engine, h: Handle) {
        engine.close_mus(h)
    }
}

impl Kind for PcmSource {
    fn open(engine: &Engine, bytes: &[u8]) -> Result<Handle> {
        engine.open_pcm(bytes)
    }
    fn get(engine: &Engine, h: Handle) -> Result<Arc<Player<Self>>> {
        engine.pcm(h)
    }
    fn close(engine: &Engine, h: Handle) {
        engine.close_pcm(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driver::NullDriver;

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

    #[test]
    fn open_close_pcm_round_trips_through_registry() {
        let engine = Engine::new(null_factory());
        let h = engine.open_pcm(&dmx(&[1, 2, 3, 4])).unwrap();
        assert!(engine.pcm(h).is_ok());
        engine.close_pcm(h);
        assert!(engine.pcm(h).is_err());
    }

    #[test]
    fn invalid_handle_is_invalid_param() {
        let engine = Engine::new(null_factory());
        let h = engine.open_pcm(&dmx(&[1, 2])).unwrap();
        engine.close_pcm(h);
        match engine.pcm(h) {
            Err(EngineError::InvalidHandle) => {}
            other => panic!("expected InvalidHandle, got {other:?}"),
        }
    }

    #[test]
    fn malformed_pcm_header_fails_open_without_registering() {
        let engine = Engine::new(null_factory());
        let mut bytes = dmx(&[1, 2]);
        bytes[0] = 9; // not format 3
        assert!(engine.open_pcm(&bytes).is_err());
    }

    #[test]
    fn closed_pcm_player_is_recycled_through_the_pool() {
        let engine = Engine::new(null_factory());
        let h1 = engine.open_pcm(&dmx(&[1, 2, 3])).unwrap();
        engine.close_pcm(h1);
        assert_eq!(engine.pcm_pool.lock().unwrap().len(), 1);
        let h2 = engine.open_pcm(&dmx(&[4, 5])).unwrap();
        assert_eq!(engine.pcm_pool.lock().unwrap().len(), 0);
        engine.close_pcm(h2);
    }
}
