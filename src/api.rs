//! The public control surface: one generic `Playback<S>` facade,
//! instantiated once per player kind, so MIDI/MUS/PCM callers share the
//! same method set per spec.md §6's "uniform control API" requirement.
//!
//! Every method here takes a cloned `Arc<Engine>`, not a raw registry
//! handle, because the registry alone can't start a worker thread or
//! hold the driver factory — the engine facade in [`crate::engine`] owns
//! both.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::engine::registry::Handle as RegistryHandle;
use crate::engine::source::{MidiSource, MusSource, PcmSource};
use crate::engine::{Engine, Kind};
use crate::error::Result;

/// A handle to one open player of kind `S`, bundling the engine it was
/// opened against with the opaque registry handle the engine issued.
pub struct Playback<S: Kind> {
    engine: Arc<Engine>,
    handle: RegistryHandle,
    _kind: PhantomData<S>,
}

impl<S: Kind> Playback<S> {
    fn open(engine: Arc<Engine>, bytes: &[u8]) -> Result<Self> {
        let handle = S::open(&engine, bytes)?;
        Ok(Playback {
            engine,
            handle,
            _kind: PhantomData,
        })
    }

    pub fn play(&self) -> Result<()> {
        S::get(&self.engine, self.handle)?.play()
    }

    pub fn stop(&self) -> Result<()> {
        S::get(&self.engine, self.handle)?.stop()
    }

    pub fn pause(&self) -> Result<()> {
        S::get(&self.engine, self.handle)?.pause()
    }

    pub fn resume(&self) -> Result<()> {
        S::get(&self.engine, self.handle)?.resume()
    }

    pub fn set_looping(&self, looping: bool) -> Result<()> {
        S::get(&self.engine, self.handle)?.set_looping(looping)
    }

    pub fn is_looping(&self) -> bool {
        S::get(&self.engine, self.handle)
            .map(|p| p.is_looping())
            .unwrap_or(false)
    }

    pub fn is_playing(&self) -> bool {
        S::get(&self.engine, self.handle)
            .map(|p| p.is_playing())
            .unwrap_or(false)
    }

    pub fn is_paused(&self) -> bool {
        S::get(&self.engine, self.handle)
            .map(|p| p.is_paused())
            .unwrap_or(false)
    }

    pub fn is_stopped(&self) -> bool {
        S::get(&self.engine, self.handle)
            .map(|p| p.is_stopped())
            .unwrap_or(false)
    }

    pub fn get_volume(&self) -> Result<(u16, u16)> {
        S::get(&self.engine, self.handle)?.get_volume()
    }

    pub fn set_volume_both(&self, left: u16, right: u16) -> Result<()> {
        S::get(&self.engine, self.handle)?.set_volume(left, right)
    }

    pub fn set_volume_left(&self, left: u16) -> Result<()> {
        S::get(&self.engine, self.handle)?.set_volume_left(left)
    }

    pub fn set_volume_right(&self, right: u16) -> Result<()> {
        S::get(&self.engine, self.handle)?.set_volume_right(right)
    }

    /// Tears the player down and deregisters it. Consumes `self`: a
    /// closed handle can't be reused, matching spec.md's "(destroyed)"
    /// post-state for `close`.
    pub fn close(self) {
        S::close(&self.engine, self.handle);
    }
}

pub type MidiPlayback = Playback<MidiSource>;
pub type MusPlayback = Playback<MusSource>;
pub type PcmPlayback = Playback<PcmSource>;

impl Engine {
    pub fn open_midi_playback(self: &Arc<Self>, bytes: &[u8]) -> Result<MidiPlayback> {
        Playback::open(self.clone(), bytes)
    }

    pub fn open_mus_playback(self: &Arc<Self>, bytes: &[u8]) -> Result<MusPlayback> {
        Playback::open(self.clone(), bytes)
    }

    pub fn open_pcm_playback(self: &Arc<Self>, bytes: &[u8]) -> Result<PcmPlayback> {
        Playback::open(self.clone(), bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::driver::{Driver, NullDriver};
    use crate::engine::DriverFactory;

    fn null_engine() -> Arc<Engine> {
        let factory: DriverFactory = Arc::new(|| Box::new(NullDriver::new()) as Box<dyn Driver>);
        Arc::new(Engine::new(factory))
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
    fn pcm_scenario_play_then_stop() {
        let engine = null_engine();
        let pb = engine.open_pcm_playback(&dmx(&[1, 2, 3, 4])).unwrap();
        assert!(pb.is_stopped());
        pb.play().unwrap();
        assert!(pb.is_playing());
        pb.stop().unwrap();
        assert!(pb.is_stopped());
        pb.close();
    }

    #[test]
    fn two_pcm_players_stop_one_close_both_leaves_registry_empty() {
        let engine = null_engine();
        let a = engine.open_pcm_playback(&dmx(&[1, 2, 3])).unwrap();
        let b = engine.open_pcm_playback(&dmx(&[4, 5, 6])).unwrap();
        a.play().unwrap();
        b.play().unwrap();
        a.stop().unwrap();
        assert!(a.is_stopped());
        assert!(b.is_playing());
        a.close();
        b.close();
        assert_eq!(engine.pcm_registry_len(), 0);
    }

    #[test]
    fn volume_round_trips_on_pcm() {
        let engine = null_engine();
        let pb = engine.open_pcm_playback(&dmx(&[1, 2])).unwrap();
        pb.set_volume_both(0x1234, 0x5678).unwrap();
        assert_eq!(pb.get_volume().unwrap(), (0x1234, 0x5678));
        pb.close();
    }
}
