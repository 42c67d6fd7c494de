//! Adapts the three format readers (MIDI `Score`, MUS `Score`, PCM
//! `Sample`) to one interface the worker repacks buffers through,
//! collapsing what would otherwise be three near-identical worker loops
//! into one generic over `Refillable`.

use crate::event::RECORD_SIZE;
use crate::midi;
use crate::mus;
use crate::pcm;

/// Something a player's worker can repeatedly refill a driver buffer
/// from. `refill` never blocks and never fails — exhaustion is signaled
/// by returning fewer bytes than `capacity`, down to zero.
pub trait Refillable: Send {
    /// Fills up to `capacity` bytes starting at the current position,
    /// advancing it. An empty or short return means the source has
    /// reached its end for this pass.
    fn refill(&mut self, capacity: usize) -> Vec<u8>;

    /// Restarts from the beginning, for looping playback.
    fn rewind(&mut self);

    fn is_exhausted(&self) -> bool;

    /// The buffer capacity this source's player opens its driver stream
    /// with (48 KiB for MIDI, 12 KiB for MUS, caller-chosen for PCM).
    fn buffer_capacity(&self) -> usize;

    /// The timebase the priming sequence passes to `Driver::set_timebase`
    /// (MIDI: the file's own PPQN; MUS: fixed 70; PCM: unused, 0).
    fn timebase(&self) -> u16;

    /// Applies a per-stream volume, returning `true` if this source owns
    /// one. PCM sources do; MIDI/MUS return `false` so the caller falls
    /// through to the driver's shared global volume instead.
    fn set_volume(&mut self, _left: u16, _right: u16) -> bool {
        false
    }

    /// The per-stream volume, if this source owns one.
    fn get_volume(&self) -> Option<(u16, u16)> {
        None
    }
}

pub const MIDI_BUFFER_CAPACITY: usize = 48 * 1024;
pub const MUS_BUFFER_CAPACITY: usize = 12 * 1024;

pub struct MidiSource {
    score: midi::Score,
}

impl MidiSource {
    pub fn open(bytes: &[u8]) -> crate::error::Result<Self> {
        Ok(MidiSource {
            score: midi::Score::open(bytes)?,
        })
    }
}

impl Refillable for MidiSource {
    fn refill(&mut self, capacity: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(capacity);
        while out.len() + RECORD_SIZE <= capacity {
            match self.score.next_record() {
                Some(rec) => out.extend_from_slice(&rec.to_bytes()),
                None => break,
            }
        }
        out
    }

    fn rewind(&mut self) {
        self.score.rewind();
    }

    fn is_exhausted(&self) -> bool {
        self.score.is_exhausted()
    }

    fn buffer_capacity(&self) -> usize {
        MIDI_BUFFER_CAPACITY
    }

    fn timebase(&self) -> u16 {
        self.score.timebase
    }
}

pub struct MusSource {
    score: mus::Score,
}

impl MusSource {
    pub fn open(bytes: &[u8]) -> crate::error::Result<Self> {
        Ok(MusSource {
            score: mus::Score::open(bytes)?,
        })
    }
}

impl Refillable for MusSource {
    fn refill(&mut self, capacity: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(capacity);
        while out.len() + RECORD_SIZE <= capacity {
            match self.score.next_record() {
                Some(rec) => out.extend_from_slice(&rec.to_bytes()),
                None => break,
            }
        }
        out
    }

    fn rewind(&mut self) {
        self.score.rewind();
    }

    fn is_exhausted(&self) -> bool {
        self.score.is_exhausted()
    }

    fn buffer_capacity(&self) -> usize {
        MUS_BUFFER_CAPACITY
    }

    fn timebase(&self) -> u16 {
        mus::MUS_PPQN
    }
}

/// Mono 8-bit sample data, block-aligned and volume-scaled as it is
/// drawn into each buffer. Frame size is always 1 (8-bit unsigned mono).
pub struct PcmSource {
    sample: pcm::Sample,
    volume: pcm::Volume,
}

impl PcmSource {
    pub fn open(bytes: &[u8]) -> crate::error::Result<Self> {
        Ok(PcmSource {
            sample: pcm::Sample::open(bytes)?,
            volume: pcm::Volume::default(),
        })
    }

    pub fn volume(&self) -> pcm::Volume {
        self.volume
    }
}

impl Refillable for PcmSource {
    fn refill(&mut self, capacity: usize) -> Vec<u8> {
        let aligned = pcm::block_align(capacity, 1);
        let mut chunk = self.sample.chunk(aligned);
        pcm::scale_8bit(&mut chunk, self.volume, 1);
        chunk
    }

    fn rewind(&mut self) {
        self.sample.rewind();
    }

    fn is_exhausted(&self) -> bool {
        self.sample.is_exhausted()
    }

    fn buffer_capacity(&self) -> usize {
        4096
    }

    fn timebase(&self) -> u16 {
        0
    }

    fn set_volume(&mut self, left: u16, right: u16) -> bool {
        self.volume = pcm::Volume { left, right };
        true
    }

    fn get_volume(&self) -> Option<(u16, u16)> {
        Some((self.volume.left, self.volume.right))
    }
}
