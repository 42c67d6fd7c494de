//! MUS → MIDI event transcoder.
//!
//! MUS is id Software's compact MIDI-like format used for DOOM's music
//! lumps. This module validates the header, then decodes the event
//! stream directly into the engine's own [`Event`] / [`Record`] wire
//! format — it does not go through an intermediate MIDI file
//! representation.

use std::sync::Arc;

use crate::codec::read_var_long;
use crate::error::{EngineError, Result};
use crate::event::{pack, Event, Record, META_END_OF_TRACK};

/// MUS's event stream runs at a fixed resolution, independent of any
/// file-declared timebase.
pub const MUS_PPQN: u16 = 70;

const DRUM_MUS_CHANNEL: u8 = 15;
const DRUM_MIDI_CHANNEL: u8 = 9;

fn map_controller(c: u8) -> Option<u8> {
    Some(match c {
        1 => 0,    // bank select
        2 => 1,    // modulation
        3 => 7,    // volume
        4 => 10,   // pan
        5 => 11,   // expression
        6 => 91,   // reverb
        7 => 93,   // chorus
        8 => 64,   // sustain
        9 => 67,   // soft pedal
        10 => 120, // all sounds off
        11 => 123, // all notes off
        _ => return None,
    })
}

struct Header {
    score_len: usize,
    score_start: usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < 16 || &bytes[0..4] != b"MUS\x1A" {
        log::warn!("MUS open rejected: missing MUS magic");
        return Err(EngineError::Malformed("missing MUS magic".into()));
    }
    let score_len = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
    let score_start = u16::from_le_bytes([bytes[6], bytes[7]]) as usize;
    let end = score_start
        .checked_add(score_len)
        .ok_or_else(|| EngineError::Malformed("MUS score range overflow".into()))?;
    if end != bytes.len() {
        log::warn!(
            "MUS open rejected: score_start + score_len ({end}) != file length ({})",
            bytes.len()
        );
        return Err(EngineError::Malformed(format!(
            "score_start + score_len ({end}) != file length ({})",
            bytes.len()
        )));
    }
    Ok(Header { score_len, score_start })
}

/// Walks the event stream once, purely for structural validation: rejects
/// reserved commands 5/7 and truncated events. This runs at `open` so
/// malformed MUS scores never reach the player/registry, per spec.
fn prevalidate(stream: &[u8]) -> Result<()> {
    let mut i = 0usize;
    while i < stream.len() {
        let ev = stream[i];
        i += 1;
        let has_delta = ev & 0x80 != 0;
        let ty = (ev >> 4) & 0x07;
        match ty {
            0 => {
                take(stream, &mut i, 1)?;
            }
            1 => {
                let key = *stream.get(i).ok_or_else(truncated)?;
                i += 1;
                if key & 0x80 != 0 {
                    take(stream, &mut i, 1)?;
                }
            }
            2 => {
                take(stream, &mut i, 1)?;
            }
            3 => {
                take(stream, &mut i, 1)?;
            }
            4 => {
                take(stream, &mut i, 2)?;
            }
            6 => return Ok(()),
            5 | 7 => {
                log::warn!("MUS open rejected: reserved command {ty}");
                return Err(EngineError::Malformed(format!("reserved MUS command {ty}")));
            }
            _ => unreachable!("ty is masked to 3 bits"),
        }
        if has_delta {
            let (_, used) = read_var_long(&stream[i.min(stream.len())..]);
            i += used.max(1);
        }
    }
    Ok(())
}

fn truncated() -> EngineError {
    EngineError::Malformed("MUS event stream truncated".into())
}

fn take(stream: &[u8], i: &mut usize, n: usize) -> Result<()> {
    if *i + n > stream.len() {
        return Err(truncated());
    }
    *i += n;
    Ok(())
}

/// An open MUS score, mid-transcoding state included.
pub struct Score {
    stream: Arc<[u8]>,
    pos: usize,
    pending_delta: u32,
    channel_map: [Option<u8>; 16],
    next_free_channel: u8,
    last_velocity: [u8; 16],
    ended: bool,
}

const DEFAULT_VELOCITY: u8 = 127;

impl Score {
    /// Validates the MUS header and event stream, then returns an open
    /// score ready to be driven by a player's worker.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let header = parse_header(bytes)?;
        let stream = &bytes[header.score_start..header.score_start + header.score_len];
        prevalidate(stream)?;
        Ok(Score {
            stream: Arc::from(stream.to_vec().into_boxed_slice()),
            pos: 0,
            pending_delta: 0,
            channel_map: [None; 16],
            next_free_channel: 0,
            last_velocity: [DEFAULT_VELOCITY; 16],
            ended: false,
        })
    }

    /// Rewinds to the first event and clears pending timing state. The
    /// channel map is retained across loops, as in the original: it's a
    /// property of the score's channel usage, not of one play-through.
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.pending_delta = 0;
        self.ended = false;
    }

    pub fn is_exhausted(&self) -> bool {
        self.ended
    }

    /// Maps a MUS channel (0-15) to a MIDI channel, assigning the first
    /// unused MIDI channel (skipping 9, reserved for drums) on first
    /// appearance. Returns `None` once all 15 non-drum channels are
    /// exhausted; callers drop events on overflow channels rather than
    /// reproduce the original's unchecked overrun.
    fn map_channel(&mut self, mus_channel: u8) -> Option<u8> {
        if mus_channel == DRUM_MUS_CHANNEL {
            return Some(DRUM_MIDI_CHANNEL);
        }
        if let Some(assigned) = self.channel_map[mus_channel as usize] {
            return Some(assigned);
        }
        while self.next_free_channel == DRUM_MIDI_CHANNEL {
            self.next_free_channel += 1;
        }
        if self.next_free_channel > 15 {
            return None;
        }
        let assigned = self.next_free_channel;
        self.channel_map[mus_channel as usize] = Some(assigned);
        self.next_free_channel += 1;
        Some(assigned)
    }

    /// Decodes and emits the next event, or `None` once the score-end
    /// command or the end of the stream is reached.
    pub fn next_record(&mut self) -> Option<Record> {
        loop {
            if self.ended || self.pos >= self.stream.len() {
                self.ended = true;
                return None;
            }
            let delta = self.pending_delta;
            self.pending_delta = 0;

            let ev = self.stream[self.pos];
            self.pos += 1;
            let has_delta = ev & 0x80 != 0;
            let ty = (ev >> 4) & 0x07;
            let mus_channel = ev & 0x0F;

            let emit = match ty {
                0 => {
                    // Release note.
                    let key = self.read_u8()?;
                    self.map_channel(mus_channel).map(|ch| Event::Channel {
                        status: 0x80,
                        channel: ch,
                        data1: key,
                        data2: Some(0),
                    })
                }
                1 => {
                    // Play note, optionally with an attached velocity byte.
                    let mut key = self.read_u8()?;
                    let mut velocity = self.last_velocity[mus_channel as usize];
                    if key & 0x80 != 0 {
                        key &= 0x7F;
                        velocity = self.read_u8()?;
                        self.last_velocity[mus_channel as usize] = velocity;
                    }
                    self.map_channel(mus_channel).map(|ch| Event::Channel {
                        status: 0x90,
                        channel: ch,
                        data1: key,
                        data2: Some(velocity),
                    })
                }
                2 => {
                    // Pitch wheel: one byte 0..127, scaled by 64.
                    let v = self.read_u8()? as u32;
                    let bend14 = v * 64;
                    self.map_channel(mus_channel).map(|ch| Event::Channel {
                        status: 0xE0,
                        channel: ch,
                        data1: (bend14 & 0x7F) as u8,
                        data2: Some(((bend14 >> 7) & 0x7F) as u8),
                    })
                }
                3 => {
                    // System/controller with implicit value 0.
                    let ctrl = self.read_u8()?;
                    map_controller(ctrl).and_then(|cc| {
                        self.map_channel(mus_channel).map(|ch| Event::Channel {
                            status: 0xB0,
                            channel: ch,
                            data1: cc,
                            data2: Some(0),
                        })
                    })
                }
                4 => {
                    // Controller with explicit value.
                    let ctrl = self.read_u8()?;
                    let value = self.read_u8()?;
                    if ctrl == 0 {
                        self.map_channel(mus_channel).map(|ch| Event::Channel {
                            status: 0xC0,
                            channel: ch,
                            data1: value,
                            data2: None,
                        })
                    } else {
                        map_controller(ctrl).and_then(|cc| {
                            self.map_channel(mus_channel).map(|ch| Event::Channel {
                                status: 0xB0,
                                channel: ch,
                                data1: cc,
                                data2: Some(value),
                            })
                        })
                    }
                }
                6 => {
                    // Score end: emit the end-of-track meta so callers see
                    // it as a record, not a silent drop.
                    self.ended = true;
                    Some(Event::Meta { meta_type: META_END_OF_TRACK })
                }
                _ => None, // 5, 7 rejected at open(); unreachable here
            };

            if has_delta {
                let (d, used) = read_var_long(&self.stream[self.pos.min(self.stream.len())..]);
                self.pos += used.max(1);
                self.pending_delta = d;
            }

            if let Some(event) = emit {
                return Some(pack(event, delta));
            }
            if self.ended {
                return None;
            }
            // Dropped (overflow channel) or unmapped controller: keep scanning.
        }
    }

    fn read_u8(&mut self) -> Option<u8> {
        let b = *self.stream.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(stream: &[u8]) -> Vec<u8> {
        let mut bytes = vec![b'M', b'U', b'S', 0x1A];
        bytes.extend_from_slice(&(stream.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes()); // score_start
        bytes.extend_from_slice(&1u16.to_le_bytes()); // primary channels
        bytes.extend_from_slice(&0u16.to_le_bytes()); // secondary channels
        bytes.extend_from_slice(&0u16.to_le_bytes()); // instrument count
        bytes.extend_from_slice(&0u16.to_le_bytes()); // reserved
        bytes.extend_from_slice(stream);
        bytes
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = build(&[0x60]);
        bytes[0] = b'X';
        assert!(Score::open(&bytes).is_err());
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut bytes = build(&[0x60]);
        bytes.push(0xAA); // extra trailing byte breaks score_start+score_len==len
        assert!(Score::open(&bytes).is_err());
    }

    #[test]
    fn rejects_reserved_commands() {
        for ty in [5u8, 7u8] {
            let ev = (ty << 4) | 0x00;
            let bytes = build(&[ev, 0x00]);
            assert!(Score::open(&bytes).is_err());
        }
    }

    #[test]
    fn scenario_play_note_then_end() {
        // channel 0, Play, last=1, note 60 with velocity bit set, velocity 64, VLQ delta 0, then score-end.
        let stream = [0x91, 60 | 0x80, 64, 0x00, 0x60];
        let bytes = build(&stream);
        let mut score = Score::open(&bytes).unwrap();
        let rec = score.next_record().unwrap();
        assert_eq!(rec.delta_ticks, 0);
        assert_eq!(rec.packed_event >> 24, crate::event::SHORT_MSG as u32);
        let payload = rec.packed_event & 0x00FF_FFFF;
        assert_eq!(payload & 0xFF, 0x90); // NoteOn, channel 0
        assert_eq!((payload >> 8) & 0xFF, 60);
        assert_eq!((payload >> 16) & 0xFF, 64);

        let eot = score.next_record().unwrap();
        assert_eq!(eot.packed_event >> 24, crate::event::META as u32);
        assert_eq!(eot.packed_event & 0x00FF_FFFF, crate::event::META_END_OF_TRACK as u32);

        assert_eq!(score.next_record(), None);
        assert!(score.is_exhausted());
    }

    #[test]
    fn cached_velocity_reused_on_next_note_without_attached_velocity() {
        // First note has velocity attached (100), second omits it.
        let stream = [
            0x10, 60 | 0x80, 100, // play w/ velocity, no delta flag
            0x10, 61, // play note, no velocity attached
        ];
        let bytes = build(&stream);
        let mut score = Score::open(&bytes).unwrap();
        let r1 = score.next_record().unwrap();
        let r2 = score.next_record().unwrap();
        let vel1 = ((r1.packed_event & 0x00FF_FFFF) >> 16) & 0xFF;
        let vel2 = ((r2.packed_event & 0x00FF_FFFF) >> 16) & 0xFF;
        assert_eq!(vel1, 100);
        assert_eq!(vel2, 100);
    }

    #[test]
    fn drum_channel_always_maps_to_nine_and_nothing_else_does() {
        let stream = [0x1F, 60 | 0x80, 100, 0x60, 0x00]; // mus channel 15
        let bytes = build(&stream);
        let mut score = Score::open(&bytes).unwrap();
        let r = score.next_record().unwrap();
        let status_byte = r.packed_event & 0xFF;
        assert_eq!(status_byte & 0x0F, 9);
    }
}
