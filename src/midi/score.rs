//! The MIDI `Score`: owns the raw file bytes and one cursor per track,
//! and implements the multi-track event selection rule that feeds the
//! packer.

use std::sync::Arc;

use crate::event::{pack, Record};
use crate::midi::cursor::TrackCursor;
use crate::midi::file::{locate_tracks, parse_header};
use crate::error::Result;

/// An open MIDI score, ready to be driven by a player's worker.
pub struct Score {
    raw: Arc<[u8]>,
    pub timebase: u16,
    tracks: Vec<TrackCursor>,
    /// Absolute tick of the last *emitted* record, used to compute the
    /// next record's delta. Deliberately distinct from any one track's
    /// `abs_tick`: skipped events (non-tempo meta, SysEx) advance their
    /// track's cursor without advancing this, so their elapsed ticks fold
    /// into the next emitted record's delta instead of being lost.
    current_tick: u64,
}

impl Score {
    /// Parses and validates `bytes`, returning an open [`Score`]. This is
    /// the `open` format-validation boundary: malformed input never
    /// allocates a player.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let (header, track_offset) = parse_header(bytes)?;
        let spans = locate_tracks(bytes, track_offset, header.num_tracks)?;
        let tracks = spans.into_iter().map(TrackCursor::new).collect();
        Ok(Score {
            raw: Arc::from(bytes.to_vec().into_boxed_slice()),
            timebase: header.timebase,
            tracks,
            current_tick: 0,
        })
    }

    /// Rewinds every track cursor to just past its `MTrk` header and
    /// zeroes all absolute ticks, satisfying the Score invariant.
    pub fn rewind(&mut self) {
        for t in &mut self.tracks {
            t.rewind();
        }
        self.current_tick = 0;
    }

    /// Produces the next emittable [`Record`], implementing the
    /// multi-track selection rule: among tracks not yet at end-of-track,
    /// pick the one whose next event has the smallest absolute tick,
    /// commit only that track's cursor, and repeat until an emittable
    /// event is found or every track has ended.
    pub fn next_record(&mut self) -> Option<Record> {
        loop {
            let mut best: Option<(usize, u64)> = None;
            for i in 0..self.tracks.len() {
                if self.tracks[i].ended {
                    continue;
                }
                let step = self.tracks[i].peek(&self.raw);
                if step.is_end {
                    self.tracks[i].commit(&step);
                    continue;
                }
                if best.map_or(true, |(_, tick)| step.next_abs_tick < tick) {
                    best = Some((i, step.next_abs_tick));
                }
            }
            let (idx, _) = best?;
            let step = self.tracks[idx].peek(&self.raw);
            self.tracks[idx].commit(&step);

            if let Some(event) = step.emit {
                let delta = (step.next_abs_tick - self.current_tick) as u32;
                self.current_tick = step.next_abs_tick;
                return Some(pack(event, delta));
            }
            // Skippable event (non-tempo meta, SysEx): loop and select again.
        }
    }

    /// True once every track has reached end-of-track.
    pub fn is_exhausted(&self) -> bool {
        self.tracks.iter().all(|t| t.ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &[u8] = &[
        b'M', b'T', b'h', b'd', 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x01, 0x00, 0x60, b'M',
        b'T', b'r', b'k', 0x00, 0x00, 0x00, 0x04, 0x00, 0xFF, 0x2F, 0x00,
    ];

    #[test]
    fn empty_track_emits_nothing() {
        let mut score = Score::open(EMPTY).unwrap();
        assert_eq!(score.next_record(), None);
        assert!(score.is_exhausted());
    }

    fn note_on_off_midi() -> Vec<u8> {
        // One track: Note On ch0 (60,64) at tick 0, Note Off ch0 (60,0) at tick 96, EOT.
        let mut track = Vec::new();
        track.extend_from_slice(&[0x00, 0x90, 60, 64]);
        track.extend_from_slice(&[0x60, 0x80, 60, 0]); // delta 96 = 0x60
        track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
        let mut bytes = vec![b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96];
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&track);
        bytes
    }

    #[test]
    fn emits_note_on_and_off_with_correct_deltas() {
        let bytes = note_on_off_midi();
        let mut score = Score::open(&bytes).unwrap();

        let r1 = score.next_record().unwrap();
        assert_eq!(r1.delta_ticks, 0);
        assert_eq!(r1.stream_id, 0);

        let r2 = score.next_record().unwrap();
        assert_eq!(r2.delta_ticks, 96);

        assert_eq!(score.next_record(), None);
        assert!(score.is_exhausted());
    }

    #[test]
    fn sum_of_emitted_deltas_equals_max_tick() {
        let bytes = note_on_off_midi();
        let mut score = Score::open(&bytes).unwrap();
        let mut total: u64 = 0;
        while let Some(r) = score.next_record() {
            total += r.delta_ticks as u64;
        }
        assert_eq!(total, 96);
    }

    #[test]
    fn rewind_restarts_from_tick_zero() {
        let bytes = note_on_off_midi();
        let mut score = Score::open(&bytes).unwrap();
        while score.next_record().is_some() {}
        score.rewind();
        let r1 = score.next_record().unwrap();
        assert_eq!(r1.delta_ticks, 0);
    }
}
