//! Per-track event decoding.
//!
//! A [`TrackCursor`] decodes one raw MIDI event at a time from a track's
//! byte span, carrying running status and absolute tick as cursor state
//! rather than as aliased pointer arithmetic (per the "pointer-into-buffer
//! cursors" design note).

use crate::codec::read_var_long;
use crate::event::{data_bytes_for_status, Event};
use crate::midi::file::TrackSpan;

/// The outcome of decoding one event from a track, without committing it.
/// [`TrackCursor::peek`] is pure; [`TrackCursor::commit`] applies it.
#[derive(Debug, Clone)]
pub struct CursorStep {
    pub next_pos: usize,
    pub next_abs_tick: u64,
    pub next_last_status: u8,
    pub emit: Option<Event>,
    pub is_end: bool,
}

/// Tracks one `MTrk` chunk's read position, absolute tick, and running
/// status byte.
#[derive(Debug, Clone)]
pub struct TrackCursor {
    span: TrackSpan,
    pos: usize,
    pub abs_tick: u64,
    last_status: u8,
    pub ended: bool,
}

impl TrackCursor {
    pub fn new(span: TrackSpan) -> Self {
        TrackCursor {
            span,
            pos: span.start,
            abs_tick: 0,
            last_status: 0,
            ended: false,
        }
    }

    /// Resets this cursor to just past the `MTrk` header, per the Score
    /// invariant that `rewind` zeroes every track's absolute tick.
    pub fn rewind(&mut self) {
        self.pos = self.span.start;
        self.abs_tick = 0;
        self.last_status = 0;
        self.ended = false;
    }

    /// Decodes the event at the current position without mutating cursor
    /// state, so the multi-track selection rule can compare candidate
    /// ticks across tracks before committing to one.
    pub fn peek(&self, bytes: &[u8]) -> CursorStep {
        let mut pos = self.pos;
        if pos >= self.span.end {
            return CursorStep {
                next_pos: pos,
                next_abs_tick: self.abs_tick,
                next_last_status: self.last_status,
                emit: None,
                is_end: true,
            };
        }

        let (delta, used) = read_var_long(&bytes[pos..self.span.end]);
        pos += used;
        let abs_tick = self.abs_tick + delta as u64;

        if pos >= self.span.end {
            return CursorStep {
                next_pos: pos,
                next_abs_tick: abs_tick,
                next_last_status: self.last_status,
                emit: None,
                is_end: true,
            };
        }

        let byte = bytes[pos];

        if byte == 0xFF {
            // Meta event: type, VLQ length, payload.
            pos += 1;
            if pos >= self.span.end {
                return end_step(pos, abs_tick, self.last_status);
            }
            let meta_type = bytes[pos];
            pos += 1;
            let (len, used) = read_var_long(&bytes[pos..self.span.end]);
            pos += used;
            let len = len as usize;
            if pos + len > self.span.end {
                return end_step(pos, abs_tick, self.last_status);
            }
            let payload = &bytes[pos..pos + len];
            pos += len;

            if meta_type == 0x2F {
                return CursorStep {
                    next_pos: pos,
                    next_abs_tick: abs_tick,
                    next_last_status: self.last_status,
                    emit: None,
                    is_end: true,
                };
            }
            let emit = if meta_type == 0x51 && len == 3 {
                let micros = ((payload[0] as u32) << 16) | ((payload[1] as u32) << 8) | payload[2] as u32;
                Some(Event::Tempo { micros_per_qn: micros })
            } else {
                None
            };
            return CursorStep {
                next_pos: pos,
                next_abs_tick: abs_tick,
                next_last_status: self.last_status,
                emit,
                is_end: false,
            };
        }

        if byte == 0xF0 || byte == 0xF7 {
            // SysEx: not emitted by this implementation; skip defensively.
            pos += 1;
            if pos >= self.span.end {
                return end_step(pos, abs_tick, self.last_status);
            }
            let (len, used) = read_var_long(&bytes[pos..self.span.end]);
            pos += used;
            pos = (pos + len as usize).min(self.span.end);
            return CursorStep {
                next_pos: pos,
                next_abs_tick: abs_tick,
                next_last_status: self.last_status,
                emit: None,
                is_end: false,
            };
        }

        let (status, data_start) = if byte & 0x80 == 0 {
            // Running status: this byte is already the first data byte.
            (self.last_status, pos)
        } else {
            pos += 1;
            (byte, pos)
        };

        let ndata = data_bytes_for_status(status);
        if data_start + ndata > self.span.end {
            return end_step(data_start, abs_tick, status);
        }
        let data1 = bytes[data_start];
        let data2 = if ndata == 2 { Some(bytes[data_start + 1]) } else { None };
        pos = data_start + ndata;

        CursorStep {
            next_pos: pos,
            next_abs_tick: abs_tick,
            next_last_status: status,
            emit: Some(Event::Channel {
                status,
                channel: status & 0x0F,
                data1,
                data2,
            }),
            is_end: false,
        }
    }

    /// Applies a previously computed [`CursorStep`].
    pub fn commit(&mut self, step: &CursorStep) {
        self.pos = step.next_pos;
        self.abs_tick = step.next_abs_tick;
        self.last_status = step.next_last_status;
        if step.is_end {
            self.ended = true;
        }
    }
}

fn end_step(pos: usize, abs_tick: u64, last_status: u8) -> CursorStep {
    CursorStep {
        next_pos: pos,
        next_abs_tick: abs_tick,
        next_last_status: last_status,
        emit: None,
        is_end: true,
    }
}
