//! The normalized event type produced by both the MIDI file parser's
//! per-track cursors and the MUS transcoder, and the fixed 12-byte wire
//! record the packer serializes it into.
//!
//! This replaces the original C implementation's overlapping-union trick
//! (a packed byte reinterpreted as a `channel:4, command:3, marker:1`
//! bitfield) with an explicit sum type and an explicit serializer, per the
//! "Tagged events" design note.

use byteorder::{NativeEndian, WriteBytesExt};

/// Event-type tag occupying the high 8 bits of a packed record.
pub const SHORT_MSG: u8 = 0x01;
pub const TEMPO: u8 = 0x80;
pub const META: u8 = 0x40;

/// A standard MIDI meta-event type byte that isn't tempo (which gets its
/// own tag above), carried through verbatim. Currently only end-of-track
/// (`0x2F`) is ever packed.
pub const META_END_OF_TRACK: u8 = 0x2F;

/// One decoded, not-yet-serialized playback event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// A MIDI channel voice message: status nibble (top nibble of the
    /// status byte, e.g. `0x90` for Note On) | channel, plus 1 or 2 data
    /// bytes depending on the message family.
    Channel {
        status: u8,
        channel: u8,
        data1: u8,
        data2: Option<u8>,
    },
    /// A tempo meta-event (`0xFF 0x51 0x03`), carrying microseconds per
    /// quarter note in its low 24 bits.
    Tempo { micros_per_qn: u32 },
    /// A non-tempo meta-event, carried through by its type byte alone
    /// (e.g. [`META_END_OF_TRACK`]).
    Meta { meta_type: u8 },
}

/// A fixed 12-byte wire record: `(delta_ticks, stream_id, packed_event)`.
/// `stream_id` is always 0 in this engine (single logical stream per
/// player); `packed_event`'s high 8 bits select [`SHORT_MSG`] or [`TEMPO`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub delta_ticks: u32,
    pub stream_id: u32,
    pub packed_event: u32,
}

pub const RECORD_SIZE: usize = 12;

impl Record {
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = Vec::with_capacity(RECORD_SIZE);
        buf.write_u32::<NativeEndian>(self.delta_ticks).unwrap();
        buf.write_u32::<NativeEndian>(self.stream_id).unwrap();
        buf.write_u32::<NativeEndian>(self.packed_event).unwrap();
        buf.try_into().unwrap()
    }
}

/// Serializes `event` with the given `delta_ticks` into a wire [`Record`].
pub fn pack(event: Event, delta_ticks: u32) -> Record {
    let packed = match event {
        Event::Channel {
            status,
            channel,
            data1,
            data2,
        } => {
            let status_byte = (status & 0xF0) | (channel & 0x0F);
            let payload = status_byte as u32
                | (data1 as u32) << 8
                | (data2.unwrap_or(0) as u32) << 16;
            ((SHORT_MSG as u32) << 24) | (payload & 0x00FF_FFFF)
        }
        Event::Tempo { micros_per_qn } => ((TEMPO as u32) << 24) | (micros_per_qn & 0x00FF_FFFF),
        Event::Meta { meta_type } => (META as u32) << 24 | meta_type as u32,
    };
    Record {
        delta_ticks,
        stream_id: 0,
        packed_event: packed,
    }
}

/// Channel message families that carry a single data byte instead of two:
/// Program Change (`0xCn`) and Channel Pressure (`0xDn`).
pub fn data_bytes_for_status(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_event_packs_status_and_channel_into_low_byte() {
        let ev = Event::Channel {
            status: 0x90,
            channel: 3,
            data1: 60,
            data2: Some(100),
        };
        let rec = pack(ev, 5);
        assert_eq!(rec.delta_ticks, 5);
        assert_eq!(rec.stream_id, 0);
        assert_eq!(rec.packed_event >> 24, SHORT_MSG as u32);
        let payload = rec.packed_event & 0x00FF_FFFF;
        assert_eq!(payload & 0xFF, 0x93);
        assert_eq!((payload >> 8) & 0xFF, 60);
        assert_eq!((payload >> 16) & 0xFF, 100);
    }

    #[test]
    fn meta_event_packs_type_byte_under_its_own_tag() {
        let rec = pack(Event::Meta { meta_type: META_END_OF_TRACK }, 0);
        assert_eq!(rec.packed_event >> 24, META as u32);
        assert_eq!(rec.packed_event & 0x00FF_FFFF, META_END_OF_TRACK as u32);
    }

    #[test]
    fn tempo_event_packs_micros_in_low_24_bits() {
        let rec = pack(Event::Tempo { micros_per_qn: 500_000 }, 0);
        assert_eq!(rec.packed_event >> 24, TEMPO as u32);
        assert_eq!(rec.packed_event & 0x00FF_FFFF, 500_000);
    }

    #[test]
    fn record_serializes_to_twelve_bytes() {
        let rec = pack(
            Event::Channel {
                status: 0x80,
                channel: 0,
                data1: 60,
                data2: Some(0),
            },
            96,
        );
        let bytes = rec.to_bytes();
        assert_eq!(bytes.len(), RECORD_SIZE);
    }

    #[test]
    fn program_change_and_channel_pressure_take_one_data_byte() {
        assert_eq!(data_bytes_for_status(0xC3), 1);
        assert_eq!(data_bytes_for_status(0xD3), 1);
        assert_eq!(data_bytes_for_status(0x90), 2);
        assert_eq!(data_bytes_for_status(0xB0), 2);
    }
}
