//! Standard MIDI File header and chunk-table parsing.
//!
//! This module validates the file structure and locates each track's raw
//! byte span; it performs no event decoding (that's [`crate::midi::cursor`]
//! and the packer's job).

use crate::codec::swap_u32;
use crate::error::{EngineError, Result};

/// The validated `MThd` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format: u16,
    pub num_tracks: u16,
    pub timebase: u16,
}

/// A located, not-yet-parsed track chunk: the byte range of its event
/// stream (after the `MTrk` magic and length field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSpan {
    pub start: usize,
    pub end: usize,
}

const HEADER_LEN: usize = 14;

fn be_u16(b: &[u8]) -> u16 {
    ((b[0] as u16) << 8) | b[1] as u16
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

/// Validates the 14-byte `MThd` header and returns it alongside the
/// offset of the first track chunk.
pub fn parse_header(bytes: &[u8]) -> Result<(Header, usize)> {
    if bytes.len() < HEADER_LEN {
        log::warn!("MIDI open rejected: buffer shorter than MThd header");
        return Err(EngineError::Malformed("buffer shorter than MThd header".into()));
    }
    if &bytes[0..4] != b"MThd" {
        log::warn!("MIDI open rejected: missing MThd magic");
        return Err(EngineError::Malformed("missing MThd magic".into()));
    }
    let size = be_u32(&bytes[4..8]);
    if size != 6 {
        log::warn!("MIDI open rejected: MThd size field {size} != 6");
        return Err(EngineError::Malformed(format!("MThd size field {size} != 6")));
    }
    let format = be_u16(&bytes[8..10]);
    if format > 2 {
        log::warn!("MIDI open rejected: unsupported format {format}");
        return Err(EngineError::Malformed(format!("unsupported format {format}")));
    }
    let num_tracks = be_u16(&bytes[10..12]);
    let timebase = be_u16(&bytes[12..14]);

    debug_assert_eq!(swap_u32(swap_u32(size)), size);
    Ok((
        Header {
            format,
            num_tracks,
            timebase,
        },
        HEADER_LEN,
    ))
}

/// Walks the raw buffer from `offset`, locating every `MTrk` chunk's event
/// span by its declared length. Stops after `expected` tracks or when the
/// buffer is exhausted, whichever comes first.
pub fn locate_tracks(bytes: &[u8], mut offset: usize, expected: u16) -> Result<Vec<TrackSpan>> {
    let mut spans = Vec::with_capacity(expected as usize);
    while spans.len() < expected as usize {
        if offset + 8 > bytes.len() {
            log::warn!("MIDI open rejected: truncated MTrk chunk header");
            return Err(EngineError::Malformed("truncated MTrk chunk header".into()));
        }
        if &bytes[offset..offset + 4] != b"MTrk" {
            log::warn!("MIDI open rejected: missing MTrk magic at offset {offset}");
            return Err(EngineError::Malformed("missing MTrk magic".into()));
        }
        let len = be_u32(&bytes[offset + 4..offset + 8]) as usize;
        let start = offset + 8;
        let end = start
            .checked_add(len)
            .ok_or_else(|| EngineError::Malformed("MTrk length overflow".into()))?;
        if end > bytes.len() {
            return Err(EngineError::Malformed("MTrk chunk runs past end of buffer".into()));
        }
        spans.push(TrackSpan { start, end });
        offset = end;
    }
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &[u8] = &[
        b'M', b'T', b'h', b'd', 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x01, 0x00, 0x60, b'M',
        b'T', b'r', b'k', 0x00, 0x00, 0x00, 0x04, 0x00, 0xFF, 0x2F, 0x00,
    ];

    #[test]
    fn parses_minimal_header() {
        let (hdr, offset) = parse_header(MINIMAL).unwrap();
        assert_eq!(hdr.format, 0);
        assert_eq!(hdr.num_tracks, 1);
        assert_eq!(hdr.timebase, 0x60);
        assert_eq!(offset, 14);
    }

    #[test]
    fn locates_single_track() {
        let (_, offset) = parse_header(MINIMAL).unwrap();
        let spans = locate_tracks(MINIMAL, offset, 1).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 22);
        assert_eq!(spans[0].end, 26);
    }

    #[test]
    fn rejects_short_buffer() {
        let err = parse_header(&MINIMAL[..10]).unwrap_err();
        assert!(matches!(err, EngineError::Malformed(_)));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = MINIMAL.to_vec();
        bytes[0] = b'X';
        assert!(parse_header(&bytes).is_err());
    }

    #[test]
    fn rejects_bad_size_field() {
        let mut bytes = MINIMAL.to_vec();
        bytes[7] = 7;
        assert!(parse_header(&bytes).is_err());
    }

    #[test]
    fn rejects_truncated_track_chunk() {
        let (_, offset) = parse_header(MINIMAL).unwrap();
        let truncated = &MINIMAL[..offset + 4];
        assert!(locate_tracks(truncated, offset, 1).is_err());
    }
}
