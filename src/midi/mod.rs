//! Standard MIDI File parsing and event decoding.

pub mod cursor;
pub mod file;
pub mod score;

pub use score::Score;
