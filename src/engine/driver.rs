//! The seam between this engine and the (out-of-scope) audio output
//! driver. A real backend — ALSA, WinMM, CoreAudio, a `cpal` bridge —
//! implements this trait; the engine never depends on one directly, the
//! same split `Boddlnagg-midir` draws between `src/traits.rs` and its
//! per-platform backends.

use std::sync::Arc;

use crate::error::Result;

/// Invoked by a driver implementation from whatever thread it likes when
/// a previously enqueued buffer finishes playing. The driver callback
/// itself must not suspend; it signals completion and returns.
pub type CompletionSink = Arc<dyn Fn(usize) + Send + Sync>;

/// Either channel's current attenuation, as the driver reports it.
pub type DriverVolume = (u16, u16);

pub trait Driver: Send {
    /// Opens a stream bound to this player, registering `on_done` to be
    /// called with a buffer index on every completion.
    fn open_stream(&mut self, on_done: CompletionSink) -> Result<()>;

    /// Sets the timebase (PPQN) property on the open stream.
    fn set_timebase(&mut self, ppqn: u16) -> Result<()>;

    /// Readies buffer slot `idx`'s contents for submission. Real backends
    /// pin/prepare the header here; `enqueue` is the separate submit step,
    /// matching the prepare/submit split real event-buffer APIs draw.
    fn prepare(&mut self, idx: usize, data: &[u8]) -> Result<()>;

    /// Submits a previously prepared buffer slot. A "still playing"
    /// response from the underlying API is benign and must not be
    /// surfaced as an error.
    fn enqueue(&mut self, idx: usize) -> Result<()>;

    /// Releases buffer slot `idx`, the counterpart to `prepare`.
    fn unprepare(&mut self, idx: usize) -> Result<()>;

    fn pause(&mut self) -> Result<()>;
    fn restart(&mut self) -> Result<()>;
    fn reset(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    fn get_volume(&self) -> DriverVolume;
    fn set_volume(&mut self, left: u16, right: u16) -> Result<()>;
}

/// A test/demo double that never opens real hardware. Buffer completion
/// is simulated on a background thread after a short delay, so tests
/// exercise the same completion-callback concurrency a real driver would
/// drive (buffer-done arriving from an unrelated thread, in enqueue
/// order) rather than completing synchronously inline.
pub struct NullDriver {
    volume: (u16, u16),
    sink: Option<CompletionSink>,
    paused: bool,
}

impl NullDriver {
    pub fn new() -> Self {
        NullDriver {
            volume: (0xFFFF, 0xFFFF),
            sink: None,
            paused: false,
        }
    }
}

impl Default for NullDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for NullDriver {
    fn open_stream(&mut self, on_done: CompletionSink) -> Result<()> {
        self.sink = Some(on_done);
        self.paused = false;
        Ok(())
    }

    fn set_timebase(&mut self, _ppqn: u16) -> Result<()> {
        Ok(())
    }

    fn prepare(&mut self, _idx: usize, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn enqueue(&mut self, idx: usize) -> Result<()> {
        if self.paused {
            return Ok(());
        }
        if let Some(sink) = self.sink.clone() {
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(1));
                sink(idx);
            });
        }
        Ok(())
    }

    fn unprepare(&mut self, _idx: usize) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.paused = true;
        Ok(())
    }
    fn restart(&mut self) -> Result<()> {
        self.paused = false;
        Ok(())
    }
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
    fn close(&mut self) -> Result<()> {
        self.sink = None;
        Ok(())
    }

    fn get_volume(&self) -> DriverVolume {
        self.volume
    }
    fn set_volume(&mut self, left: u16, right: u16) -> Result<()> {
        self.volume = (left, right);
        Ok(())
    }
}
