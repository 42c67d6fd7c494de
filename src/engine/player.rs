//! The player state machine: a `Mutex`-guarded core plus two condvars,
//! driven by one dedicated worker thread per player.
//!
//! Grounded directly on `mid_player.c`'s `mid_play`/`mid_pause`/
//! `mid_close_stream` and the `mid_player_proc` worker. The original's
//! boolean completion event and `players_mutex`-adjacent `cond_t ready`
//! become a `Condvar` pair here; the rest of the control-operation shape
//! — lock, check precondition, drive the driver, release — carries over
//! directly.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;

use crate::engine::buffer::BufferPair;
use crate::engine::driver::Driver;
use crate::engine::source::Refillable;
use crate::engine::state::State;
use crate::error::{EngineError, Result};

/// Invoked by the worker whenever it reaches the STOPPED quiescent
/// point, carrying the state it stopped in (`Stopped` or `Error`) —
/// matching `mid_player.c`'s `p->cb(p->state)`.
pub type NotifyCallback = Box<dyn Fn(State) + Send>;

pub(crate) struct Inner<S> {
    pub(crate) state: State,
    pub(crate) source: S,
    pub(crate) driver: Box<dyn Driver>,
    pub(crate) buffers: BufferPair,
    pub(crate) idx: usize,
    pub(crate) looping: bool,
    pub(crate) notify: Option<NotifyCallback>,
    /// Bumped every time the worker completes its STOPPED-branch
    /// bookkeeping; `stop`/`close` wait for this to advance past the
    /// value observed when they requested the transition, which is what
    /// makes `stop` synchronous without a dedicated channel per call.
    pub(crate) stopped_generation: u64,
}

/// A live player: one Score/Sample source, one driver binding, one
/// worker thread. Shared via `Arc` between the caller's control thread
/// and the worker.
pub struct Player<S> {
    pub(crate) inner: Mutex<Inner<S>>,
    pub(crate) completion: Condvar,
    pub(crate) ready: Condvar,
}

impl<S: Refillable + 'static> Player<S> {
    /// Allocates a player in the STOPPED state and starts its worker
    /// thread, which immediately parks waiting for the first `play`.
    pub fn spawn(source: S, driver: Box<dyn Driver>, notify: Option<NotifyCallback>) -> Arc<Self> {
        let player = Arc::new(Player {
            inner: Mutex::new(Inner {
                state: State::Stopped,
                source,
                driver,
                buffers: BufferPair::new(),
                idx: 0,
                looping: false,
                notify,
                stopped_generation: 0,
            }),
            completion: Condvar::new(),
            ready: Condvar::new(),
        });
        let worker_player = player.clone();
        thread::spawn(move || super::worker::run(worker_player));
        player
    }

    fn completion_sink(self: &Arc<Self>) -> crate::engine::driver::CompletionSink {
        let weak = Arc::downgrade(self);
        Arc::new(move |idx: usize| {
            if let Some(player) = weak.upgrade() {
                if let Ok(mut g) = player.inner.lock() {
                    g.buffers.mark_done(idx);
                }
                player.completion.notify_all();
            }
        })
    }

    /// `play` from STOPPED: opens the driver stream, primes both
    /// buffers, unpauses the driver, and wakes the worker. A no-op
    /// outside STOPPED.
    pub fn play(self: &Arc<Self>) -> Result<()> {
        let mut g = self.inner.lock()?;
        if g.state != State::Stopped {
            return Ok(());
        }
        let sink = self.completion_sink();
        g.driver.open_stream(sink)?;
        let timebase = g.source.timebase();
        g.driver.set_timebase(timebase)?;
        let cap = g.source.buffer_capacity();

        let chunk0 = g.source.refill(cap);
        g.driver.prepare(0, &chunk0)?;
        g.buffers.fill(0, chunk0);
        g.driver.enqueue(0)?;

        let chunk1 = g.source.refill(cap);
        if !chunk1.is_empty() {
            g.driver.prepare(1, &chunk1)?;
            g.buffers.fill(1, chunk1);
            g.driver.enqueue(1)?;
        }

        g.idx = 0;
        g.driver.restart()?;
        g.state = State::Playing;
        drop(g);
        log::debug!("player state -> Playing");
        self.completion.notify_all();
        Ok(())
    }

    /// `stop`: synchronous from any live state. Resets and closes the
    /// driver, rewinds the source, wakes the worker, and blocks until it
    /// confirms the STOPPED quiescent point via the `ready` condvar.
    pub fn stop(self: &Arc<Self>) -> Result<()> {
        let g = self.inner.lock()?;
        if !g.state.is_live() {
            return Err(EngineError::DriverFailure("player already shut down".into()));
        }
        if g.state == State::Stopped {
            return Ok(());
        }
        self.drive_to_stopped(g)?;
        Ok(())
    }

    /// Shared by `stop` and `close`: reset and close the driver, rewind
    /// the source, signal the worker, and block until it confirms the
    /// STOPPED quiescent point.
    fn drive_to_stopped<'a>(
        self: &'a Arc<Self>,
        mut g: MutexGuard<'a, Inner<S>>,
    ) -> Result<MutexGuard<'a, Inner<S>>> {
        g.driver.reset()?;
        g.driver.close()?;
        g.source.rewind();
        let generation_before = g.stopped_generation;
        g.state = State::Stopped;
        drop(g);
        log::debug!("player state -> Stopped, awaiting worker ready signal");
        self.completion.notify_all();

        let g = self.inner.lock()?;
        let g = self
            .ready
            .wait_while(g, |inner| inner.stopped_generation == generation_before)
            .map_err(|_| EngineError::SyncFailure("ready condvar poisoned".into()))?;
        Ok(g)
    }

    /// `close`: drives to STOPPED if not already there, then shuts the
    /// worker down. Silent no-op semantics for an already-dead player are
    /// handled by the registry, not here — by the time this runs the
    /// handle has already been removed.
    pub fn close(self: &Arc<Self>) {
        let result: Result<()> = (|| {
            let mut g = self.inner.lock()?;
            if g.state.is_live() && g.state != State::Stopped {
                g = self.drive_to_stopped(g)?;
            }
            g.state = State::Shutdown;
            Ok(())
        })();
        if let Err(e) = result {
            log::error!("close: failed to drive player to STOPPED before shutdown: {e}");
        }
        log::debug!("player state -> Shutdown");
        self.completion.notify_all();
    }

    pub fn pause(&self) -> Result<()> {
        let mut g = self.inner.lock()?;
        if g.state != State::Playing {
            return Ok(());
        }
        g.driver.pause()?;
        g.state = State::Paused;
        log::debug!("player state -> Paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        let mut g = self.inner.lock()?;
        if g.state != State::Paused {
            return Ok(());
        }
        g.driver.restart()?;
        g.state = State::Playing;
        drop(g);
        log::debug!("player state -> Playing (resumed)");
        self.completion.notify_all();
        Ok(())
    }

    pub fn set_looping(&self, looping: bool) -> Result<()> {
        self.inner.lock()?.looping = looping;
        Ok(())
    }

    pub fn is_looping(&self) -> bool {
        self.inner.lock().map(|g| g.looping).unwrap_or(false)
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().map(|g| g.state.is_playing()).unwrap_or(false)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().map(|g| g.state.is_paused()).unwrap_or(false)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().map(|g| g.state.is_stopped()).unwrap_or(false)
    }

    /// Per-stream volume (PCM) if the source owns one; otherwise the
    /// driver's shared global volume.
    pub fn get_volume(&self) -> Result<(u16, u16)> {
        let g = self.inner.lock()?;
        Ok(g.source.get_volume().unwrap_or_else(|| g.driver.get_volume()))
    }

    pub fn set_volume(&self, left: u16, right: u16) -> Result<()> {
        let mut g = self.inner.lock()?;
        if !g.source.set_volume(left, right) {
            g.driver.set_volume(left, right)?;
        }
        Ok(())
    }

    pub fn set_volume_left(&self, left: u16) -> Result<()> {
        let (_, right) = self.get_volume()?;
        self.set_volume(left, right)
    }

    pub fn set_volume_right(&self, right: u16) -> Result<()> {
        let (left, _) = self.get_volume()?;
        self.set_volume(left, right)
    }

    /// Swaps in a fresh source on an idle (STOPPED) player, for the PCM
    /// pool: reusing the worker thread instead of spawning a new one per
    /// `open`.
    pub fn reattach_source(&self, source: S) -> Result<()> {
        let mut g = self.inner.lock()?;
        if g.state != State::Stopped {
            return Err(EngineError::DriverFailure(
                "cannot reattach a source while the player is live".into(),
            ));
        }
        g.source = source;
        g.idx = 0;
        g.buffers = BufferPair::new();
        Ok(())
    }
}
