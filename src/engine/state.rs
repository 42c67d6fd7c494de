//! The player state machine's finite state set.

/// A player's lifecycle state. `Starting` and `Stopping` are transient:
/// a control operation holding the player mutex may pass through them
/// internally, but the worker only ever observes `Playing`, `Paused`,
/// `Stopped`, `Shutdown`, or `Error` once it reacquires the lock, since
/// `play`/`stop` hold the mutex for their whole synchronous duration and
/// only commit the final state just before releasing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Error,
    Starting,
    Playing,
    Paused,
    Stopping,
    Stopped,
    Shutdown,
    /// PCM player-pool shells sit here before a `Sample` is attached.
    Initializing,
}

impl State {
    pub fn is_playing(self) -> bool {
        matches!(self, State::Playing)
    }
    pub fn is_paused(self) -> bool {
        matches!(self, State::Paused)
    }
    pub fn is_stopped(self) -> bool {
        matches!(self, State::Stopped)
    }
    pub fn is_live(self) -> bool {
        !matches!(self, State::Shutdown | State::Error)
    }
}
