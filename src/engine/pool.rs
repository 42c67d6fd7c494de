//! A small free-list of idle PCM player shells, avoiding a thread spawn
//! per `open` call for the high-churn case (DOOM fires short sound
//! effects constantly). Not used by MIDI/MUS, which open infrequently
//! enough that pooling buys nothing.

use std::sync::Arc;

use crate::engine::driver::Driver;
use crate::engine::player::{NotifyCallback, Player};
use crate::engine::source::PcmSource;

/// Bounded stash of players parked in STOPPED, worker thread still
/// running, waiting for a fresh `Sample` via
/// [`Player::reattach_source`]. Consulted *before* registry insertion;
/// never interleaved with player-mutex-held code, so it does not affect
/// the registry → player lock order.
pub struct Pool {
    capacity: usize,
    idle: Vec<Arc<Player<PcmSource>>>,
}

impl Pool {
    pub fn new(capacity: usize) -> Self {
        Pool {
            capacity,
            idle: Vec::new(),
        }
    }

    /// Hands back a previously released idle shell, if one exists, with
    /// its worker already parked and ready for `reattach_source`.
    pub fn take(&mut self) -> Option<Arc<Player<PcmSource>>> {
        self.idle.pop()
    }

    /// Offers a STOPPED shell back to the pool. If the pool is already
    /// at capacity the shell is shut down instead of leaking its worker
    /// thread.
    pub fn release(&mut self, player: Arc<Player<PcmSource>>) {
        if self.idle.len() < self.capacity {
            self.idle.push(player);
        } else {
            player.close();
        }
    }

    pub fn make_fresh(
        &self,
        source: PcmSource,
        driver: Box<dyn Driver>,
        notify: Option<NotifyCallback>,
    ) -> Arc<Player<PcmSource>> {
        Player::spawn(source, driver, notify)
    }

    pub fn len(&self) -> usize {
        self.idle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idle.is_empty()
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        for player in self.idle.drain(..) {
            player.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_pool_is_empty() {
        let p = Pool::new(4);
        assert!(p.is_empty());
        assert_eq!(p.len(), 0);
    }

    #[test]
    fn release_past_capacity_is_dropped() {
        use crate::engine::driver::NullDriver;

        let mut p = Pool::new(1);
        let samples = vec![1u8; 4];
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3u16.to_le_bytes());
        bytes.extend_from_slice(&11025u16.to_le_bytes());
        bytes.extend_from_slice(&((samples.len() + 32) as u32).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&samples);
        bytes.extend_from_slice(&[0u8; 16]);

        let a = p.make_fresh(PcmSource::open(&bytes).unwrap(), Box::new(NullDriver::new()), None);
        let b = p.make_fresh(PcmSource::open(&bytes).unwrap(), Box::new(NullDriver::new()), None);
        p.release(a);
        p.release(b);
        assert_eq!(p.len(), 1);
    }
}
