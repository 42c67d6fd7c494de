//! The handle table every public operation consults before touching a
//! player.
//!
//! Grounded on `mid_player.c`'s `players` linked list plus
//! `players_mutex`: a flat set of live player references guarded by one
//! mutex, walked by `is_valid` and mutated only on open (insert) and
//! close (remove). Generalized here to a `Registry<T>` so each of the
//! three player kinds (MIDI/MUS/PCM) owns its own instance instead of a
//! shared module-level list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// An opaque reference to a registered player. Cheap to copy, meaningless
/// outside the `Registry` that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

/// A mutex-guarded set of live player references, keyed by `Handle`.
///
/// Lock order is always **this mutex, then the player's own mutex**,
/// never the reverse — every caller in this crate follows
/// lock registry → `is_valid` → lock player → unlock registry → operate.
pub struct Registry<T> {
    next: AtomicU64,
    live: Mutex<HashMap<Handle, Arc<T>>>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Registry {
            next: AtomicU64::new(1),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `value`, returning the handle callers will use to refer
    /// to it. Called at the end of `open`, once the player and its worker
    /// are already running.
    pub fn insert(&self, value: Arc<T>) -> Handle {
        let h = Handle(self.next.fetch_add(1, Ordering::Relaxed));
        self.live.lock().unwrap().insert(h, value);
        h
    }

    /// Removes and returns the reference for `h`, if it was live. `close`
    /// calls this *before* draining the worker, so no concurrent lookup
    /// can observe a handle mid-teardown.
    pub fn remove(&self, h: Handle) -> Option<Arc<T>> {
        self.live.lock().unwrap().remove(&h)
    }

    /// Returns a cloned reference to the live player behind `h`, or
    /// `None` for an invalid handle. Every public operation other than
    /// `close` uses this instead of a separate `is_valid` + lookup pair,
    /// since the two are equivalent under one lock acquisition.
    pub fn get(&self, h: Handle) -> Option<Arc<T>> {
        self.live.lock().unwrap().get(&h).cloned()
    }

    pub fn is_valid(&self, h: Handle) -> bool {
        self.live.lock().unwrap().contains_key(&h)
    }

    pub fn len(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_registry_is_empty() {
        let r: Registry<i32> = Registry::new();
        assert!(r.is_empty());
    }

    #[test]
    fn insert_then_get_round_trips() {
        let r = Registry::new();
        let h = r.insert(Arc::new(42));
        assert!(r.is_valid(h));
        assert_eq!(*r.get(h).unwrap(), 42);
    }

    #[test]
    fn remove_invalidates_handle() {
        let r = Registry::new();
        let h = r.insert(Arc::new(7));
        assert!(r.remove(h).is_some());
        assert!(!r.is_valid(h));
        assert!(r.get(h).is_none());
    }

    #[test]
    fn unknown_handle_is_invalid() {
        let r: Registry<i32> = Registry::new();
        let other: Registry<i32> = Registry::new();
        let h = other.insert(Arc::new(1));
        assert!(!r.is_valid(h));
    }

    #[test]
    fn handles_are_distinct_across_inserts() {
        let r = Registry::new();
        let a = r.insert(Arc::new(1));
        let b = r.insert(Arc::new(2));
        assert_ne!(a, b);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn remove_is_a_silent_noop_on_already_removed_handle() {
        let r = Registry::new();
        let h = r.insert(Arc::new(1));
        assert!(r.remove(h).is_some());
        assert!(r.remove(h).is_none());
    }
}
