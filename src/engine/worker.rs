//! The per-player worker thread: the canonical five-step loop, grounded
//! line-by-line on `mid_player.c`'s `mid_player_proc`.

use std::sync::Arc;

use crate::engine::player::{Inner, Player};
use crate::engine::source::Refillable;
use crate::engine::state::State;

pub(crate) fn run<S: Refillable>(player: Arc<Player<S>>) {
    loop {
        let mut g = match player.inner.lock() {
            Ok(g) => g,
            Err(_) => return,
        };
        match g.state {
            State::Playing => {
                g = match player.completion.wait(g) {
                    Ok(g) => g,
                    Err(_) => return,
                };
                if g.state == State::Shutdown {
                    return;
                }
                if g.state != State::Playing {
                    // A control operation moved the player out of PLAYING
                    // while we slept (stop/pause). Re-evaluate from the top.
                    continue;
                }
                let idx = g.idx;
                if !g.buffers.is_done(idx) {
                    // Spurious wake, or the other buffer finished first;
                    // nothing to refill yet.
                    continue;
                }
                log::trace!("worker woke: buffer {idx} done, refilling");
                let cap = g.source.buffer_capacity();
                let mut chunk = g.source.refill(cap);
                if chunk.is_empty() && g.looping {
                    log::trace!("source exhausted while looping, rewinding");
                    g.source.rewind();
                    chunk = g.source.refill(cap);
                }
                if !chunk.is_empty() {
                    submit(&mut g, idx, chunk);
                    g.idx = idx ^ 1;
                } else {
                    let other = idx ^ 1;
                    if !g.buffers.is_done(other) {
                        // The other buffer is still draining; give it a
                        // chance to finish before declaring end of stream.
                        continue;
                    }
                    log::debug!("source exhausted and drained, closing driver stream");
                    let _ = g.driver.close();
                    g.state = State::Stopped;
                    // Falls through to the STOPPED branch on the next
                    // iteration, still holding no stale data to repack.
                }
            }
            State::Stopped => {
                g.idx = 0;
                if let Some(cb) = &g.notify {
                    cb(State::Stopped);
                }
                g.source.rewind();
                g.stopped_generation = g.stopped_generation.wrapping_add(1);
                log::trace!("worker reached STOPPED quiescent point, parking");
                player.ready.notify_all();
                g = match player.completion.wait(g) {
                    Ok(g) => g,
                    Err(_) => return,
                };
                if g.state == State::Shutdown {
                    return;
                }
            }
            State::Shutdown | State::Error => return,
            State::Paused | State::Starting | State::Stopping | State::Initializing => {
                // Transient/query-only states: the driver has stopped
                // delivering completions (paused) or a control operation
                // is mid-flight holding this same mutex already, so the
                // only thing to do is wait for the next signal.
                let _ = player.completion.wait(g);
            }
        }
    }
}

fn submit<S: Refillable>(g: &mut Inner<S>, idx: usize, chunk: Vec<u8>) {
    let _ = g.driver.prepare(idx, &chunk);
    g.buffers.fill(idx, chunk);
    let _ = g.driver.enqueue(idx);
}
