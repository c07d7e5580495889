//! Fixed-cadence tick scheduler.
//!
//! A list of callbacks driven forward once per update, organized into five
//! ordered priority buckets rather than one flat list, since the simulation
//! needs deterministic phase ordering within a tick, not just periodic
//! expiry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Priority buckets, run in this order every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Input,
    Movement,
    Combat,
    Resources,
    Post,
}

const PRIORITIES: [Priority; 5] = [
    Priority::Input,
    Priority::Movement,
    Priority::Combat,
    Priority::Resources,
    Priority::Post,
];

/// A registered per-tick callback. Callbacks must not block; long-running
/// I/O is expected to be dispatched off-tick by the caller.
pub type TickCallback = Box<dyn FnMut(u64) + Send>;

/// Target wall-clock period between ticks.
pub const TICK_PERIOD: Duration = Duration::from_millis(protocol::names::timing::TICK_MS);

/// Drives the simulation forward one tick at a time, invoking registered
/// callbacks in priority-bucket order. The scheduler itself does not own a
/// clock loop; `game-server` drives `run_tick` from a `tokio::time::interval`,
/// so a tick that overruns its period simply makes the next tick start
/// immediately, a consequence of `interval`'s burst behavior.
pub struct TickScheduler {
    current_tick: AtomicU64,
    buckets: [Vec<TickCallback>; 5],
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    pub fn new() -> Self {
        TickScheduler {
            current_tick: AtomicU64::new(0),
            buckets: [
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ],
        }
    }

    /// Registers a callback under the given priority bucket. Callbacks run
    /// in registration order within their bucket.
    pub fn on_tick(&mut self, priority: Priority, callback: TickCallback) {
        self.buckets[priority as usize].push(callback);
    }

    /// Read-only tick counter, visible to other systems without locking.
    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::Relaxed)
    }

    /// Advances `current_tick` and runs every bucket, in order, to
    /// completion before moving to the next.
    pub fn run_tick(&mut self) {
        let tick = self.current_tick.fetch_add(1, Ordering::Relaxed) + 1;
        for priority in PRIORITIES {
            for callback in self.buckets[priority as usize].iter_mut() {
                callback(tick);
            }
        }
    }
}
