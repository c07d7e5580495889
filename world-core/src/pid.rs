//! Deterministic per-player processing-order rank ("PID").
//!
//! Assigns a slot in `[0..MAX_PID]` on join, reshuffled every 100-150 ticks
//! by a seeded RNG so results are reproducible given the same seed and
//! join/leave sequence.

use crate::ids::PlayerId;
use protocol::names::limits::MAX_PID;
use protocol::names::timing::{PID_RESHUFFLE_MAX_TICKS, PID_RESHUFFLE_MIN_TICKS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

pub struct PidManager {
    rng: StdRng,
    assigned: HashMap<PlayerId, u16>,
    order: Vec<PlayerId>,
    next_reshuffle_tick: u64,
}

impl PidManager {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let next_reshuffle_tick = Self::roll_next_interval(&mut rng, 0);
        PidManager {
            rng,
            assigned: HashMap::new(),
            order: Vec::new(),
            next_reshuffle_tick,
        }
    }

    fn roll_next_interval(rng: &mut StdRng, current_tick: u64) -> u64 {
        current_tick + rng.gen_range(PID_RESHUFFLE_MIN_TICKS..=PID_RESHUFFLE_MAX_TICKS)
    }

    /// Assigns the lowest free PID in `[0..=MAX_PID]` to a joining player.
    pub fn assign(&mut self, player: PlayerId) -> Option<u16> {
        let used: std::collections::HashSet<u16> = self.assigned.values().copied().collect();
        let free = (0..=MAX_PID).find(|pid| !used.contains(pid))?;
        self.assigned.insert(player, free);
        self.order.push(player);
        Some(free)
    }

    pub fn release(&mut self, player: PlayerId) {
        self.assigned.remove(&player);
        self.order.retain(|p| *p != player);
    }

    pub fn pid_of(&self, player: PlayerId) -> Option<u16> {
        self.assigned.get(&player).copied()
    }

    /// Returns players ordered low-PID-first, the processing order used to
    /// resolve ties when multiple players target the same tile/mob.
    pub fn processing_order(&self) -> Vec<PlayerId> {
        let mut players = self.order.clone();
        players.sort_by_key(|p| self.assigned.get(p).copied().unwrap_or(u16::MAX));
        players
    }

    /// Called once per tick; reshuffles PIDs among currently-joined players
    /// every 100-150 ticks.
    pub fn on_tick(&mut self, current_tick: u64) {
        if current_tick < self.next_reshuffle_tick {
            return;
        }
        self.next_reshuffle_tick = Self::roll_next_interval(&mut self.rng, current_tick);

        // Collect pids in `order` (stable insertion order), not `HashMap`
        // iteration order, which is randomized per-process and would make
        // the reshuffle outcome depend on hasher state instead of the seed.
        let mut pids: Vec<u16> = self
            .order
            .iter()
            .map(|player| self.assigned[player])
            .collect();
        for i in (1..pids.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            pids.swap(i, j);
        }
        for (player, pid) in self.order.clone().into_iter().zip(pids) {
            self.assigned.insert(player, pid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_and_sequence_produce_identical_assignments() {
        let players: Vec<PlayerId> = (0..10).map(PlayerId).collect();

        let mut a = PidManager::new(42);
        let mut b = PidManager::new(42);
        for p in &players {
            a.assign(*p);
            b.assign(*p);
        }
        for tick in 1..=200 {
            a.on_tick(tick);
            b.on_tick(tick);
        }

        for p in &players {
            assert_eq!(a.pid_of(*p), b.pid_of(*p));
        }
    }

    #[test]
    fn assigns_lowest_free_pid() {
        let mut mgr = PidManager::new(1);
        let p0 = PlayerId(0);
        let p1 = PlayerId(1);
        assert_eq!(mgr.assign(p0), Some(0));
        assert_eq!(mgr.assign(p1), Some(1));
        mgr.release(p0);
        let p2 = PlayerId(2);
        assert_eq!(mgr.assign(p2), Some(0));
    }
}
