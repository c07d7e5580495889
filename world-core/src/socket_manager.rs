//! Socket liveness: ping/pong, grace period, miss-tolerance eviction.
//!
//! Transport-agnostic: this module only decides *when* to ping and *when*
//! to evict; `game-server` performs the actual WebSocket ping send.

use crate::ids::SocketId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct SocketLiveness {
    first_seen: Instant,
    last_ping_sent: Option<Instant>,
    awaiting_pong: bool,
    missed_count: u32,
}

/// Decision produced by [`SocketManager::update`] for the caller to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessAction {
    SendPing(SocketId),
    Evict(SocketId),
}

pub struct SocketManager {
    sockets: HashMap<SocketId, SocketLiveness>,
    ping_interval: Duration,
    grace_period: Duration,
    miss_tolerance: u32,
}

impl SocketManager {
    pub fn new(ping_interval: Duration, grace_period: Duration, miss_tolerance: u32) -> Self {
        SocketManager {
            sockets: HashMap::new(),
            ping_interval,
            grace_period,
            miss_tolerance,
        }
    }

    pub fn register(&mut self, socket: SocketId, now: Instant) {
        self.sockets.insert(
            socket,
            SocketLiveness {
                first_seen: now,
                last_ping_sent: None,
                awaiting_pong: false,
                missed_count: 0,
            },
        );
    }

    pub fn remove(&mut self, socket: SocketId) {
        self.sockets.remove(&socket);
    }

    /// Records a pong, resetting the miss counter.
    pub fn on_pong(&mut self, socket: SocketId) {
        if let Some(liveness) = self.sockets.get_mut(&socket) {
            liveness.awaiting_pong = false;
            liveness.missed_count = 0;
        }
    }

    /// Call periodically (independent of the simulation tick). Returns the
    /// sockets to ping now and the sockets that exceeded miss tolerance and
    /// must be disconnected.
    pub fn update(&mut self, now: Instant) -> Vec<LivenessAction> {
        let mut actions = Vec::new();
        let mut to_evict = Vec::new();

        for (id, liveness) in self.sockets.iter_mut() {
            if liveness.awaiting_pong {
                let sent_at = liveness.last_ping_sent.unwrap_or(liveness.first_seen);
                if now.duration_since(sent_at) >= self.grace_period {
                    liveness.missed_count += 1;
                    liveness.awaiting_pong = false;
                    if liveness.missed_count >= self.miss_tolerance {
                        to_evict.push(*id);
                        continue;
                    }
                }
            }
            let since_last = liveness
                .last_ping_sent
                .map(|t| now.duration_since(t))
                .unwrap_or(self.ping_interval);
            if !liveness.awaiting_pong && since_last >= self.ping_interval {
                liveness.last_ping_sent = Some(now);
                liveness.awaiting_pong = true;
                actions.push(LivenessAction::SendPing(*id));
            }
        }

        for id in to_evict {
            self.sockets.remove(&id);
            actions.push(LivenessAction::Evict(id));
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_after_consecutive_missed_pongs() {
        let ping_interval = Duration::from_secs(5);
        let grace = Duration::from_secs(5);
        let mut mgr = SocketManager::new(ping_interval, grace, 3);
        let socket = SocketId(1);
        let mut now = Instant::now();
        mgr.register(socket, now);

        // First ping goes out immediately (never pinged before).
        let actions = mgr.update(now);
        assert_eq!(actions, vec![LivenessAction::SendPing(socket)]);

        // Three missed grace periods in a row evict the socket.
        for _ in 0..2 {
            now += grace;
            let actions = mgr.update(now);
            assert!(actions.is_empty() || matches!(actions[0], LivenessAction::SendPing(_)));
        }
        now += grace;
        let actions = mgr.update(now);
        assert!(actions.contains(&LivenessAction::Evict(socket)));
    }

    #[test]
    fn pong_resets_miss_counter() {
        let ping_interval = Duration::from_secs(5);
        let grace = Duration::from_secs(5);
        let mut mgr = SocketManager::new(ping_interval, grace, 3);
        let socket = SocketId(1);
        let mut now = Instant::now();
        mgr.register(socket, now);
        mgr.update(now);
        now += grace;
        mgr.update(now); // one miss
        mgr.on_pong(socket);
        // no longer awaiting pong, miss counter cleared.
        assert!(!mgr.sockets.get(&socket).unwrap().awaiting_pong);
        assert_eq!(mgr.sockets.get(&socket).unwrap().missed_count, 0);
    }
}
