//! Per-player rate limiting for processing-style interactions (smelting,
//! smithing, crafting, fletching, tanning, runecrafting). One limiter
//! tracks all kinds for a player; each kind gets its own cooldown so
//! starting a smelt doesn't block a craft on the same tick.

use crate::ids::PlayerId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingKind {
    Smelt,
    Smith,
    Craft,
    Fletch,
    Tan,
    Runecraft,
}

#[derive(Default)]
pub struct RateLimiter {
    last_request: HashMap<(PlayerId, ProcessingKind), Instant>,
    cooldown: Duration,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        RateLimiter {
            last_request: HashMap::new(),
            cooldown,
        }
    }

    /// Returns `true` and records `now` if `player` may start `kind` now;
    /// returns `false` without recording anything if the cooldown hasn't
    /// elapsed since the last accepted request of that kind.
    pub fn try_acquire(&mut self, player: PlayerId, kind: ProcessingKind, now: Instant) -> bool {
        let key = (player, kind);
        if let Some(&last) = self.last_request.get(&key)
            && now.duration_since(last) < self.cooldown
        {
            return false;
        }
        self.last_request.insert(key, now);
        true
    }

    pub fn on_player_disconnect(&mut self, player: PlayerId) {
        self.last_request.retain(|(p, _), _| *p != player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_within_the_cooldown_is_rejected() {
        let mut limiter = RateLimiter::new(Duration::from_millis(500));
        let player = PlayerId(1);
        let t0 = Instant::now();
        assert!(limiter.try_acquire(player, ProcessingKind::Smelt, t0));
        assert!(!limiter.try_acquire(player, ProcessingKind::Smelt, t0 + Duration::from_millis(100)));
        assert!(limiter.try_acquire(player, ProcessingKind::Smelt, t0 + Duration::from_millis(600)));
    }

    #[test]
    fn different_kinds_have_independent_cooldowns() {
        let mut limiter = RateLimiter::new(Duration::from_millis(500));
        let player = PlayerId(1);
        let t0 = Instant::now();
        assert!(limiter.try_acquire(player, ProcessingKind::Smelt, t0));
        assert!(limiter.try_acquire(player, ProcessingKind::Craft, t0));
    }

    #[test]
    fn disconnect_clears_the_player_entirely() {
        let mut limiter = RateLimiter::new(Duration::from_millis(500));
        let player = PlayerId(1);
        let t0 = Instant::now();
        assert!(limiter.try_acquire(player, ProcessingKind::Tan, t0));
        limiter.on_player_disconnect(player);
        assert!(limiter.try_acquire(player, ProcessingKind::Tan, t0 + Duration::from_millis(1)));
    }
}
