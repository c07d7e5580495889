//! Home teleport: a 10-second cast that returns a player to their spawn
//! point, on a 15-minute cooldown, interruptible by combat or movement.

use crate::error::Reason;
use crate::ids::PlayerId;
use protocol::names::timing::{HOME_TELEPORT_CAST_SECS, HOME_TELEPORT_COOLDOWN_SECS, TICK_MS};
use std::collections::HashMap;

fn secs_to_ticks(secs: u64) -> u64 {
    (secs * 1000).div_ceil(TICK_MS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptCause {
    Combat,
    Movement,
}

#[derive(Debug, Clone, Copy)]
enum PlayerState {
    Idle { cooldown_until: Option<u64> },
    Casting { started_tick: u64 },
}

#[derive(Debug, Clone, Copy)]
pub enum HomeTeleportEvent {
    Started { player: PlayerId },
    Completed { player: PlayerId },
    Failed { player: PlayerId, reason: Reason },
}

pub struct HomeTeleportManager {
    states: HashMap<PlayerId, PlayerState>,
    cast_ticks: u64,
    cooldown_ticks: u64,
}

impl Default for HomeTeleportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HomeTeleportManager {
    pub fn new() -> Self {
        HomeTeleportManager {
            states: HashMap::new(),
            cast_ticks: secs_to_ticks(HOME_TELEPORT_CAST_SECS),
            cooldown_ticks: secs_to_ticks(HOME_TELEPORT_COOLDOWN_SECS),
        }
    }

    fn state(&self, player: PlayerId) -> PlayerState {
        self.states
            .get(&player)
            .copied()
            .unwrap_or(PlayerState::Idle { cooldown_until: None })
    }

    pub fn is_casting(&self, player: PlayerId) -> bool {
        matches!(self.state(player), PlayerState::Casting { .. })
    }

    /// Starts a cast, or refuses if already casting or on cooldown.
    pub fn request(&mut self, player: PlayerId, current_tick: u64) -> Result<HomeTeleportEvent, Reason> {
        match self.state(player) {
            PlayerState::Casting { .. } => Err(Reason::PlayerBusy),
            PlayerState::Idle { cooldown_until: Some(until) } if current_tick < until => {
                Err(Reason::RateLimited)
            }
            PlayerState::Idle { .. } => {
                self.states.insert(player, PlayerState::Casting { started_tick: current_tick });
                Ok(HomeTeleportEvent::Started { player })
            }
        }
    }

    /// A player-initiated cancel. Silent on the wire; returns whether a cast
    /// was actually in progress.
    pub fn cancel(&mut self, player: PlayerId) -> bool {
        if self.is_casting(player) {
            self.states.insert(player, PlayerState::Idle { cooldown_until: None });
            true
        } else {
            false
        }
    }

    /// Combat or movement breaking an in-progress cast.
    pub fn interrupt(&mut self, player: PlayerId, cause: InterruptCause) -> Option<HomeTeleportEvent> {
        if !self.is_casting(player) {
            return None;
        }
        self.states.insert(player, PlayerState::Idle { cooldown_until: None });
        let reason = match cause {
            InterruptCause::Combat => Reason::InterruptedByCombat,
            InterruptCause::Movement => Reason::InterruptedByMovement,
        };
        Some(HomeTeleportEvent::Failed { player, reason })
    }

    pub fn on_player_disconnect(&mut self, player: PlayerId) {
        self.states.remove(&player);
    }

    /// Completes any cast whose duration has elapsed, starting its cooldown.
    pub fn on_tick(&mut self, current_tick: u64) -> Vec<HomeTeleportEvent> {
        let mut completed = Vec::new();
        for (player, state) in self.states.iter_mut() {
            if let PlayerState::Casting { started_tick } = *state
                && current_tick >= started_tick + self.cast_ticks
            {
                *state = PlayerState::Idle {
                    cooldown_until: Some(current_tick + self.cooldown_ticks),
                };
                completed.push(HomeTeleportEvent::Completed { player: *player });
            }
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cannot_start_a_second_cast_while_casting() {
        let mut mgr = HomeTeleportManager::new();
        let player = PlayerId(1);
        assert!(mgr.request(player, 0).is_ok());
        assert_eq!(mgr.request(player, 1).unwrap_err(), Reason::PlayerBusy);
    }

    #[test]
    fn completes_after_cast_duration_and_enforces_cooldown() {
        let mut mgr = HomeTeleportManager::new();
        let player = PlayerId(1);
        mgr.request(player, 0).unwrap();

        let cast_ticks = secs_to_ticks(HOME_TELEPORT_CAST_SECS);
        let mut events = Vec::new();
        for tick in 1..=cast_ticks {
            events.extend(mgr.on_tick(tick));
        }
        assert!(matches!(events.last(), Some(HomeTeleportEvent::Completed { .. })));

        // Cooldown blocks an immediate retry.
        assert_eq!(mgr.request(player, cast_ticks + 1).unwrap_err(), Reason::RateLimited);
    }

    #[test]
    fn combat_interrupts_an_in_progress_cast() {
        let mut mgr = HomeTeleportManager::new();
        let player = PlayerId(1);
        mgr.request(player, 0).unwrap();
        let event = mgr.interrupt(player, InterruptCause::Combat).unwrap();
        assert!(matches!(
            event,
            HomeTeleportEvent::Failed { reason: Reason::InterruptedByCombat, .. }
        ));
        assert!(!mgr.is_casting(player));
    }

    #[test]
    fn interrupting_an_idle_player_is_a_no_op() {
        let mut mgr = HomeTeleportManager::new();
        assert!(mgr.interrupt(PlayerId(1), InterruptCause::Movement).is_none());
    }
}
