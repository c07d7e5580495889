//! Per-player movement/non-movement action buffer.
//!
//! Only the last click of a kind matters within a tick, so each player gets
//! exactly one movement slot and one non-movement slot rather than an
//! unbounded queue.

use crate::ids::PlayerId;
use std::collections::HashMap;

/// A queued movement request, dispatched to tile movement at `Input`.
#[derive(Debug, Clone)]
pub struct MovementAction {
    pub target_x: i32,
    pub target_z: i32,
    pub running: bool,
}

/// A queued non-movement action (combat/interaction), dispatched to its
/// handler at `Input`.
#[derive(Debug, Clone)]
pub enum NonMovementAction {
    AttackMob { mob_id: u64 },
    AttackPlayer { target: PlayerId },
    Gather { resource_id: u64 },
    Cook { source_id: u64, fish_slot: i32 },
    FollowPlayer { target: PlayerId },
}

#[derive(Default)]
struct Slots {
    movement: Option<MovementAction>,
    non_movement: Option<NonMovementAction>,
}

/// Holds the two-slot buffer for every player currently in the world.
#[derive(Default)]
pub struct ActionQueue {
    slots: HashMap<PlayerId, Slots>,
}

impl ActionQueue {
    pub fn new() -> Self {
        ActionQueue::default()
    }

    /// A newer write overwrites any older one in the same slot.
    pub fn queue_movement(&mut self, player: PlayerId, action: MovementAction) {
        self.slots.entry(player).or_default().movement = Some(action);
    }

    pub fn queue_non_movement(&mut self, player: PlayerId, action: NonMovementAction) {
        self.slots.entry(player).or_default().non_movement = Some(action);
    }

    /// Drains both slots for `player`, clearing them. Called once per
    /// player at the `Input` phase of every tick.
    pub fn drain(&mut self, player: PlayerId) -> (Option<MovementAction>, Option<NonMovementAction>) {
        match self.slots.get_mut(&player) {
            Some(slots) => (slots.movement.take(), slots.non_movement.take()),
            None => (None, None),
        }
    }

    /// Drops all queued actions for a player (disconnect/teleport/respawn).
    pub fn clear(&mut self, player: PlayerId) {
        self.slots.remove(&player);
    }
}
