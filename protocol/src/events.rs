//! Payload shapes for the server → client packets the core emits.
//! Small, derive-only structs, one per outgoing packet.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAdded {
    pub entity_id: u64,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRemoved {
    pub entity_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileMovementStart {
    pub entity_id: u64,
    pub path: Vec<(i32, i32)>,
    pub running: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerTeleport {
    pub player_id: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowToast {
    pub message: String,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAdded {
    pub message: String,
    pub pink: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeError {
    pub error_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelCountdownTick {
    pub ticks_remaining: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelCompleted {
    pub items_received: Vec<(u32, u32)>,
    pub items_lost: Vec<(u32, u32)>,
    pub total_value_won: u64,
    pub total_value_lost: u64,
    pub forfeit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelOpponentDisconnected {
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeTeleportFailed {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kick {
    pub reason: String,
}
