//! Error taxonomy. Recovery is local; this `Reason` enum is what gets
//! attached to a `tradeError`/`showToast`/`homeTeleportFailed` packet so the
//! client always sees a short, stable reason string.

use std::fmt;

/// A business-rule refusal or integrity failure, reported to the player
/// instead of silently mutating state. Validation failures (malformed
/// packet, out-of-range slot) are handled by dropping the packet and are
/// not represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    PlayerOffline,
    PlayerBusy,
    TooFar,
    InterfaceOpen,
    RateLimited,
    NotInTrade,
    ItemChanged,
    UntradeableItem,
    InventoryFullInitiator,
    InventoryFullRecipient,
    ServerError,
    InterruptedByCombat,
    InterruptedByMovement,
}

impl Reason {
    /// The stable `errorCode` string sent to clients.
    pub fn code(self) -> &'static str {
        match self {
            Reason::PlayerOffline => "PLAYER_OFFLINE",
            Reason::PlayerBusy => "PLAYER_BUSY",
            Reason::TooFar => "TOO_FAR",
            Reason::InterfaceOpen => "INTERFACE_OPEN",
            Reason::RateLimited => "RATE_LIMITED",
            Reason::NotInTrade => "NOT_IN_TRADE",
            Reason::ItemChanged => "ITEM_CHANGED",
            Reason::UntradeableItem => "UNTRADEABLE_ITEM",
            Reason::InventoryFullInitiator => "INVENTORY_FULL_INITIATOR",
            Reason::InventoryFullRecipient => "INVENTORY_FULL_RECIPIENT",
            Reason::ServerError => "server_error",
            Reason::InterruptedByCombat => "Interrupted by combat",
            Reason::InterruptedByMovement => "Interrupted by movement",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
