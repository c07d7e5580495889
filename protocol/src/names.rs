//! Packet name catalog for the packets the core actually dispatches.
//! Plumbing packets (slash commands, moderation, dev/test commands, the deep
//! bank/store/dialogue business logic) are out of scope; their *session*
//! gating still exists (see `world_core::session`), but their payload
//! handling does not.

/// Timing constants.
pub mod timing {
    /// Wall-clock duration of one tick.
    pub const TICK_MS: u64 = 600;
    /// Pending intents (attack/gather/cook/trade/duelChallenge/follow) time
    /// out after this many ticks (~12s).
    pub const PENDING_INTENT_TIMEOUT_TICKS: u64 = 20;
    /// Home-teleport cast duration.
    pub const HOME_TELEPORT_CAST_SECS: u64 = 10;
    /// Home-teleport cooldown between casts.
    pub const HOME_TELEPORT_COOLDOWN_SECS: u64 = 15 * 60;
    /// Duel countdown length before the fight starts.
    pub const DUEL_COUNTDOWN_TICKS: u64 = 3;
    /// Grace period for a disconnected duelist to reconnect before forfeit.
    pub const DUEL_DISCONNECT_GRACE_TICKS: u64 = 10;
    /// Minimum spacing between reshuffles of PID order.
    pub const PID_RESHUFFLE_MIN_TICKS: u64 = 100;
    /// Maximum spacing between reshuffles of PID order.
    pub const PID_RESHUFFLE_MAX_TICKS: u64 = 150;
    /// Minimum milliseconds between processing (smelt/smith/craft/...) requests.
    pub const PROCESSING_RATE_LIMIT_MS: u64 = 500;
    /// Idempotency window for duel stake settlement.
    pub const DUEL_SETTLEMENT_IDEMPOTENCY_SECS: u64 = 60;
}

/// World/economy constants.
pub mod limits {
    /// Highest assignable PID (inclusive).
    pub const MAX_PID: u16 = 2047;
    /// Inventory slots per player.
    pub const INVENTORY_SLOTS: usize = 28;
    /// Maximum stake entries per duel participant.
    pub const MAX_DUEL_STAKES: usize = 28;
}

/// Client → server packet names (bare form; `on`-prefixed alias also
/// accepted by the router, see `protocol::envelope::canonicalize`).
pub mod client {
    pub const MOVE_REQUEST: &str = "moveRequest";
    pub const ATTACK_MOB: &str = "attackMob";
    pub const ATTACK_PLAYER: &str = "attackPlayer";
    pub const FOLLOW_PLAYER: &str = "followPlayer";
    pub const RESOURCE_INTERACT: &str = "resourceInteract";
    pub const COOKING_SOURCE_INTERACT: &str = "cookingSourceInteract";
    pub const COOKING_REQUEST: &str = "cookingRequest";
    pub const TRADE_REQUEST: &str = "tradeRequest";
    pub const TRADE_REQUEST_RESPOND: &str = "tradeRequestRespond";
    pub const TRADE_ADD_ITEM: &str = "tradeAddItem";
    pub const TRADE_REMOVE_ITEM: &str = "tradeRemoveItem";
    pub const TRADE_SET_ITEM_QUANTITY: &str = "tradeSetItemQuantity";
    pub const TRADE_ACCEPT: &str = "tradeAccept";
    pub const TRADE_CANCEL_ACCEPT: &str = "tradeCancelAccept";
    pub const TRADE_CANCEL: &str = "tradeCancel";
    pub const DUEL_CHALLENGE: &str = "duel:challenge";
    pub const DUEL_RESPOND: &str = "duel:respond";
    pub const DUEL_TOGGLE_RULE: &str = "duel:toggle:rule";
    pub const DUEL_TOGGLE_EQUIPMENT: &str = "duel:toggle:equipment";
    pub const DUEL_ACCEPT_RULES: &str = "duel:accept:rules";
    pub const DUEL_ADD_STAKE: &str = "duel:add:stake";
    pub const DUEL_REMOVE_STAKE: &str = "duel:remove:stake";
    pub const DUEL_ACCEPT_STAKES: &str = "duel:accept:stakes";
    pub const DUEL_ACCEPT_FINAL: &str = "duel:accept:final";
    pub const DUEL_CANCEL: &str = "duel:cancel";
    pub const DUEL_FORFEIT: &str = "duel:forfeit";
    pub const HOME_TELEPORT: &str = "homeTeleport";
    pub const HOME_TELEPORT_CANCEL: &str = "homeTeleportCancel";
    pub const CHARACTER_LIST_REQUEST: &str = "characterListRequest";
    pub const CHARACTER_CREATE: &str = "characterCreate";
    pub const CHARACTER_SELECTED: &str = "characterSelected";
    pub const ENTER_WORLD: &str = "enterWorld";
    pub const CLIENT_READY: &str = "clientReady";
    pub const REQUEST_RESPAWN: &str = "requestRespawn";
    pub const BANK_OPEN: &str = "bankOpen";
    pub const BANK_CLOSE: &str = "bankClose";
    pub const STORE_OPEN: &str = "storeOpen";
    pub const STORE_CLOSE: &str = "storeClose";
    pub const DIALOGUE_CLOSE: &str = "dialogueClose";
}

/// Server → client packet names.
pub mod server {
    pub const ENTITY_ADDED: &str = "entityAdded";
    pub const ENTITY_MODIFIED: &str = "entityModified";
    pub const ENTITY_REMOVED: &str = "entityRemoved";
    pub const CHAT_ADDED: &str = "chatAdded";
    pub const TILE_MOVEMENT_START: &str = "tileMovementStart";
    pub const PLAYER_TELEPORT: &str = "playerTeleport";
    pub const SHOW_TOAST: &str = "showToast";
    pub const TRADE_INCOMING: &str = "tradeIncoming";
    pub const TRADE_STARTED: &str = "tradeStarted";
    pub const TRADE_UPDATED: &str = "tradeUpdated";
    pub const TRADE_CONFIRM_SCREEN: &str = "tradeConfirmScreen";
    pub const TRADE_COMPLETED: &str = "tradeCompleted";
    pub const TRADE_CANCELLED: &str = "tradeCancelled";
    pub const TRADE_ERROR: &str = "tradeError";
    pub const DUEL_CHALLENGE_INCOMING: &str = "duelChallengeIncoming";
    pub const DUEL_STARTED: &str = "duelStarted";
    pub const DUEL_RULES_UPDATED: &str = "duelRulesUpdated";
    pub const DUEL_STAKES_UPDATED: &str = "duelStakesUpdated";
    pub const DUEL_CONFIRM_SCREEN: &str = "duelConfirmScreen";
    pub const DUEL_CANCELLED: &str = "duelCancelled";
    pub const DUEL_COUNTDOWN_START: &str = "duelCountdownStart";
    pub const DUEL_COUNTDOWN_TICK: &str = "duelCountdownTick";
    pub const DUEL_FIGHT_START: &str = "duelFightStart";
    pub const DUEL_COMPLETED: &str = "duelCompleted";
    pub const DUEL_OPPONENT_DISCONNECTED: &str = "duelOpponentDisconnected";
    pub const DUEL_OPPONENT_RECONNECTED: &str = "duelOpponentReconnected";
    pub const HOME_TELEPORT_START: &str = "homeTeleportStart";
    pub const HOME_TELEPORT_FAILED: &str = "homeTeleportFailed";
    pub const KICK: &str = "kick";
}
