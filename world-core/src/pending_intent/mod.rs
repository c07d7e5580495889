//! Pending player intents: attack/gather/cook/trade/duelChallenge/follow
//! all share one shape — a requester, a payload identifying what they asked
//! for, and a timeout — so they're modeled as one generic manager rather
//! than six near-identical structs, the way the generic
//! `BackEndArchitecture<ServerRpcPayload, DeltaInformation, ViewState>`
//! parameterizes over payload shape instead of duplicating the trait per
//! game.

use crate::ids::PlayerId;
use protocol::names::timing::PENDING_INTENT_TIMEOUT_TICKS;
use std::collections::HashMap;

/// Marker for a pending-intent payload kind. No behavior is required of it;
/// this only documents intent at call sites and bounds the generic manager.
pub trait IntentKind: Clone {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackIntent {
    pub mob_id: u64,
}
impl IntentKind for AttackIntent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatherIntent {
    pub resource_id: u64,
}
impl IntentKind for GatherIntent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookIntent {
    pub source_id: u64,
    pub fish_slot: i32,
}
impl IntentKind for CookIntent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeIntent {
    pub recipient: PlayerId,
}
impl IntentKind for TradeIntent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuelChallengeIntent {
    pub opponent: PlayerId,
}
impl IntentKind for DuelChallengeIntent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowIntent {
    pub target: PlayerId,
}
impl IntentKind for FollowIntent {}

#[derive(Debug, Clone, Copy)]
struct Entry<K> {
    payload: K,
    created_tick: u64,
}

/// One requester may have at most one pending intent of a given kind at a
/// time; proposing a new one replaces the old.
pub struct PendingIntentManager<K: IntentKind> {
    entries: HashMap<PlayerId, Entry<K>>,
    timeout_ticks: u64,
}

impl<K: IntentKind> Default for PendingIntentManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: IntentKind> PendingIntentManager<K> {
    pub fn new() -> Self {
        PendingIntentManager {
            entries: HashMap::new(),
            timeout_ticks: PENDING_INTENT_TIMEOUT_TICKS,
        }
    }

    pub fn propose(&mut self, requester: PlayerId, payload: K, current_tick: u64) {
        self.entries.insert(requester, Entry { payload, created_tick: current_tick });
    }

    pub fn get(&self, requester: PlayerId) -> Option<&K> {
        self.entries.get(&requester).map(|e| &e.payload)
    }

    pub fn take(&mut self, requester: PlayerId) -> Option<K> {
        self.entries.remove(&requester).map(|e| e.payload)
    }

    pub fn clear(&mut self, requester: PlayerId) {
        self.entries.remove(&requester);
    }

    /// Removes and returns the requesters whose intent has aged past the
    /// timeout, so the caller can emit a timeout notification per kind.
    pub fn on_tick(&mut self, current_tick: u64) -> Vec<PlayerId> {
        let expired: Vec<PlayerId> = self
            .entries
            .iter()
            .filter(|(_, entry)| current_tick >= entry.created_tick + self.timeout_ticks)
            .map(|(player, _)| *player)
            .collect();
        for player in &expired {
            self.entries.remove(player);
        }
        expired
    }
}
