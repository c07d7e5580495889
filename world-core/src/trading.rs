//! Player-to-player trading: offer screen, then a confirm screen, both
//! requiring mutual agreement before anything changes hands.
//!
//! Mutating either side's offer resets both players' acceptance — a
//! changed offer is a new offer, so anyone who already accepted has to
//! look at it again.

use crate::ids::PlayerId;
use crate::store::ItemStack;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TradeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TradePhase {
    Offering,
    Confirming,
}

#[derive(Debug, Clone)]
pub struct TradeSession {
    pub a: PlayerId,
    pub b: PlayerId,
    offers: HashMap<PlayerId, Vec<ItemStack>>,
    accepted: HashMap<PlayerId, bool>,
    phase: TradePhase,
}

impl TradeSession {
    pub fn offer(&self, player: PlayerId) -> &[ItemStack] {
        self.offers.get(&player).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_confirming(&self) -> bool {
        self.phase == TradePhase::Confirming
    }
}

/// Emitted when both participants confirm on the second screen; the caller
/// (economy settlement) owns actually moving the items.
#[derive(Debug, Clone)]
pub struct TradeReady {
    pub trade: TradeId,
    pub a: PlayerId,
    pub a_offer: Vec<ItemStack>,
    pub b: PlayerId,
    pub b_offer: Vec<ItemStack>,
}

#[derive(Default)]
pub struct TradeManager {
    sessions: HashMap<TradeId, TradeSession>,
    player_trade: HashMap<PlayerId, TradeId>,
    next_id: u64,
}

impl TradeManager {
    pub fn new() -> Self {
        TradeManager::default()
    }

    pub fn start(&mut self, a: PlayerId, b: PlayerId) -> TradeId {
        let id = TradeId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(
            id,
            TradeSession {
                a,
                b,
                offers: HashMap::new(),
                accepted: HashMap::new(),
                phase: TradePhase::Offering,
            },
        );
        self.player_trade.insert(a, id);
        self.player_trade.insert(b, id);
        id
    }

    pub fn session(&self, trade: TradeId) -> Option<&TradeSession> {
        self.sessions.get(&trade)
    }

    pub fn trade_of(&self, player: PlayerId) -> Option<TradeId> {
        self.player_trade.get(&player).copied()
    }

    fn reset_acceptance(session: &mut TradeSession) {
        session.accepted.clear();
        session.phase = TradePhase::Offering;
    }

    /// Replaces `player`'s full offer and resets both sides' acceptance.
    pub fn set_offer(&mut self, trade: TradeId, player: PlayerId, items: Vec<ItemStack>) {
        if let Some(session) = self.sessions.get_mut(&trade) {
            session.offers.insert(player, items);
            Self::reset_acceptance(session);
        }
    }

    /// First-screen accept. Once both sides have accepted, advances to the
    /// confirm screen and resets acceptance for the new screen.
    pub fn accept(&mut self, trade: TradeId, player: PlayerId) -> bool {
        let Some(session) = self.sessions.get_mut(&trade) else { return false };
        session.accepted.insert(player, true);
        let both_accepted = *session.accepted.get(&session.a).unwrap_or(&false)
            && *session.accepted.get(&session.b).unwrap_or(&false);
        if both_accepted {
            session.phase = TradePhase::Confirming;
            session.accepted.clear();
        }
        both_accepted
    }

    pub fn cancel_accept(&mut self, trade: TradeId, player: PlayerId) {
        if let Some(session) = self.sessions.get_mut(&trade) {
            session.accepted.insert(player, false);
        }
    }

    /// Second-screen confirm. Returns `TradeReady` (and removes the
    /// session) once both sides have confirmed.
    pub fn confirm(&mut self, trade: TradeId, player: PlayerId) -> Option<TradeReady> {
        let session = self.sessions.get_mut(&trade)?;
        if session.phase != TradePhase::Confirming {
            return None;
        }
        session.accepted.insert(player, true);
        let both_confirmed = *session.accepted.get(&session.a).unwrap_or(&false)
            && *session.accepted.get(&session.b).unwrap_or(&false);
        if !both_confirmed {
            return None;
        }
        let session = self.sessions.remove(&trade)?;
        self.player_trade.remove(&session.a);
        self.player_trade.remove(&session.b);
        Some(TradeReady {
            trade,
            a: session.a,
            a_offer: session.offers.get(&session.a).cloned().unwrap_or_default(),
            b: session.b,
            b_offer: session.offers.get(&session.b).cloned().unwrap_or_default(),
        })
    }

    pub fn cancel(&mut self, trade: TradeId) -> Option<TradeSession> {
        let session = self.sessions.remove(&trade)?;
        self.player_trade.remove(&session.a);
        self.player_trade.remove(&session.b);
        Some(session)
    }

    pub fn on_player_disconnect(&mut self, player: PlayerId) -> Option<TradeSession> {
        let trade = self.player_trade.get(&player).copied()?;
        self.cancel(trade)
    }
}
