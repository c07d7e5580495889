//! Per-player exclusive interaction session.
//!
//! "Opening a new one closes the prior" is modeled as an explicit enum with
//! transition helpers rather than ad-hoc booleans.

use crate::ids::PlayerId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Bank,
    Store,
    Dialogue,
    Trade,
    Duel,
}

#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub kind: SessionKind,
    pub peer: Option<PlayerId>,
    pub opened_tick: u64,
}

/// Emitted when a session is force-closed by a newer one opening.
#[derive(Debug, Clone, Copy)]
pub struct SessionClosed {
    pub player: PlayerId,
    pub kind: SessionKind,
}

#[derive(Default)]
pub struct InteractionSessionManager {
    sessions: HashMap<PlayerId, Session>,
}

impl InteractionSessionManager {
    pub fn new() -> Self {
        InteractionSessionManager::default()
    }

    pub fn has_active(&self, player: PlayerId) -> bool {
        self.sessions.contains_key(&player)
    }

    pub fn active(&self, player: PlayerId) -> Option<Session> {
        self.sessions.get(&player).copied()
    }

    /// Opens a session, closing (and returning) any prior one.
    pub fn open(
        &mut self,
        player: PlayerId,
        kind: SessionKind,
        peer: Option<PlayerId>,
        current_tick: u64,
    ) -> Option<SessionClosed> {
        let previous = self.sessions.insert(
            player,
            Session {
                kind,
                peer,
                opened_tick: current_tick,
            },
        );
        previous.map(|prev| SessionClosed {
            player,
            kind: prev.kind,
        })
    }

    pub fn close(&mut self, player: PlayerId) -> Option<Session> {
        self.sessions.remove(&player)
    }

    pub fn on_player_disconnect(&mut self, player: PlayerId) {
        self.sessions.remove(&player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_a_new_session_closes_the_prior() {
        let mut mgr = InteractionSessionManager::new();
        let player = PlayerId(1);
        mgr.open(player, SessionKind::Bank, None, 0);
        let closed = mgr.open(player, SessionKind::Store, None, 1);
        assert!(matches!(closed, Some(SessionClosed { kind: SessionKind::Bank, .. })));
        assert_eq!(mgr.active(player).unwrap().kind, SessionKind::Store);
    }

    #[test]
    fn at_most_one_active_session() {
        let mut mgr = InteractionSessionManager::new();
        let player = PlayerId(1);
        assert!(!mgr.has_active(player));
        mgr.open(player, SessionKind::Dialogue, None, 0);
        assert!(mgr.has_active(player));
        mgr.close(player);
        assert!(!mgr.has_active(player));
    }
}
