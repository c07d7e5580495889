//! Duels: rules → stakes → final confirm → countdown → fighting →
//! completed/cancelled, with mutual agreement gating every phase
//! transition the same way trading does.
//!
//! The countdown → fighting transition is driven by [`DuelManager::on_tick`]
//! and must run before the action queue is drained within the `Input`
//! bucket, so a duelist can't get a free hit in during the final countdown
//! tick; `world-core`'s tick wiring is responsible for that ordering.

use crate::ids::PlayerId;
use crate::store::ItemStack;
use protocol::names::timing::{DUEL_COUNTDOWN_TICKS, DUEL_DISCONNECT_GRACE_TICKS};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DuelId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Rules,
    Stakes,
    FinalConfirm,
    Countdown,
    Fighting,
}

#[derive(Debug, Clone)]
pub struct DuelSession {
    pub a: PlayerId,
    pub b: PlayerId,
    phase: Phase,
    rules: HashMap<PlayerId, HashSet<String>>,
    stakes: HashMap<PlayerId, Vec<ItemStack>>,
    accepted: HashMap<PlayerId, bool>,
    countdown_ticks_remaining: u64,
    disconnected: Option<(PlayerId, u64)>,
}

impl DuelSession {
    pub fn is_fighting(&self) -> bool {
        self.phase == Phase::Fighting
    }

    pub fn stake_of(&self, player: PlayerId) -> &[ItemStack] {
        self.stakes.get(&player).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub enum DuelEvent {
    CountdownTick { duel: DuelId, ticks_remaining: u64 },
    FightStarted { duel: DuelId },
    Completed {
        duel: DuelId,
        winner: PlayerId,
        loser: PlayerId,
        winner_stake: Vec<ItemStack>,
        loser_stake: Vec<ItemStack>,
        forfeit: bool,
    },
    OpponentDisconnected { duel: DuelId, remaining: PlayerId },
}

#[derive(Default)]
pub struct DuelManager {
    sessions: HashMap<DuelId, DuelSession>,
    player_duel: HashMap<PlayerId, DuelId>,
    next_id: u64,
}

impl DuelManager {
    pub fn new() -> Self {
        DuelManager::default()
    }

    pub fn start(&mut self, a: PlayerId, b: PlayerId) -> DuelId {
        let id = DuelId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(
            id,
            DuelSession {
                a,
                b,
                phase: Phase::Rules,
                rules: HashMap::new(),
                stakes: HashMap::new(),
                accepted: HashMap::new(),
                countdown_ticks_remaining: 0,
                disconnected: None,
            },
        );
        self.player_duel.insert(a, id);
        self.player_duel.insert(b, id);
        id
    }

    pub fn session(&self, duel: DuelId) -> Option<&DuelSession> {
        self.sessions.get(&duel)
    }

    pub fn duel_of(&self, player: PlayerId) -> Option<DuelId> {
        self.player_duel.get(&player).copied()
    }

    fn both_accepted(session: &DuelSession) -> bool {
        *session.accepted.get(&session.a).unwrap_or(&false)
            && *session.accepted.get(&session.b).unwrap_or(&false)
    }

    pub fn toggle_rule(&mut self, duel: DuelId, player: PlayerId, rule: &str) {
        if let Some(session) = self.sessions.get_mut(&duel)
            && session.phase == Phase::Rules
        {
            let rules = session.rules.entry(player).or_default();
            if !rules.remove(rule) {
                rules.insert(rule.to_string());
            }
            session.accepted.clear();
        }
    }

    pub fn accept_rules(&mut self, duel: DuelId, player: PlayerId) -> bool {
        let Some(session) = self.sessions.get_mut(&duel) else { return false };
        if session.phase != Phase::Rules {
            return false;
        }
        session.accepted.insert(player, true);
        if Self::both_accepted(session) {
            session.phase = Phase::Stakes;
            session.accepted.clear();
            true
        } else {
            false
        }
    }

    pub fn set_stake(&mut self, duel: DuelId, player: PlayerId, items: Vec<ItemStack>) {
        if let Some(session) = self.sessions.get_mut(&duel)
            && session.phase == Phase::Stakes
        {
            session.stakes.insert(player, items);
            session.accepted.clear();
        }
    }

    pub fn accept_stakes(&mut self, duel: DuelId, player: PlayerId) -> bool {
        let Some(session) = self.sessions.get_mut(&duel) else { return false };
        if session.phase != Phase::Stakes {
            return false;
        }
        session.accepted.insert(player, true);
        if Self::both_accepted(session) {
            session.phase = Phase::FinalConfirm;
            session.accepted.clear();
            true
        } else {
            false
        }
    }

    /// Starts the countdown once both sides give the final confirm.
    pub fn accept_final(&mut self, duel: DuelId, player: PlayerId) -> bool {
        let Some(session) = self.sessions.get_mut(&duel) else { return false };
        if session.phase != Phase::FinalConfirm {
            return false;
        }
        session.accepted.insert(player, true);
        if Self::both_accepted(session) {
            session.phase = Phase::Countdown;
            session.accepted.clear();
            session.countdown_ticks_remaining = DUEL_COUNTDOWN_TICKS;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self, duel: DuelId) -> Option<DuelSession> {
        let session = self.sessions.remove(&duel)?;
        self.player_duel.remove(&session.a);
        self.player_duel.remove(&session.b);
        Some(session)
    }

    /// One side gives up mid-fight; the other wins by forfeit.
    pub fn forfeit(&mut self, duel: DuelId, forfeiter: PlayerId) -> Option<DuelEvent> {
        let session = self.sessions.get(&duel)?;
        if session.phase != Phase::Fighting {
            return None;
        }
        let winner = if forfeiter == session.a { session.b } else { session.a };
        let winner_stake = session.stake_of(winner).to_vec();
        let loser_stake = session.stake_of(forfeiter).to_vec();
        self.cancel(duel);
        Some(DuelEvent::Completed {
            duel,
            winner,
            loser: forfeiter,
            winner_stake,
            loser_stake,
            forfeit: true,
        })
    }

    /// Advances countdowns and resolves pending disconnect grace periods.
    pub fn on_tick(&mut self, current_tick: u64) -> Vec<DuelEvent> {
        let mut events = Vec::new();
        let mut to_forfeit = Vec::new();

        for (id, session) in self.sessions.iter_mut() {
            if session.phase == Phase::Countdown {
                session.countdown_ticks_remaining = session.countdown_ticks_remaining.saturating_sub(1);
                if session.countdown_ticks_remaining == 0 {
                    session.phase = Phase::Fighting;
                    events.push(DuelEvent::FightStarted { duel: *id });
                } else {
                    events.push(DuelEvent::CountdownTick {
                        duel: *id,
                        ticks_remaining: session.countdown_ticks_remaining,
                    });
                }
            }
            if let Some((disconnected, deadline)) = session.disconnected
                && current_tick >= deadline
            {
                to_forfeit.push((*id, disconnected));
            }
        }

        for (id, disconnected) in to_forfeit {
            if let Some(event) = self.forfeit(id, disconnected) {
                events.push(event);
            }
        }
        events
    }

    /// Pre-fight disconnect cancels outright; mid-fight disconnect starts a
    /// grace period before automatic forfeit.
    pub fn on_player_disconnect(&mut self, player: PlayerId, current_tick: u64) -> Option<DuelEvent> {
        let duel = self.player_duel.get(&player).copied()?;
        let session = self.sessions.get_mut(&duel)?;
        if session.phase != Phase::Fighting {
            self.cancel(duel);
            return None;
        }
        session.disconnected = Some((player, current_tick + DUEL_DISCONNECT_GRACE_TICKS));
        let remaining = if player == session.a { session.b } else { session.a };
        Some(DuelEvent::OpponentDisconnected { duel, remaining })
    }

    pub fn on_player_reconnect(&mut self, player: PlayerId) {
        if let Some(duel) = self.player_duel.get(&player).copied()
            && let Some(session) = self.sessions.get_mut(&duel)
        {
            session.disconnected = None;
        }
    }
}
