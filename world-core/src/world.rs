//! `World` ties every subsystem together and drives one tick end to end.
//!
//! Subsystem order within a tick follows the five priority buckets; the one
//! cross-module ordering requirement that doesn't fall naturally out of that
//! (duel countdown must resolve before the action queue drains, so nobody
//! gets a free hit in on the final countdown tick) is enforced explicitly at
//! the top of [`World::run_tick`] rather than left to registration order.

use crate::action_queue::{ActionQueue, NonMovementAction};
use crate::aoi::AoiManager;
use crate::broadcast::{BroadcastManager, OutboundSink};
use crate::collaborators::{AlwaysAcceptAuth, AuthProvider, FlatTerrain, ItemCatalog, PermissiveItemCatalog, TerrainHeightProvider};
use crate::duel::{DuelEvent, DuelManager};
use crate::economy::{self, IdempotencyGuard, TransactionOutcome};
use crate::event_bridge::{self, WorldEvent};
use crate::home_teleport::HomeTeleportManager;
use crate::ids::{EntityId, PlayerId, SocketId};
use crate::pending_intent::{
    AttackIntent, CookIntent, DuelChallengeIntent, FollowIntent, GatherIntent,
    PendingIntentManager, TradeIntent,
};
use crate::pid::PidManager;
use crate::rate_limit::RateLimiter;
use crate::session::InteractionSessionManager;
use crate::socket_manager::SocketManager;
use crate::store::Store;
use crate::tick::TickScheduler;
use crate::tile_movement::{AttackType, TileMovementManager};
use crate::trading::TradeManager;
use protocol::names::timing::{
    DUEL_DISCONNECT_GRACE_TICKS, DUEL_SETTLEMENT_IDEMPOTENCY_SECS, PROCESSING_RATE_LIMIT_MS, TICK_MS,
};
use protocol::{events, names, Envelope};
use std::sync::Arc;

fn secs_to_ticks(secs: u64) -> u64 {
    (secs * 1000).div_ceil(TICK_MS)
}

/// The authoritative simulation: every manager plus the glue that drives
/// them forward together, one tick at a time.
pub struct World {
    pub scheduler: TickScheduler,
    pub actions: ActionQueue,
    pub movement: TileMovementManager,
    pub aoi: AoiManager,
    pub broadcast: BroadcastManager,
    pub sockets: SocketManager,
    pub sessions: InteractionSessionManager,
    pub home_teleport: HomeTeleportManager,
    pub trades: TradeManager,
    pub duels: DuelManager,
    pub pid: PidManager,
    pub attack_intents: PendingIntentManager<AttackIntent>,
    pub gather_intents: PendingIntentManager<GatherIntent>,
    pub cook_intents: PendingIntentManager<CookIntent>,
    pub trade_intents: PendingIntentManager<TradeIntent>,
    pub duel_challenge_intents: PendingIntentManager<DuelChallengeIntent>,
    pub follow_intents: PendingIntentManager<FollowIntent>,
    pub store: Arc<dyn Store>,
    pub catalog: Arc<dyn ItemCatalog>,
    pub auth: Arc<dyn AuthProvider>,
    pub terrain: Arc<dyn TerrainHeightProvider>,
    pub processing_limiter: RateLimiter,
    idempotency: IdempotencyGuard,
}

impl World {
    pub fn new(pid_seed: u64, store: Arc<dyn Store>) -> Self {
        World::with_env(pid_seed, store, &crate::config::EnvConfig::from_env())
    }

    pub fn with_env(pid_seed: u64, store: Arc<dyn Store>, env: &crate::config::EnvConfig) -> Self {
        World {
            scheduler: TickScheduler::new(),
            actions: ActionQueue::new(),
            movement: TileMovementManager::new(),
            aoi: AoiManager::with_defaults(),
            broadcast: BroadcastManager::new(),
            sockets: SocketManager::new(
                std::time::Duration::from_secs(env.ws_ping_interval_secs),
                std::time::Duration::from_millis(env.ws_ping_grace_ms),
                env.ws_ping_miss_tolerance,
            ),
            sessions: InteractionSessionManager::new(),
            home_teleport: HomeTeleportManager::new(),
            trades: TradeManager::new(),
            duels: DuelManager::new(),
            pid: PidManager::new(pid_seed),
            attack_intents: PendingIntentManager::new(),
            gather_intents: PendingIntentManager::new(),
            cook_intents: PendingIntentManager::new(),
            trade_intents: PendingIntentManager::new(),
            duel_challenge_intents: PendingIntentManager::new(),
            follow_intents: PendingIntentManager::new(),
            store,
            catalog: Arc::new(PermissiveItemCatalog),
            auth: Arc::new(AlwaysAcceptAuth),
            terrain: Arc::new(FlatTerrain),
            processing_limiter: RateLimiter::new(std::time::Duration::from_millis(PROCESSING_RATE_LIMIT_MS)),
            idempotency: IdempotencyGuard::new(secs_to_ticks(DUEL_SETTLEMENT_IDEMPOTENCY_SECS)),
        }
    }

    /// Brings a freshly-connected player into the simulation: PID
    /// assignment, broadcast routing, and liveness tracking.
    pub fn register_player(&mut self, player: PlayerId, socket: SocketId, spawn: (i32, i32)) {
        self.pid.assign(player);
        self.broadcast.register_player(player, socket);
        self.sockets.register(socket, std::time::Instant::now());
        self.movement.sync_player_position(EntityId::Player(player), spawn);
        self.aoi.update_entity_position(EntityId::Player(player), spawn.0 as f32, spawn.1 as f32);
    }

    /// Tears a player out of every subsystem that was tracking them.
    pub fn remove_player(&mut self, player: PlayerId, socket: SocketId) {
        self.pid.release(player);
        self.broadcast.unregister_player(player);
        self.sockets.remove(socket);
        self.aoi.on_player_disconnect(socket);
        self.aoi.remove_entity(EntityId::Player(player));
        self.movement.cleanup(EntityId::Player(player));
        self.actions.clear(player);
        self.sessions.on_player_disconnect(player);
        self.home_teleport.on_player_disconnect(player);
        self.trades.on_player_disconnect(player);
        self.processing_limiter.on_player_disconnect(player);
        let tick = self.scheduler.current_tick();
        self.duels.on_player_disconnect(player, tick);
    }

    /// Queues a plain walk request; melee/ranged movement driven by an
    /// attack intent goes through [`World::dispatch_non_movement`] instead.
    pub fn request_move(&mut self, player: PlayerId, target: (i32, i32), running: bool) {
        self.actions.queue_movement(
            player,
            crate::action_queue::MovementAction {
                target_x: target.0,
                target_z: target.1,
                running,
            },
        );
    }

    pub fn queue_action(&mut self, player: PlayerId, action: NonMovementAction) {
        self.actions.queue_non_movement(player, action);
    }

    fn dispatch_non_movement(&mut self, player: PlayerId, action: NonMovementAction) {
        let tick = self.scheduler.current_tick();
        let mut walk_up_to = None;
        match action {
            NonMovementAction::AttackMob { mob_id } => {
                self.attack_intents.propose(player, AttackIntent { mob_id }, tick);
                walk_up_to = self.movement.tile_of(EntityId::Mob(crate::ids::MobId(mob_id)));
            }
            NonMovementAction::AttackPlayer { target } => {
                walk_up_to = self.movement.tile_of(EntityId::Player(target));
            }
            NonMovementAction::Gather { resource_id } => {
                self.gather_intents.propose(player, GatherIntent { resource_id }, tick);
            }
            NonMovementAction::Cook { source_id, fish_slot } => {
                self.cook_intents.propose(player, CookIntent { source_id, fish_slot }, tick);
            }
            NonMovementAction::FollowPlayer { target } => {
                self.follow_intents.propose(player, FollowIntent { target }, tick);
                walk_up_to = self.movement.tile_of(EntityId::Player(target));
            }
        }

        if let Some(tile) = walk_up_to {
            self.movement.move_toward(EntityId::Player(player), tile, false, 1, AttackType::Melee);
        }
    }

    /// Runs every subsystem through exactly one tick, in priority-bucket
    /// order, and applies any economic transactions the tick produced.
    pub async fn run_tick(&mut self) {
        self.scheduler.run_tick();
        let tick = self.scheduler.current_tick();

        // Input: duel countdown resolves before the action queue drains.
        let duel_events = self.duels.on_tick(tick);
        for event in &duel_events {
            self.handle_duel_event(event).await;
        }

        for player in self.pid.processing_order() {
            let (movement, non_movement) = self.actions.drain(player);
            if let Some(action) = movement {
                self.movement.move_toward(
                    EntityId::Player(player),
                    (action.target_x, action.target_z),
                    action.running,
                    0,
                    AttackType::Melee,
                );
            }
            if let Some(action) = non_movement {
                self.dispatch_non_movement(player, action);
            }
        }

        // Movement
        self.movement.on_tick();
        for moved in self.movement.drain_events() {
            if let EntityId::Player(player) = moved.entity
                && let Some(tile) = self.movement.tile_of(moved.entity)
            {
                self.aoi.update_entity_position(moved.entity, tile.0 as f32, tile.1 as f32);
                if let Some(socket) = self.broadcast.player_socket(player) {
                    self.aoi.update_player_subscriptions(tile.0 as f32, tile.1 as f32, socket);
                }
            }
            event_bridge::dispatch(
                WorldEvent::MovementStarted(moved),
                &mut self.broadcast,
                &self.aoi,
            );
        }

        // Combat / Resources: intent timeouts sweep here; actual damage and
        // yield resolution is driven by the caller's game-rules layer, which
        // consumes `take()`d intents once range/adjacency is satisfied.
        for player in self.attack_intents.on_tick(tick) {
            self.actions.clear(player);
        }
        self.gather_intents.on_tick(tick);
        self.cook_intents.on_tick(tick);
        self.trade_intents.on_tick(tick);
        self.duel_challenge_intents.on_tick(tick);
        self.follow_intents.on_tick(tick);

        // Post
        for event in self.home_teleport.on_tick(tick) {
            event_bridge::dispatch(
                home_teleport_to_world_event(event),
                &mut self.broadcast,
                &self.aoi,
            );
        }
        self.pid.on_tick(tick);
        self.idempotency.sweep(tick);
    }

    /// Converts a duel state-machine event into the matching wire packet(s)
    /// and, for a completion, drives the idempotency-guarded settlement.
    pub async fn handle_duel_event(&mut self, event: &DuelEvent) {
        match event {
            DuelEvent::CountdownTick { duel, ticks_remaining } => {
                if let Some(session) = self.duels.session(*duel) {
                    let (a, b) = (session.a, session.b);
                    let envelope = Envelope::new(
                        names::server::DUEL_COUNTDOWN_TICK,
                        events::DuelCountdownTick { ticks_remaining: *ticks_remaining },
                    );
                    self.broadcast.send_to_player(a, envelope.clone());
                    self.broadcast.send_to_player(b, envelope);
                }
            }
            DuelEvent::FightStarted { duel } => {
                if let Some(session) = self.duels.session(*duel) {
                    let (a, b) = (session.a, session.b);
                    let envelope = Envelope::new(names::server::DUEL_FIGHT_START, serde_json::Value::Null);
                    self.broadcast.send_to_player(a, envelope.clone());
                    self.broadcast.send_to_player(b, envelope);
                }
            }
            DuelEvent::OpponentDisconnected { remaining, .. } => {
                let envelope = Envelope::new(
                    names::server::DUEL_OPPONENT_DISCONNECTED,
                    events::DuelOpponentDisconnected {
                        timeout_ms: DUEL_DISCONNECT_GRACE_TICKS * TICK_MS,
                    },
                );
                self.broadcast.send_to_player(*remaining, envelope);
            }
            DuelEvent::Completed { winner, loser, winner_stake: _, loser_stake, forfeit, .. } => {
                let key = IdempotencyGuard::key(*winner, *loser);
                let tick = self.scheduler.current_tick();
                if !self.idempotency.check_and_record(key, tick) {
                    return;
                }
                let outcome = economy::settle_duel_stakes(
                    self.store.as_ref(),
                    self.catalog.as_ref(),
                    *winner,
                    *loser,
                    loser_stake.clone(),
                )
                .await;
                self.report_settlement(outcome);

                let as_pairs = |items: &[crate::store::ItemStack]| {
                    items.iter().map(|i| (i.item_id, i.quantity)).collect::<Vec<_>>()
                };
                let won = events::DuelCompleted {
                    items_received: as_pairs(loser_stake),
                    items_lost: Vec::new(),
                    total_value_won: 0,
                    total_value_lost: 0,
                    forfeit: *forfeit,
                };
                let lost = events::DuelCompleted {
                    items_received: Vec::new(),
                    items_lost: as_pairs(loser_stake),
                    total_value_won: 0,
                    total_value_lost: 0,
                    forfeit: *forfeit,
                };
                self.broadcast
                    .send_to_player(*winner, Envelope::new(names::server::DUEL_COMPLETED, won));
                self.broadcast
                    .send_to_player(*loser, Envelope::new(names::server::DUEL_COMPLETED, lost));
            }
        }
    }

    /// Announces the start of a duel's countdown, once both sides give the
    /// final confirm. Separate from [`World::handle_duel_event`] because
    /// `DuelManager::accept_final` reports the transition synchronously
    /// rather than through [`DuelEvent`].
    pub fn duel_countdown_started(&mut self, a: PlayerId, b: PlayerId, ticks_remaining: u64) {
        let envelope = Envelope::new(
            names::server::DUEL_COUNTDOWN_START,
            events::DuelCountdownTick { ticks_remaining },
        );
        self.broadcast.send_to_player(a, envelope.clone());
        self.broadcast.send_to_player(b, envelope);
    }

    /// A player voluntarily forfeits their ongoing duel.
    pub async fn forfeit_duel(&mut self, duel: crate::duel::DuelId, forfeiter: PlayerId) {
        if let Some(event) = self.duels.forfeit(duel, forfeiter) {
            self.handle_duel_event(&event).await;
        }
    }

    fn report_settlement(&mut self, outcome: TransactionOutcome) {
        match outcome {
            TransactionOutcome::Applied => {}
            TransactionOutcome::PartialDropped { player, .. } => {
                event_bridge::dispatch(
                    WorldEvent::Toast {
                        player,
                        message: "Your bank was full; some items were lost.".into(),
                        error_code: Some("BANK_OVERFLOW".into()),
                    },
                    &mut self.broadcast,
                    &self.aoi,
                );
            }
            TransactionOutcome::Rejected(reason) => {
                tracing::warn!(%reason, "economic settlement rejected");
            }
            TransactionOutcome::Failed(err) => {
                tracing::error!(%err, "economic settlement failed");
            }
        }
    }

    /// Delivers everything queued by this tick to the transport layer.
    pub fn flush(&mut self, sink: &mut impl OutboundSink) {
        self.broadcast.flush(sink);
    }
}

fn home_teleport_to_world_event(event: crate::home_teleport::HomeTeleportEvent) -> WorldEvent {
    use crate::home_teleport::HomeTeleportEvent as E;
    match event {
        E::Started { player } => {
            WorldEvent::Toast { player, message: "Teleporting home...".into(), error_code: None }
        }
        E::Completed { player } => {
            WorldEvent::Toast { player, message: "Teleported home.".into(), error_code: None }
        }
        E::Failed { player, reason } => WorldEvent::Toast {
            player,
            message: "Home teleport interrupted.".into(),
            error_code: Some(reason.code().to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn move_request_advances_position_over_ticks() {
        let mut world = World::new(1, Arc::new(InMemoryStore::new()));
        let player = PlayerId(1);
        world.register_player(player, SocketId(1), (0, 0));
        world.request_move(player, (3, 0), false);

        for _ in 0..5 {
            world.run_tick().await;
        }

        assert_eq!(world.movement.tile_of(EntityId::Player(player)), Some((3, 0)));
    }

    #[tokio::test]
    async fn forfeit_transfers_the_actual_staked_items_to_the_winner() {
        use crate::store::ItemStack;

        let store = Arc::new(InMemoryStore::new());
        let mut world = World::new(1, store);
        let (a, b) = (PlayerId(1), PlayerId(2));
        world.register_player(a, SocketId(1), (0, 0));
        world.register_player(b, SocketId(2), (0, 0));
        world.store.set_inventory(a, vec![Some(ItemStack { item_id: 995, quantity: 10 })]).await.unwrap();
        world.store.set_inventory(b, vec![Some(ItemStack { item_id: 995, quantity: 15 })]).await.unwrap();

        let duel = world.duels.start(a, b);
        world.duels.accept_rules(duel, a);
        world.duels.accept_rules(duel, b);
        world.duels.set_stake(duel, a, vec![ItemStack { item_id: 995, quantity: 10 }]);
        world.duels.set_stake(duel, b, vec![ItemStack { item_id: 995, quantity: 15 }]);
        world.duels.accept_stakes(duel, a);
        world.duels.accept_stakes(duel, b);
        world.duels.accept_final(duel, a);
        world.duels.accept_final(duel, b);
        for tick in 1..=protocol::names::timing::DUEL_COUNTDOWN_TICKS {
            let events = world.duels.on_tick(tick);
            for event in &events {
                world.handle_duel_event(event).await;
            }
        }

        world.forfeit_duel(duel, b).await;

        assert_eq!(
            world.store.get_inventory(a).await.unwrap()[0],
            Some(ItemStack { item_id: 995, quantity: 25 }),
        );
    }

    #[tokio::test]
    async fn duel_completion_settles_exactly_once_under_a_duplicate_event() {
        let store = Arc::new(InMemoryStore::new());
        let mut world = World::new(1, store);
        let (a, b) = (PlayerId(1), PlayerId(2));
        world.register_player(a, SocketId(1), (0, 0));
        world.register_player(b, SocketId(2), (0, 0));

        let duel = world.duels.start(a, b);
        let event = DuelEvent::Completed {
            duel,
            winner: a,
            loser: b,
            winner_stake: Vec::new(),
            loser_stake: Vec::new(),
            forfeit: false,
        };
        world.handle_duel_event(&event).await;
        world.handle_duel_event(&event).await;

        let key = IdempotencyGuard::key(a, b);
        assert!(!world.idempotency.check_and_record(key, world.scheduler.current_tick()));
    }
}
