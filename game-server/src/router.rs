//! Packet router: canonicalizes the incoming envelope name and dispatches
//! it to the matching `World` operation.

use protocol::{envelope::canonicalize, events, names, Envelope};
use serde::Deserialize;
use serde_json::json;
use world_core::ids::PlayerId;
use world_core::session::SessionKind;
use world_core::store::ItemStack;
use world_core::world::World;

#[derive(Deserialize)]
struct MoveRequest {
    x: i32,
    z: i32,
    #[serde(default)]
    running: bool,
}

#[derive(Deserialize)]
struct AttackMob {
    #[serde(rename = "mobId")]
    mob_id: u64,
}

#[derive(Deserialize)]
struct TargetPlayer {
    target: u64,
}

#[derive(Deserialize)]
struct ResourceInteract {
    #[serde(rename = "resourceId")]
    resource_id: u64,
}

#[derive(Deserialize)]
struct CookingSourceInteract {
    #[serde(rename = "sourceId")]
    source_id: u64,
}

#[derive(Deserialize)]
struct CookingRequest {
    #[serde(rename = "sourceId")]
    source_id: u64,
    #[serde(rename = "fishSlot")]
    fish_slot: i32,
}

#[derive(Deserialize)]
struct TradeRequestRespond {
    challenger: u64,
    accept: bool,
}

#[derive(Deserialize)]
struct TradeItem {
    #[serde(rename = "itemId")]
    item_id: u32,
    #[serde(default)]
    quantity: u32,
}

#[derive(Deserialize)]
struct DuelRespond {
    challenger: u64,
    accept: bool,
}

#[derive(Deserialize)]
struct DuelToggleRule {
    rule: String,
}

#[derive(Deserialize)]
struct DuelStakeItem {
    #[serde(rename = "itemId")]
    item_id: u32,
    #[serde(default)]
    quantity: u32,
}

fn error_toast(world: &mut World, player: PlayerId, message: &str, code: &str) {
    world.broadcast.send_to_player(
        player,
        Envelope::new(
            names::server::SHOW_TOAST,
            events::ShowToast { message: message.into(), error_code: Some(code.into()) },
        ),
    );
}

fn trade_error(world: &mut World, player: PlayerId, code: &str) {
    world.broadcast.send_to_player(
        player,
        Envelope::new(names::server::TRADE_ERROR, events::TradeError { error_code: code.into() }),
    );
}

/// Handles one inbound envelope already attributed to `player`. Connection
/// teardown (duplicate character claim, ban) is decided during the
/// handshake, before a socket ever reaches this dispatcher.
pub async fn dispatch(world: &mut World, player: PlayerId, envelope: Envelope) {
    let name = canonicalize(&envelope.name);
    let tick = world.scheduler.current_tick();

    match name.as_str() {
        n if n == names::client::MOVE_REQUEST => {
            if let Ok(body) = serde_json::from_value::<MoveRequest>(envelope.data) {
                world.request_move(player, (body.x, body.z), body.running);
            }
        }
        n if n == names::client::ATTACK_MOB => {
            if let Ok(body) = serde_json::from_value::<AttackMob>(envelope.data) {
                world.queue_action(
                    player,
                    world_core::action_queue::NonMovementAction::AttackMob { mob_id: body.mob_id },
                );
            }
        }
        n if n == names::client::ATTACK_PLAYER => {
            if let Ok(body) = serde_json::from_value::<TargetPlayer>(envelope.data) {
                world.queue_action(
                    player,
                    world_core::action_queue::NonMovementAction::AttackPlayer {
                        target: PlayerId(body.target),
                    },
                );
            }
        }
        n if n == names::client::FOLLOW_PLAYER => {
            if let Ok(body) = serde_json::from_value::<TargetPlayer>(envelope.data) {
                world.queue_action(
                    player,
                    world_core::action_queue::NonMovementAction::FollowPlayer {
                        target: PlayerId(body.target),
                    },
                );
            }
        }
        n if n == names::client::RESOURCE_INTERACT => {
            if let Ok(body) = serde_json::from_value::<ResourceInteract>(envelope.data) {
                world.queue_action(
                    player,
                    world_core::action_queue::NonMovementAction::Gather {
                        resource_id: body.resource_id,
                    },
                );
            }
        }
        n if n == names::client::COOKING_SOURCE_INTERACT => {
            if let Ok(body) = serde_json::from_value::<CookingSourceInteract>(envelope.data) {
                world.queue_action(
                    player,
                    world_core::action_queue::NonMovementAction::Cook {
                        source_id: body.source_id,
                        fish_slot: -1,
                    },
                );
            }
        }
        n if n == names::client::COOKING_REQUEST => {
            if let Ok(body) = serde_json::from_value::<CookingRequest>(envelope.data) {
                world.queue_action(
                    player,
                    world_core::action_queue::NonMovementAction::Cook {
                        source_id: body.source_id,
                        fish_slot: body.fish_slot,
                    },
                );
            }
        }

        n if n == names::client::HOME_TELEPORT => match world.home_teleport.request(player, tick) {
            Ok(_) => {
                world.broadcast.send_to_player(player, Envelope::new(names::server::HOME_TELEPORT_START, json!({})));
            }
            Err(reason) => {
                world.broadcast.send_to_player(
                    player,
                    Envelope::new(
                        names::server::HOME_TELEPORT_FAILED,
                        events::HomeTeleportFailed { reason: reason.code().to_string() },
                    ),
                );
            }
        },
        n if n == names::client::HOME_TELEPORT_CANCEL => {
            world.home_teleport.cancel(player);
        }

        n if n == names::client::BANK_OPEN => {
            world.sessions.open(player, SessionKind::Bank, None, tick);
        }
        n if n == names::client::BANK_CLOSE => {
            world.sessions.close(player);
        }
        n if n == names::client::STORE_OPEN => {
            world.sessions.open(player, SessionKind::Store, None, tick);
        }
        n if n == names::client::STORE_CLOSE => {
            world.sessions.close(player);
        }
        n if n == names::client::DIALOGUE_CLOSE => {
            world.sessions.close(player);
        }

        n if n == names::client::TRADE_REQUEST => {
            if let Ok(body) = serde_json::from_value::<TargetPlayer>(envelope.data) {
                let target = PlayerId(body.target);
                if world.sessions.has_active(player) || world.sessions.has_active(target) {
                    trade_error(world, player, "INTERFACE_OPEN");
                } else {
                    world.trade_intents.propose(
                        player,
                        world_core::pending_intent::TradeIntent { recipient: target },
                        tick,
                    );
                    world.broadcast.send_to_player(
                        target,
                        Envelope::new(names::server::TRADE_INCOMING, json!({ "from": player.0 })),
                    );
                }
            }
        }
        n if n == names::client::TRADE_REQUEST_RESPOND => {
            if let Ok(body) = serde_json::from_value::<TradeRequestRespond>(envelope.data) {
                let challenger = PlayerId(body.challenger);
                if world.trade_intents.take(challenger)
                    != Some(world_core::pending_intent::TradeIntent { recipient: player })
                {
                    trade_error(world, player, "NOT_IN_TRADE");
                } else if body.accept {
                    let trade = world.trades.start(challenger, player);
                    world.sessions.open(challenger, SessionKind::Trade, Some(player), tick);
                    world.sessions.open(player, SessionKind::Trade, Some(challenger), tick);
                    let envelope = Envelope::new(
                        names::server::TRADE_STARTED,
                        json!({ "trade": trade.0, "a": challenger.0, "b": player.0 }),
                    );
                    world.broadcast.send_to_player(challenger, envelope.clone());
                    world.broadcast.send_to_player(player, envelope);
                } else {
                    world.broadcast.send_to_player(
                        challenger,
                        Envelope::new(names::server::TRADE_CANCELLED, json!({ "by": player.0 })),
                    );
                }
            }
        }
        n if n == names::client::TRADE_ADD_ITEM => {
            if let Some(trade) = world.trades.trade_of(player)
                && let Ok(body) = serde_json::from_value::<TradeItem>(envelope.data)
            {
                if !world.catalog.is_tradeable(body.item_id) {
                    trade_error(world, player, "UNTRADEABLE_ITEM");
                } else {
                    let mut offer = world.trades.session(trade).map(|s| s.offer(player).to_vec()).unwrap_or_default();
                    offer.push(ItemStack { item_id: body.item_id, quantity: body.quantity.max(1) });
                    world.trades.set_offer(trade, player, offer);
                    notify_trade_updated(world, trade);
                }
            }
        }
        n if n == names::client::TRADE_REMOVE_ITEM => {
            if let Some(trade) = world.trades.trade_of(player)
                && let Ok(body) = serde_json::from_value::<TradeItem>(envelope.data)
            {
                let mut offer = world.trades.session(trade).map(|s| s.offer(player).to_vec()).unwrap_or_default();
                offer.retain(|item| item.item_id != body.item_id);
                world.trades.set_offer(trade, player, offer);
                notify_trade_updated(world, trade);
            }
        }
        n if n == names::client::TRADE_SET_ITEM_QUANTITY => {
            if let Some(trade) = world.trades.trade_of(player)
                && let Ok(body) = serde_json::from_value::<TradeItem>(envelope.data)
            {
                let mut offer = world.trades.session(trade).map(|s| s.offer(player).to_vec()).unwrap_or_default();
                for item in offer.iter_mut().filter(|item| item.item_id == body.item_id) {
                    item.quantity = body.quantity;
                }
                world.trades.set_offer(trade, player, offer);
                notify_trade_updated(world, trade);
            }
        }
        n if n == names::client::TRADE_ACCEPT => {
            if let Some(trade) = world.trades.trade_of(player) {
                let confirming = world.trades.session(trade).map(|s| s.is_confirming()).unwrap_or(false);
                if confirming {
                    if let Some(ready) = world.trades.confirm(trade, player) {
                        world.sessions.close(ready.a);
                        world.sessions.close(ready.b);
                        let outcome = world_core::economy::settle_trade(
                            world.store.as_ref(),
                            world.catalog.as_ref(),
                            ready.clone(),
                        )
                        .await;
                        report_trade_settlement(world, ready.a, ready.b, outcome);
                    }
                } else if world.trades.accept(trade, player) {
                    if let Some(session) = world.trades.session(trade) {
                        let (a, b) = (session.a, session.b);
                        let envelope = Envelope::new(
                            names::server::TRADE_CONFIRM_SCREEN,
                            json!({ "trade": trade.0 }),
                        );
                        world.broadcast.send_to_player(a, envelope.clone());
                        world.broadcast.send_to_player(b, envelope);
                    }
                } else {
                    notify_trade_updated(world, trade);
                }
            }
        }
        n if n == names::client::TRADE_CANCEL_ACCEPT => {
            if let Some(trade) = world.trades.trade_of(player) {
                world.trades.cancel_accept(trade, player);
                notify_trade_updated(world, trade);
            }
        }
        n if n == names::client::TRADE_CANCEL => {
            if let Some(trade) = world.trades.trade_of(player)
                && let Some(session) = world.trades.cancel(trade)
            {
                world.sessions.close(session.a);
                world.sessions.close(session.b);
                let envelope = Envelope::new(names::server::TRADE_CANCELLED, json!({ "by": player.0 }));
                world.broadcast.send_to_player(session.a, envelope.clone());
                world.broadcast.send_to_player(session.b, envelope);
            }
        }

        n if n == names::client::DUEL_CHALLENGE => {
            if let Ok(body) = serde_json::from_value::<TargetPlayer>(envelope.data) {
                let target = PlayerId(body.target);
                if world.sessions.has_active(player) || world.sessions.has_active(target) {
                    error_toast(world, player, "That player is busy.", "INTERFACE_OPEN");
                } else {
                    world.duel_challenge_intents.propose(
                        player,
                        world_core::pending_intent::DuelChallengeIntent { opponent: target },
                        tick,
                    );
                    world.broadcast.send_to_player(
                        target,
                        Envelope::new(names::server::DUEL_CHALLENGE_INCOMING, json!({ "from": player.0 })),
                    );
                }
            }
        }
        n if n == names::client::DUEL_RESPOND => {
            if let Ok(body) = serde_json::from_value::<DuelRespond>(envelope.data) {
                let challenger = PlayerId(body.challenger);
                if world.duel_challenge_intents.take(challenger)
                    != Some(world_core::pending_intent::DuelChallengeIntent { opponent: player })
                {
                    error_toast(world, player, "That challenge has expired.", "NOT_IN_TRADE");
                } else if body.accept {
                    let duel = world.duels.start(challenger, player);
                    world.sessions.open(challenger, SessionKind::Duel, Some(player), tick);
                    world.sessions.open(player, SessionKind::Duel, Some(challenger), tick);
                    let envelope =
                        Envelope::new(names::server::DUEL_STARTED, json!({ "duel": duel.0 }));
                    world.broadcast.send_to_player(challenger, envelope.clone());
                    world.broadcast.send_to_player(player, envelope);
                } else {
                    world.broadcast.send_to_player(
                        challenger,
                        Envelope::new(names::server::DUEL_CANCELLED, json!({ "by": player.0 })),
                    );
                }
            }
        }
        n if n == names::client::DUEL_TOGGLE_RULE => {
            if let Some(duel) = world.duels.duel_of(player)
                && let Ok(body) = serde_json::from_value::<DuelToggleRule>(envelope.data)
            {
                world.duels.toggle_rule(duel, player, &body.rule);
                notify_duel_rules(world, duel);
            }
        }
        n if n == names::client::DUEL_TOGGLE_EQUIPMENT => {
            // Equipment-slot disables share the rule set's toggle semantics.
            if let Some(duel) = world.duels.duel_of(player)
                && let Ok(body) = serde_json::from_value::<DuelToggleRule>(envelope.data)
            {
                world.duels.toggle_rule(duel, player, &format!("equip:{}", body.rule));
                notify_duel_rules(world, duel);
            }
        }
        n if n == names::client::DUEL_ACCEPT_RULES => {
            if let Some(duel) = world.duels.duel_of(player) {
                world.duels.accept_rules(duel, player);
                notify_duel_rules(world, duel);
            }
        }
        n if n == names::client::DUEL_ADD_STAKE => {
            if let Some(duel) = world.duels.duel_of(player)
                && let Ok(body) = serde_json::from_value::<DuelStakeItem>(envelope.data)
            {
                let mut stake = world.duels.session(duel).map(|s| s.stake_of(player).to_vec()).unwrap_or_default();
                stake.push(ItemStack { item_id: body.item_id, quantity: body.quantity.max(1) });
                world.duels.set_stake(duel, player, stake);
                notify_duel_stakes(world, duel);
            }
        }
        n if n == names::client::DUEL_REMOVE_STAKE => {
            if let Some(duel) = world.duels.duel_of(player)
                && let Ok(body) = serde_json::from_value::<DuelStakeItem>(envelope.data)
            {
                let mut stake = world.duels.session(duel).map(|s| s.stake_of(player).to_vec()).unwrap_or_default();
                stake.retain(|item| item.item_id != body.item_id);
                world.duels.set_stake(duel, player, stake);
                notify_duel_stakes(world, duel);
            }
        }
        n if n == names::client::DUEL_ACCEPT_STAKES => {
            if let Some(duel) = world.duels.duel_of(player) {
                world.duels.accept_stakes(duel, player);
                notify_duel_stakes(world, duel);
            }
        }
        n if n == names::client::DUEL_ACCEPT_FINAL => {
            if let Some(duel) = world.duels.duel_of(player)
                && world.duels.accept_final(duel, player)
                && let Some(session) = world.duels.session(duel)
            {
                world.duel_countdown_started(
                    session.a,
                    session.b,
                    protocol::names::timing::DUEL_COUNTDOWN_TICKS,
                );
            }
        }
        n if n == names::client::DUEL_CANCEL => {
            if let Some(duel) = world.duels.duel_of(player)
                && let Some(session) = world.duels.cancel(duel)
            {
                world.sessions.close(session.a);
                world.sessions.close(session.b);
                let envelope = Envelope::new(names::server::DUEL_CANCELLED, json!({ "by": player.0 }));
                world.broadcast.send_to_player(session.a, envelope.clone());
                world.broadcast.send_to_player(session.b, envelope);
            }
        }
        n if n == names::client::DUEL_FORFEIT => {
            if let Some(duel) = world.duels.duel_of(player) {
                world.forfeit_duel(duel, player).await;
            }
        }

        n if n == names::client::REQUEST_RESPAWN => {
            world.broadcast.send_to_player(
                player,
                Envelope::new(names::server::SHOW_TOAST, events::ShowToast {
                    message: "Respawned.".into(),
                    error_code: None,
                }),
            );
        }

        _ => {
            tracing::debug!(packet = %name, "no handler for packet");
        }
    }
}

fn notify_trade_updated(world: &mut World, trade: world_core::trading::TradeId) {
    let Some(session) = world.trades.session(trade) else { return };
    let (a, b) = (session.a, session.b);
    let envelope = Envelope::new(
        names::server::TRADE_UPDATED,
        json!({
            "trade": trade.0,
            "aOffer": session.offer(a),
            "bOffer": session.offer(b),
        }),
    );
    world.broadcast.send_to_player(a, envelope.clone());
    world.broadcast.send_to_player(b, envelope);
}

fn report_trade_settlement(
    world: &mut World,
    a: PlayerId,
    b: PlayerId,
    outcome: world_core::economy::TransactionOutcome,
) {
    use world_core::economy::TransactionOutcome;
    match outcome {
        TransactionOutcome::Applied => {
            let envelope = Envelope::new(names::server::TRADE_COMPLETED, json!({}));
            world.broadcast.send_to_player(a, envelope.clone());
            world.broadcast.send_to_player(b, envelope);
        }
        TransactionOutcome::PartialDropped { player, .. } => {
            error_toast(world, player, "Your inventory and bank were full; some items were lost.", "BANK_OVERFLOW");
        }
        TransactionOutcome::Rejected(reason) => {
            trade_error(world, a, reason.code());
            trade_error(world, b, reason.code());
        }
        TransactionOutcome::Failed(err) => {
            tracing::error!(%err, "trade settlement failed");
            trade_error(world, a, "server_error");
            trade_error(world, b, "server_error");
        }
    }
}

fn notify_duel_rules(world: &mut World, duel: world_core::duel::DuelId) {
    let Some(session) = world.duels.session(duel) else { return };
    let (a, b) = (session.a, session.b);
    let envelope = Envelope::new(names::server::DUEL_RULES_UPDATED, json!({ "duel": duel.0 }));
    world.broadcast.send_to_player(a, envelope.clone());
    world.broadcast.send_to_player(b, envelope);
}

fn notify_duel_stakes(world: &mut World, duel: world_core::duel::DuelId) {
    let Some(session) = world.duels.session(duel) else { return };
    let (a, b) = (session.a, session.b);
    let envelope = Envelope::new(
        names::server::DUEL_STAKES_UPDATED,
        json!({
            "duel": duel.0,
            "aStake": session.stake_of(a),
            "bStake": session.stake_of(b),
        }),
    );
    world.broadcast.send_to_player(a, envelope.clone());
    world.broadcast.send_to_player(b, envelope);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use world_core::broadcast::OutboundSink;
    use world_core::ids::SocketId;
    use world_core::store::InMemoryStore;

    #[derive(Default)]
    struct RecordingSink {
        deliveries: Vec<(SocketId, Vec<Envelope>)>,
    }

    impl OutboundSink for RecordingSink {
        fn deliver(&mut self, socket: SocketId, envelopes: Vec<Envelope>) {
            self.deliveries.push((socket, envelopes));
        }
    }

    fn sent_names(world: &mut World, player: PlayerId) -> Vec<String> {
        let Some(socket) = world.broadcast.player_socket(player) else { return Vec::new() };
        let mut sink = RecordingSink::default();
        world.broadcast.flush(&mut sink);
        sink.deliveries
            .into_iter()
            .filter(|(s, _)| *s == socket)
            .flat_map(|(_, envs)| envs.into_iter().map(|e| e.name))
            .collect()
    }

    fn new_world() -> World {
        World::new(1, Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn move_request_queues_a_movement_action() {
        let mut world = new_world();
        let player = PlayerId(1);
        world.register_player(player, SocketId(1), (0, 0));

        dispatch(&mut world, player, Envelope::new(names::client::MOVE_REQUEST, json!({ "x": 5, "z": 0 }))).await;
        world.run_tick().await;

        assert_eq!(world.movement.tile_of(world_core::ids::EntityId::Player(player)), Some((1, 0)));
    }

    #[tokio::test]
    async fn trade_request_then_accept_runs_the_full_offer_and_confirm_cycle() {
        let mut world = new_world();
        let (a, b) = (PlayerId(1), PlayerId(2));
        world.register_player(a, SocketId(1), (0, 0));
        world.register_player(b, SocketId(2), (0, 0));
        world
            .store
            .set_inventory(a, vec![Some(world_core::store::ItemStack { item_id: 995, quantity: 10 })])
            .await
            .unwrap();

        dispatch(&mut world, a, Envelope::new(names::client::TRADE_REQUEST, json!({ "target": b.0 }))).await;
        assert!(sent_names(&mut world, b).contains(&names::server::TRADE_INCOMING.to_string()));

        dispatch(
            &mut world,
            b,
            Envelope::new(names::client::TRADE_REQUEST_RESPOND, json!({ "challenger": a.0, "accept": true })),
        )
        .await;
        assert!(world.trades.trade_of(a).is_some());

        dispatch(&mut world, a, Envelope::new(names::client::TRADE_ADD_ITEM, json!({ "itemId": 995, "quantity": 10 })))
            .await;
        dispatch(&mut world, a, Envelope::new(names::client::TRADE_ACCEPT, serde_json::Value::Null)).await;
        dispatch(&mut world, b, Envelope::new(names::client::TRADE_ACCEPT, serde_json::Value::Null)).await;

        let trade = world.trades.trade_of(a).expect("still negotiating the confirm screen");
        assert!(world.trades.session(trade).unwrap().is_confirming());

        dispatch(&mut world, a, Envelope::new(names::client::TRADE_ACCEPT, serde_json::Value::Null)).await;
        dispatch(&mut world, b, Envelope::new(names::client::TRADE_ACCEPT, serde_json::Value::Null)).await;

        assert!(world.trades.trade_of(a).is_none());
        let inventory = world.store.get_inventory(b).await.unwrap();
        assert!(inventory.iter().flatten().any(|item| item.item_id == 995 && item.quantity == 10));
    }

    #[tokio::test]
    async fn duel_challenge_accept_reaches_the_countdown() {
        let mut world = new_world();
        let (a, b) = (PlayerId(1), PlayerId(2));
        world.register_player(a, SocketId(1), (0, 0));
        world.register_player(b, SocketId(2), (0, 0));

        dispatch(&mut world, a, Envelope::new(names::client::DUEL_CHALLENGE, json!({ "target": b.0 }))).await;
        dispatch(
            &mut world,
            b,
            Envelope::new(names::client::DUEL_RESPOND, json!({ "challenger": a.0, "accept": true })),
        )
        .await;
        let duel = world.duels.duel_of(a).expect("duel started");

        dispatch(&mut world, a, Envelope::new(names::client::DUEL_ACCEPT_RULES, serde_json::Value::Null)).await;
        dispatch(&mut world, b, Envelope::new(names::client::DUEL_ACCEPT_RULES, serde_json::Value::Null)).await;
        dispatch(&mut world, a, Envelope::new(names::client::DUEL_ACCEPT_STAKES, serde_json::Value::Null)).await;
        dispatch(&mut world, b, Envelope::new(names::client::DUEL_ACCEPT_STAKES, serde_json::Value::Null)).await;
        dispatch(&mut world, a, Envelope::new(names::client::DUEL_ACCEPT_FINAL, serde_json::Value::Null)).await;
        dispatch(&mut world, b, Envelope::new(names::client::DUEL_ACCEPT_FINAL, serde_json::Value::Null)).await;

        assert!(sent_names(&mut world, a).contains(&names::server::DUEL_COUNTDOWN_START.to_string()));
        assert!(world.duels.session(duel).is_some());
    }
}

