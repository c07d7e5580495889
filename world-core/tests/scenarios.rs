//! End-to-end scenario coverage driven entirely through `World`'s public
//! API, one test per documented scenario.

use std::sync::Arc;
use world_core::action_queue::NonMovementAction;
use world_core::ids::{EntityId, MobId, PlayerId, SocketId};
use world_core::store::ItemStack;
use world_core::world::World;

fn new_world() -> World {
    World::new(1, Arc::new(world_core::store::InMemoryStore::new()))
}

/// S1 — Walk-up melee: P(5,0) attacks M(5,3) with melee range 1; within
/// three ticks P reaches (5,2), the south cardinal neighbor of M.
#[tokio::test]
async fn s1_walk_up_melee() {
    let mut world = new_world();
    let player = PlayerId(1);
    let mob = MobId(7);
    world.register_player(player, SocketId(1), (5, 0));
    world.movement.sync_player_position(EntityId::Mob(mob), (5, 3));

    world.queue_action(player, NonMovementAction::AttackMob { mob_id: mob.0 });
    for _ in 0..3 {
        world.run_tick().await;
    }

    assert_eq!(world.movement.tile_of(EntityId::Player(player)), Some((5, 2)));
}

/// S2 — Trade of 10 coins for 1 sword: both offers accepted twice, swap
/// completes, each side ends up with what the other offered.
#[tokio::test]
async fn s2_trade_coins_for_sword() {
    let mut world = new_world();
    let (initiator, recipient) = (PlayerId(1), PlayerId(2));
    world.store.set_inventory(initiator, vec![Some(ItemStack { item_id: 995, quantity: 10 })]).await.unwrap();
    world.store.set_inventory(recipient, vec![Some(ItemStack { item_id: 1511, quantity: 1 })]).await.unwrap();

    let trade = world.trades.start(initiator, recipient);
    world.trades.set_offer(trade, initiator, vec![ItemStack { item_id: 995, quantity: 10 }]);
    world.trades.set_offer(trade, recipient, vec![ItemStack { item_id: 1511, quantity: 1 }]);
    world.trades.accept(trade, initiator);
    world.trades.accept(trade, recipient);
    assert!(world.trades.session(trade).unwrap().is_confirming());
    assert!(world.trades.confirm(trade, initiator).is_none());
    let ready = world.trades.confirm(trade, recipient).unwrap();

    let outcome =
        world_core::economy::settle_trade(world.store.as_ref(), world.catalog.as_ref(), ready).await;
    assert!(matches!(outcome, world_core::economy::TransactionOutcome::Applied));
    assert_eq!(
        world.store.get_inventory(initiator).await.unwrap()[0],
        Some(ItemStack { item_id: 1511, quantity: 1 }),
    );
    assert_eq!(
        world.store.get_inventory(recipient).await.unwrap()[0],
        Some(ItemStack { item_id: 995, quantity: 10 }),
    );
}

/// S3 — Trade cancel on mutation: after both accept and move to the
/// confirm screen, the initiator changes their offer; both acceptance
/// flags reset and the swap doesn't happen.
#[tokio::test]
async fn s3_trade_cancel_on_mutation() {
    let mut world = new_world();
    let (initiator, recipient) = (PlayerId(1), PlayerId(2));
    let trade = world.trades.start(initiator, recipient);
    world.trades.set_offer(trade, initiator, vec![ItemStack { item_id: 995, quantity: 10 }]);
    world.trades.accept(trade, initiator);
    world.trades.accept(trade, recipient);
    assert!(world.trades.session(trade).unwrap().is_confirming());

    world.trades.set_offer(trade, initiator, vec![ItemStack { item_id: 995, quantity: 20 }]);

    assert!(!world.trades.session(trade).unwrap().is_confirming());
    assert!(world.trades.confirm(trade, initiator).is_none());
    assert!(world.trades.confirm(trade, recipient).is_none());
    assert!(world.trades.session(trade).is_some());
}

/// S4 — Duel forfeit: challenger wins a 10-coin stake, the full amount
/// still present in the loser's inventory at settlement time, so this
/// checks the winner's gain merges into their existing stack and the
/// loser is left with none of the staked coins.
#[tokio::test]
async fn s4_duel_forfeit_settles_the_stakes() {
    let mut world = new_world();
    let (winner, loser) = (PlayerId(1), PlayerId(2));
    world.register_player(winner, SocketId(1), (0, 0));
    world.register_player(loser, SocketId(2), (0, 0));
    world.store.set_inventory(winner, vec![Some(ItemStack { item_id: 995, quantity: 10 })]).await.unwrap();
    world.store.set_inventory(loser, vec![Some(ItemStack { item_id: 995, quantity: 10 })]).await.unwrap();

    let duel = world.duels.start(winner, loser);
    world.duels.accept_rules(duel, winner);
    world.duels.accept_rules(duel, loser);
    world.duels.set_stake(duel, winner, Vec::new());
    world.duels.set_stake(duel, loser, vec![ItemStack { item_id: 995, quantity: 10 }]);
    world.duels.accept_stakes(duel, winner);
    world.duels.accept_stakes(duel, loser);
    world.duels.accept_final(duel, winner);
    world.duels.accept_final(duel, loser);
    for tick in 1..=protocol::names::timing::DUEL_COUNTDOWN_TICKS {
        let events = world.duels.on_tick(tick);
        for event in &events {
            world.handle_duel_event(event).await;
        }
    }

    world.forfeit_duel(duel, loser).await;

    assert_eq!(
        world.store.get_inventory(winner).await.unwrap()[0],
        Some(ItemStack { item_id: 995, quantity: 20 }),
    );
    assert_eq!(world.store.get_inventory(loser).await.unwrap()[0], None);
}

/// S5 — Duel stake dupe attempt: the loser staked 5 shrimp, then ate 3
/// during the duel so the inventory only holds 2 by settlement time.
/// Settlement re-selects the loser's live inventory rather than trusting
/// the quantity recorded at negotiation time, so only the 2 that remain
/// transfer.
#[tokio::test]
async fn s5_duel_settlement_transfers_only_what_remains_of_the_stake() {
    let mut world = new_world();
    let (winner, loser) = (PlayerId(1), PlayerId(2));
    world.register_player(winner, SocketId(1), (0, 0));
    world.register_player(loser, SocketId(2), (0, 0));

    let duel = world.duels.start(winner, loser);
    world.duels.accept_rules(duel, winner);
    world.duels.accept_rules(duel, loser);
    world.duels.set_stake(duel, loser, vec![ItemStack { item_id: 317, quantity: 5 }]);
    world.duels.accept_stakes(duel, winner);
    world.duels.accept_stakes(duel, loser);
    world.duels.accept_final(duel, winner);
    world.duels.accept_final(duel, loser);
    for tick in 1..=protocol::names::timing::DUEL_COUNTDOWN_TICKS {
        let events = world.duels.on_tick(tick);
        for event in &events {
            world.handle_duel_event(event).await;
        }
    }

    // Ate 3 of the 5 staked shrimp mid-fight; only 2 remain in inventory.
    world.store.set_inventory(loser, vec![Some(ItemStack { item_id: 317, quantity: 2 })]).await.unwrap();

    world.forfeit_duel(duel, loser).await;

    assert_eq!(
        world.store.get_inventory(winner).await.unwrap()[0],
        Some(ItemStack { item_id: 317, quantity: 2 }),
    );
    assert_eq!(world.store.get_inventory(loser).await.unwrap()[0], None);
}

/// S6 — Home-teleport with combat interrupt: a cast is interrupted by
/// combat before it completes; the player's position is unchanged and
/// the cooldown is not set, so a retry is allowed immediately.
#[tokio::test]
async fn s6_home_teleport_combat_interrupt() {
    let mut world = new_world();
    let player = PlayerId(1);
    world.register_player(player, SocketId(1), (5, 5));

    world.home_teleport.request(player, 0).unwrap();
    let event = world
        .home_teleport
        .interrupt(player, world_core::home_teleport::InterruptCause::Combat)
        .unwrap();
    assert!(matches!(
        event,
        world_core::home_teleport::HomeTeleportEvent::Failed {
            reason: world_core::error::Reason::InterruptedByCombat,
            ..
        }
    ));

    let second = world.home_teleport.request(player, 2);
    assert!(second.is_ok(), "no cooldown should be set after a combat interrupt");
    assert_eq!(world.movement.tile_of(EntityId::Player(player)), Some((5, 5)));
}
