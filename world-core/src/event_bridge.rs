//! Converts internal per-subsystem events into outgoing packets and routes
//! them through the broadcast queues.
//!
//! Each subsystem (tile movement, sessions, trading, duels, ...) emits a
//! small event type of its own rather than reaching into the network layer
//! directly. This module is the one place that knows how to turn those
//! events into wire packets, kept as a flat match rather than scattered
//! `impl From` conversions so the full set of outgoing packet names stays
//! visible in one place.

use crate::aoi::AoiManager;
use crate::broadcast::BroadcastManager;
use crate::ids::{EntityId, PlayerId};
use crate::session::SessionClosed;
use crate::tile_movement::MovementStarted;
use protocol::{events, names, Envelope};

/// Internal events that need to reach one or more clients as packets.
pub enum WorldEvent {
    MovementStarted(MovementStarted),
    SessionClosed(SessionClosed),
    Kick { player: PlayerId, reason: String },
    Toast { player: PlayerId, message: String, error_code: Option<String> },
    EntityRemoved { entity: EntityId, entity_id: u64 },
}

/// Converts `event` to its wire packet and enqueues it on `broadcast`.
pub fn dispatch(event: WorldEvent, broadcast: &mut BroadcastManager, aoi: &AoiManager) {
    match event {
        WorldEvent::MovementStarted(moved) => {
            let envelope = Envelope::new(
                names::server::TILE_MOVEMENT_START,
                events::TileMovementStart {
                    entity_id: entity_wire_id(moved.entity),
                    path: moved.path,
                    running: moved.running,
                },
            );
            broadcast.send_to_aoi(aoi, moved.entity, envelope);
        }
        WorldEvent::SessionClosed(SessionClosed { player, .. }) => {
            // Sessions close silently on the wire; only the interface itself
            // (bank/store/dialogue/trade/duel close packet) is observable,
            // and those are emitted by their owning subsystem directly.
            let _ = player;
        }
        WorldEvent::Kick { player, reason } => {
            let envelope = Envelope::new(names::server::KICK, events::Kick { reason });
            broadcast.send_to_player(player, envelope);
        }
        WorldEvent::Toast { player, message, error_code } => {
            let envelope = Envelope::new(
                names::server::SHOW_TOAST,
                events::ShowToast { message, error_code },
            );
            broadcast.send_to_player(player, envelope);
        }
        WorldEvent::EntityRemoved { entity, entity_id } => {
            let envelope =
                Envelope::new(names::server::ENTITY_REMOVED, events::EntityRemoved { entity_id });
            broadcast.send_to_aoi(aoi, entity, envelope);
        }
    }
}

fn entity_wire_id(entity: EntityId) -> u64 {
    match entity {
        EntityId::Player(id) => id.0,
        EntityId::Mob(id) => id.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::OutboundSink;
    use crate::ids::SocketId;

    #[derive(Default)]
    struct RecordingSink {
        deliveries: Vec<(SocketId, Vec<Envelope>)>,
    }

    impl OutboundSink for RecordingSink {
        fn deliver(&mut self, socket: SocketId, envelopes: Vec<Envelope>) {
            self.deliveries.push((socket, envelopes));
        }
    }

    #[test]
    fn movement_started_reaches_aoi_subscribers_as_tile_movement_start() {
        let mut aoi = AoiManager::new(50.0, 1);
        let mut broadcast = BroadcastManager::new();
        let player = PlayerId(1);
        let entity = EntityId::Player(player);
        let socket = SocketId(1);

        broadcast.register_player(player, socket);
        aoi.update_entity_position(entity, 0.0, 0.0);
        aoi.update_player_subscriptions(0.0, 0.0, socket);

        dispatch(
            WorldEvent::MovementStarted(MovementStarted {
                entity,
                path: vec![(1, 0)],
                running: false,
            }),
            &mut broadcast,
            &aoi,
        );

        let mut sink = RecordingSink::default();
        broadcast.flush(&mut sink);
        assert_eq!(sink.deliveries.len(), 1);
        assert_eq!(sink.deliveries[0].1[0].canonical_name(), names::server::TILE_MOVEMENT_START);
    }

    #[test]
    fn kick_targets_only_the_named_player() {
        let aoi = AoiManager::new(50.0, 1);
        let mut broadcast = BroadcastManager::new();
        broadcast.register_player(PlayerId(1), SocketId(1));
        broadcast.register_player(PlayerId(2), SocketId(2));

        dispatch(
            WorldEvent::Kick { player: PlayerId(1), reason: "banned".into() },
            &mut broadcast,
            &aoi,
        );

        let mut sink = RecordingSink::default();
        broadcast.flush(&mut sink);
        assert_eq!(sink.deliveries.len(), 1);
        assert_eq!(sink.deliveries[0].0, SocketId(1));
    }
}
