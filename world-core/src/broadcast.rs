//! Outbound packet fan-out: per-socket queues, flushed once per tick at the
//! `Post` priority so every subsystem's emissions for a tick land in one
//! batch rather than one syscall per event.
//!
//! `OutboundSink` is the external collaborator (`game-server` owns the
//! actual WebSocket sender halves); this module only decides *what* goes to
//! *whom*, mirroring a broadcast-channel-per-room idiom but generalized from
//! "one channel per room" to "one queue per socket".

use crate::aoi::AoiManager;
use crate::ids::{EntityId, PlayerId, SocketId};
use protocol::Envelope;
use std::collections::HashMap;

/// Delivers queued envelopes to their destination socket. Implemented by
/// `game-server` against the real WebSocket sender; tests can supply an
/// in-memory recorder.
pub trait OutboundSink {
    fn deliver(&mut self, socket: SocketId, envelopes: Vec<Envelope>);
}

#[derive(Default)]
pub struct BroadcastManager {
    player_sockets: HashMap<PlayerId, SocketId>,
    queues: HashMap<SocketId, Vec<Envelope>>,
}

impl BroadcastManager {
    pub fn new() -> Self {
        BroadcastManager::default()
    }

    pub fn register_player(&mut self, player: PlayerId, socket: SocketId) {
        self.player_sockets.insert(player, socket);
    }

    pub fn unregister_player(&mut self, player: PlayerId) {
        if let Some(socket) = self.player_sockets.remove(&player) {
            self.queues.remove(&socket);
        }
    }

    pub fn player_socket(&self, player: PlayerId) -> Option<SocketId> {
        self.player_sockets.get(&player).copied()
    }

    pub fn send_to_socket(&mut self, socket: SocketId, envelope: Envelope) {
        self.queues.entry(socket).or_default().push(envelope);
    }

    pub fn send_to_player(&mut self, player: PlayerId, envelope: Envelope) {
        if let Some(socket) = self.player_socket(player) {
            self.send_to_socket(socket, envelope);
        }
    }

    /// Queues `envelope` for every known socket, optionally skipping one
    /// (the actor whose own action triggered the broadcast).
    pub fn send_to_all(&mut self, envelope: Envelope, exclude: Option<SocketId>) {
        let targets: Vec<SocketId> = self
            .player_sockets
            .values()
            .copied()
            .filter(|socket| Some(*socket) != exclude)
            .collect();
        for socket in targets {
            self.send_to_socket(socket, envelope.clone());
        }
    }

    /// Queues `envelope` for every socket subscribed to `entity`'s AOI cell.
    pub fn send_to_aoi(&mut self, aoi: &AoiManager, entity: EntityId, envelope: Envelope) {
        for socket in aoi.subscribers_for_entity(entity) {
            self.send_to_socket(socket, envelope.clone());
        }
    }

    /// Drains every per-socket queue into `sink`, one batched delivery per
    /// socket. Called once per tick from the `Post` bucket.
    pub fn flush(&mut self, sink: &mut impl OutboundSink) {
        for (socket, envelopes) in self.queues.drain() {
            if !envelopes.is_empty() {
                sink.deliver(socket, envelopes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

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
    fn send_to_all_skips_the_excluded_socket() {
        let mut mgr = BroadcastManager::new();
        mgr.register_player(PlayerId(1), SocketId(1));
        mgr.register_player(PlayerId(2), SocketId(2));

        let envelope = Envelope::new("chatAdded", json!({"message": "hi"}));
        mgr.send_to_all(envelope, Some(SocketId(1)));

        let mut sink = RecordingSink::default();
        mgr.flush(&mut sink);
        let sockets: Vec<SocketId> = sink.deliveries.iter().map(|(s, _)| *s).collect();
        assert_eq!(sockets, vec![SocketId(2)]);
    }

    #[test]
    fn flush_batches_multiple_queued_envelopes_per_socket() {
        let mut mgr = BroadcastManager::new();
        mgr.register_player(PlayerId(1), SocketId(1));
        mgr.send_to_player(PlayerId(1), Envelope::new("a", json!(1)));
        mgr.send_to_player(PlayerId(1), Envelope::new("b", json!(2)));

        let mut sink = RecordingSink::default();
        mgr.flush(&mut sink);
        assert_eq!(sink.deliveries.len(), 1);
        assert_eq!(sink.deliveries[0].1.len(), 2);
    }

    #[test]
    fn unregistering_a_player_drops_its_queue() {
        let mut mgr = BroadcastManager::new();
        mgr.register_player(PlayerId(1), SocketId(1));
        mgr.send_to_player(PlayerId(1), Envelope::new("a", json!(1)));
        mgr.unregister_player(PlayerId(1));

        let mut sink = RecordingSink::default();
        mgr.flush(&mut sink);
        assert!(sink.deliveries.is_empty());
    }
}
