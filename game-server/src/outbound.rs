//! Bridges [`world_core::broadcast::OutboundSink`] (sync, called once per
//! tick from inside the world lock) to the actual async WebSocket sender
//! halves: the sender is wrapped in `Arc<Mutex<..>>` and each delivery runs
//! from a spawned task rather than holding the world lock across an await
//! point.

use crate::state::SenderHalf;
use axum::extract::ws::Message;
use futures_util::SinkExt;
use protocol::Envelope;
use std::collections::HashMap;
use world_core::broadcast::OutboundSink;
use world_core::ids::SocketId;

pub struct AxumOutboundSink<'a> {
    pub senders: &'a HashMap<SocketId, SenderHalf>,
}

impl OutboundSink for AxumOutboundSink<'_> {
    fn deliver(&mut self, socket: SocketId, envelopes: Vec<Envelope>) {
        let Some(sender) = self.senders.get(&socket).cloned() else {
            return;
        };
        tokio::spawn(async move {
            let mut sender = sender.lock().await;
            for envelope in envelopes {
                let Ok(text) = serde_json::to_string(&envelope) else { continue };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });
    }
}
