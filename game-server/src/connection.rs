//! Per-socket connection handling: handshake, then the read loop that feeds
//! [`crate::router::dispatch`]. The socket is split into sender/receiver
//! halves up front; the handshake runs auth → character select → world
//! entry before the packet loop takes over.

use crate::router;
use crate::state::{SenderHalf, ServerContext};
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use protocol::{close_codes, envelope::canonicalize, events, names, Envelope};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use world_core::ids::PlayerId;

#[derive(Deserialize)]
struct AuthToken {
    token: String,
}

#[derive(Deserialize)]
struct CharacterSelected {
    #[serde(rename = "characterId")]
    character_id: u64,
}

async fn send_close(sender: &SenderHalf, code: u16, reason: &str) {
    let mut sender = sender.lock().await;
    let _ = sender
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}

async fn send_envelope(sender: &SenderHalf, envelope: Envelope) {
    let Ok(text) = serde_json::to_string(&envelope) else { return };
    let mut sender = sender.lock().await;
    let _ = sender.send(Message::Text(text.into())).await;
}

async fn next_envelope(receiver: &mut futures_util::stream::SplitStream<WebSocket>) -> Option<Envelope> {
    loop {
        match receiver.next().await? {
            Ok(Message::Text(text)) => {
                if let Ok(envelope) = serde_json::from_str::<Envelope>(&text) {
                    return Some(envelope);
                }
            }
            Ok(Message::Close(_)) => return None,
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

/// Drives one socket end to end: authenticate, let the client pick its one
/// stubbed character, spawn it into the world, then relay packets until
/// disconnect.
pub async fn handle_socket(socket: WebSocket, ctx: Arc<ServerContext>) {
    let (raw_sender, mut receiver) = socket.split();
    let sender: SenderHalf = Arc::new(tokio::sync::Mutex::new(raw_sender));

    let Some(envelope) = next_envelope(&mut receiver).await else { return };
    if canonicalize(&envelope.name) != names::client::CHARACTER_LIST_REQUEST {
        send_close(&sender, close_codes::KICK, "expected characterListRequest").await;
        return;
    }
    let Ok(auth) = serde_json::from_value::<AuthToken>(envelope.data) else {
        send_close(&sender, close_codes::KICK, "malformed auth token").await;
        return;
    };
    let account = {
        let world = ctx.world.lock().await;
        world.auth.authenticate(&auth.token).await
    };
    let Some(account) = account else {
        send_close(&sender, close_codes::KICK, "authentication failed").await;
        return;
    };

    // One default character per account, named the same way the account is
    // addressed; a real catalog would list the account's actual roster.
    let player = PlayerId(account.0);
    send_envelope(
        &sender,
        Envelope::new(
            "characterList",
            json!({ "characters": [{ "characterId": player.0, "name": format!("Player{}", player.0) }] }),
        ),
    )
    .await;

    let Some(envelope) = next_envelope(&mut receiver).await else { return };
    if canonicalize(&envelope.name) != names::client::CHARACTER_SELECTED {
        send_close(&sender, close_codes::KICK, "expected characterSelected").await;
        return;
    }
    let Ok(selected) = serde_json::from_value::<CharacterSelected>(envelope.data) else {
        send_close(&sender, close_codes::KICK, "malformed characterSelected").await;
        return;
    };
    if selected.character_id != player.0 {
        send_close(&sender, close_codes::KICK, "unknown character").await;
        return;
    }

    let already_online = {
        let connections = ctx.connections.lock().await;
        connections.online_players.contains_key(&player)
    };
    if already_online {
        send_close(&sender, close_codes::KICK, "character already online").await;
        return;
    }

    let socket_id = {
        let mut connections = ctx.connections.lock().await;
        let socket_id = connections.next_socket_id();
        connections.senders.insert(socket_id, sender.clone());
        connections.online_players.insert(player, socket_id);
        socket_id
    };

    let spawn = {
        let settings = ctx.settings.read().await;
        (settings.spawn_x as i32, settings.spawn_z as i32)
    };
    {
        let mut world = ctx.world.lock().await;
        world.register_player(player, socket_id, spawn);
    }
    send_envelope(
        &sender,
        Envelope::new(
            names::server::PLAYER_TELEPORT,
            events::PlayerTeleport { player_id: player.0, x: spawn.0 as f32, y: 0.0, z: spawn.1 as f32 },
        ),
    )
    .await;

    loop {
        let Some(envelope) = next_envelope(&mut receiver).await else { break };
        if canonicalize(&envelope.name) == "pong" {
            let mut world = ctx.world.lock().await;
            world.sockets.on_pong(socket_id);
            continue;
        }
        let mut world = ctx.world.lock().await;
        router::dispatch(&mut world, player, envelope).await;
    }

    let mut connections = ctx.connections.lock().await;
    connections.senders.remove(&socket_id);
    connections.online_players.remove(&player);
    drop(connections);
    let mut world = ctx.world.lock().await;
    world.remove_player(player, socket_id);
}
