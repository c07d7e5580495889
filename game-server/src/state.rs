//! Server-wide shared state: the simulation plus the registry of live
//! WebSocket sender halves the simulation's broadcast queues get flushed
//! into, one entry per connected socket.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use world_core::config::{EnvConfig, SharedSettings, WorldSettings};
use world_core::ids::{PlayerId, SocketId};
use world_core::store::Store;
use world_core::world::World;

pub type SenderHalf = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Tracks which account occupies which character, so a duplicate login can
/// be refused.
#[derive(Default)]
pub struct ConnectionRegistry {
    pub senders: HashMap<SocketId, SenderHalf>,
    pub online_players: HashMap<PlayerId, SocketId>,
    next_socket_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn next_socket_id(&self) -> SocketId {
        SocketId(self.next_socket_id.fetch_add(1, Ordering::Relaxed))
    }
}

pub struct ServerContext {
    pub world: Mutex<World>,
    pub connections: Mutex<ConnectionRegistry>,
    pub settings: SharedSettings,
    pub env: EnvConfig,
}

impl ServerContext {
    /// Loads `WorldSettings` from disk (falling back to defaults on first
    /// run) before building the world, so spawn point and arena bounds are
    /// live from the first tick.
    pub async fn new(store: Arc<dyn Store>) -> Arc<Self> {
        let env = EnvConfig::from_env();
        let settings = world_core::config::load_world_settings(&env.settings_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("failed to load world settings, using defaults: {e}");
                WorldSettings::default()
            });
        Arc::new(ServerContext {
            world: Mutex::new(World::with_env(0, store, &env)),
            connections: Mutex::new(ConnectionRegistry::default()),
            settings: Arc::new(tokio::sync::RwLock::new(settings)),
            env,
        })
    }
}
