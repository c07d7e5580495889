mod connection;
mod outbound;
mod router;
mod state;

use crate::outbound::AxumOutboundSink;
use crate::state::ServerContext;
use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use world_core::store::InMemoryStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();

    let ctx = ServerContext::new(Arc::new(InMemoryStore::new())).await;

    let tick_ctx = ctx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(protocol::names::timing::TICK_MS));
        loop {
            interval.tick().await;
            let mut world = tick_ctx.world.lock().await;
            world.run_tick().await;
            let connections = tick_ctx.connections.lock().await;
            world.flush(&mut AxumOutboundSink { senders: &connections.senders });
        }
    });

    let liveness_ctx = ctx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            let now = std::time::Instant::now();
            let actions = {
                let mut world = liveness_ctx.world.lock().await;
                world.sockets.update(now)
            };
            let connections = liveness_ctx.connections.lock().await;
            for action in actions {
                match action {
                    world_core::socket_manager::LivenessAction::SendPing(socket) => {
                        if let Some(sender) = connections.senders.get(&socket) {
                            let mut sender = sender.lock().await;
                            use futures_util::SinkExt;
                            let _ = sender.send(axum::extract::ws::Message::Ping(Vec::new().into())).await;
                        }
                    }
                    world_core::socket_manager::LivenessAction::Evict(socket) => {
                        if let Some(sender) = connections.senders.get(&socket) {
                            let mut sender = sender.lock().await;
                            use futures_util::SinkExt;
                            let _ = sender
                                .send(axum::extract::ws::Message::Close(Some(axum::extract::ws::CloseFrame {
                                    code: protocol::close_codes::KICK,
                                    reason: "ping timeout".to_string().into(),
                                })))
                                .await;
                        }
                    }
                }
            }
        }
    });

    let save_ctx = ctx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(save_ctx.env.save_interval_secs));
        loop {
            interval.tick().await;
            let settings = save_ctx.settings.read().await.clone();
            if let Err(e) = world_core::config::save_world_settings(&save_ctx.env.settings_path, &settings).await {
                tracing::error!("periodic world settings save failed: {e}");
            }
        }
    });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(ctx);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<ServerContext>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| connection::handle_socket(socket, ctx))
}
