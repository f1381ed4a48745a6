// WebSocket /ws/live: pushes the live status on every tick

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::LiveStatus;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the live connection count on drop (connect = +1, drop = -1).
struct WsLiveGuard(Arc<AtomicUsize>);

impl Drop for WsLiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub(super) async fn ws_live(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let rx = state.live_rx.clone();
    let conn_count = state.ws_live_connections.clone();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_live(socket, rx, conn_count).await {
            tracing::info!("Live stream error: {}", e);
        }
    })
}

async fn stream_live(
    mut socket: WebSocket,
    mut rx: watch::Receiver<LiveStatus>,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, Ordering::Relaxed);
    let _guard = WsLiveGuard(conn_count);
    tracing::info!("Client connected to live stream");

    // Current value first so the widget has something to draw before the next tick.
    let first = serde_json::to_string(&*rx.borrow_and_update())?;
    if !send(&mut socket, Message::Text(first.into())).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let json = serde_json::to_string(&*rx.borrow_and_update())?;
                if !send(&mut socket, Message::Text(json.into())).await {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if !send(&mut socket, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// False when the client is gone or too slow.
async fn send(socket: &mut WebSocket, msg: Message) -> bool {
    matches!(timeout(WS_SEND_TIMEOUT, socket.send(msg)).await, Ok(Ok(())))
}
