//! WebSocket event stream
//!
//! Every connected dashboard receives each [`Event`] as a JSON text frame.
//! Browsers cannot set headers on upgrades, so the token may be passed as
//! `?token=`.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::api::{AppState, Event};
use crate::auth::{AuthUser, Permission};
use crate::error::AppResult;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Route of the event stream; the only path accepting `?token=`
pub const EVENTS_PATH: &str = "/ws/events";

/// Upgrade to the event stream
#[utoipa::path(
    get,
    path = "/ws/events",
    tag = "events",
    params(("token" = Option<String>, Query, description = "Bearer token for clients that cannot set headers")),
    responses(
        (status = 101, description = "Switching to WebSocket"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    auth.require(Permission::View)?;

    let events = state.event_tx.subscribe();
    let username = auth.user.username;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, events, username)))
}

async fn handle_socket(socket: WebSocket, mut events: broadcast::Receiver<Event>, username: String) {
    info!(user = %username, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut ping = tokio::time::interval(PING_INTERVAL);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user = %username, skipped, "WebSocket client lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
            },
            _ = ping.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(user = %username, "WebSocket client disconnected");
}
