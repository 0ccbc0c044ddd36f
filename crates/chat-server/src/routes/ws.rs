//! WebSocket endpoint for the realtime relay.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use chat_types::ClientEvent;
use database::user;
use futures::{SinkExt, StreamExt};
use relay::Connection;
use tracing::{debug, info, warn};

use crate::auth::SessionUser;
use crate::state::AppState;

/// GET /api/ws
pub async fn ws_handler(
    State(state): State<AppState>,
    user: SessionUser,
    ws: WebSocketUpgrade,
) -> Response {
    info!(user = %user.id, "WebSocket upgrade request");
    ws.on_upgrade(move |socket| handle_socket(socket, state, user.id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let Connection {
        id: conn_id,
        events: mut event_rx,
        ..
    } = state.relay().connect(&user_id);

    // Relay events and keepalive pings out to the client
    let ping_every = state.ws_ping;
    let send_user = user_id.clone();
    let mut send_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_every);
        ping.tick().await;

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(user = %send_user, error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Client frames: typing indicators
    let recv_state = state.clone();
    let recv_user = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => forward_client_event(&recv_state, &recv_user, event).await,
                    Err(e) => {
                        debug!(user = %recv_user, error = %e, "Ignoring unrecognized frame");
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(user = %recv_user, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.relay().disconnect(&user_id, conn_id);
    info!(user = %user_id, connection = conn_id, "WebSocket connection closed");
}

/// Forward a typing frame, provided it addresses a registered user.
async fn forward_client_event(state: &AppState, from_user: &str, event: ClientEvent) {
    let pool = state.service.database().pool();
    let known = user::user_exists(pool, event.peer()).await;
    match known {
        Ok(true) => {
            state.relay().forward(from_user, event);
        }
        Ok(false) => {
            debug!(user = %from_user, peer = %event.peer(), "Dropping frame for unknown user");
        }
        Err(e) => {
            warn!(user = %from_user, error = %e, "Failed to look up frame addressee");
        }
    }
}
