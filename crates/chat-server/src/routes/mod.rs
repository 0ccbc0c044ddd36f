//! Route handlers for the chat API.

pub mod health;
pub mod messages;
pub mod users;
pub mod ws;


use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Conversations
        .route(
            "/api/conversations/:other_id/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/api/conversations/:other_id/seen", post(messages::mark_seen))
        .route("/api/messages/:message_id", delete(messages::delete_message))
        // Users
        .route("/api/users", get(users::list_users))
        // Realtime
        .route("/api/ws", get(ws::ws_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
