//! Application state shared across handlers.

use std::time::Duration;

use messaging::MessageService;
use relay::Relay;

use crate::auth::SessionKeys;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Conversation operations.
    pub service: MessageService,
    /// Session token verification.
    pub sessions: SessionKeys,
    /// WebSocket keepalive interval.
    pub ws_ping: Duration,
}

impl AppState {
    /// Create new application state.
    pub fn new(service: MessageService, sessions: SessionKeys, ws_ping: Duration) -> Self {
        Self {
            service,
            sessions,
            ws_ping,
        }
    }

    pub fn relay(&self) -> &Relay {
        self.service.relay()
    }
}
