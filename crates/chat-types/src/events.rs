//! Realtime relay payloads.
//!
//! Every frame on the wire is `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::models::ResolvedMessage;

// ============================================================================
// Server -> Client
// ============================================================================

/// Events pushed from the server to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A message was sent in one of the user's conversations.
    NewMessage(ResolvedMessage),
    /// The peer read messages the user sent.
    MessagesSeen(MessagesSeen),
    /// A message was deleted for everyone.
    DeleteMessage(DeletedMessage),
    /// The given user started typing to the recipient.
    UserTyping(String),
    /// The given user stopped typing to the recipient.
    UserStopTyping(String),
    /// Ids of every user with at least one live connection.
    OnlineUsers(Vec<String>),
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage(_) => "newMessage",
            ServerEvent::MessagesSeen(_) => "messagesSeen",
            ServerEvent::DeleteMessage(_) => "deleteMessage",
            ServerEvent::UserTyping(_) => "userTyping",
            ServerEvent::UserStopTyping(_) => "userStopTyping",
            ServerEvent::OnlineUsers(_) => "onlineUsers",
        }
    }
}

/// Read receipt for a batch of messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesSeen {
    /// Conversation record the messages belong to.
    pub conversation_id: String,
    /// The user who read the messages.
    pub seen_by: String,
    pub message_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMessage {
    pub message_id: String,
}

// ============================================================================
// Client -> Server
// ============================================================================

/// Frames a client may send over its relay connection.
///
/// The payload is the peer's user id; a client addresses a conversation by
/// the other participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Typing(String),
    StopTyping(String),
}

impl ClientEvent {
    /// The user the frame is addressed to.
    pub fn peer(&self) -> &str {
        match self {
            ClientEvent::Typing(peer) | ClientEvent::StopTyping(peer) => peer,
        }
    }
}
