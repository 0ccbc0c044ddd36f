//! Persisted chat records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable user identifier.
    pub id: String,
    /// Unique login handle.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Avatar URL.
    pub profile_pic: String,
}

/// The unique container for all messages between two users.
///
/// Participants are stored canonicalized: `participant_a < participant_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    /// Both participant ids.
    pub fn participants(&self) -> [&str; 2] {
        [&self.participant_a, &self.participant_b]
    }
}

/// Order a participant pair so that the same two users always map to the same key.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    /// Text body. Absent only when `audio` is present.
    pub text: Option<String>,
    /// URL of the audio attachment.
    pub audio: Option<String>,
    /// Id of the message this one replies to. May dangle after a hard delete.
    pub reply_to_id: Option<String>,
    pub is_seen: bool,
    /// Users who deleted this message for themselves only.
    #[serde(default)]
    pub deleted_for: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Message {
    /// Whether the message is hidden for `user_id`.
    pub fn is_deleted_for(&self, user_id: &str) -> bool {
        self.deleted_for.iter().any(|id| id == user_id)
    }

    /// Whether `user_id` is the sender or the receiver.
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

/// A message with its reply target resolved one level deep.
///
/// `reply_to` is `None` both when the message is not a reply and when the
/// target has since been deleted for everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub reply_to: Option<Message>,
}

impl ResolvedMessage {
    pub fn id(&self) -> &str {
        &self.message.id
    }
}

/// How a message should be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Hide the message for the caller only.
    Me,
    /// Remove the message for both participants. Sender only.
    Everyone,
}

impl DeleteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteMode::Me => "me",
            DeleteMode::Everyone => "everyone",
        }
    }
}

impl fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a delete mode string is neither `me` nor `everyone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid delete mode: {0:?} (expected \"me\" or \"everyone\")")]
pub struct ParseDeleteModeError(pub String);

impl FromStr for DeleteMode {
    type Err = ParseDeleteModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "me" => Ok(DeleteMode::Me),
            "everyone" => Ok(DeleteMode::Everyone),
            other => Err(ParseDeleteModeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "c-1".to_string(),
            sender_id: "alice".to_string(),
            receiver_id: "bob".to_string(),
            text: Some("hi".to_string()),
            audio: None,
            reply_to_id: None,
            is_seen: false,
            deleted_for: vec!["bob".to_string()],
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_canonical_pair_is_order_independent() {
        assert_eq!(canonical_pair("bob", "alice"), ("alice", "bob"));
        assert_eq!(canonical_pair("alice", "bob"), ("alice", "bob"));
    }

    #[test]
    fn test_delete_mode_parse() {
        assert_eq!("me".parse::<DeleteMode>(), Ok(DeleteMode::Me));
        assert_eq!("everyone".parse::<DeleteMode>(), Ok(DeleteMode::Everyone));
        assert!("Everyone".parse::<DeleteMode>().is_err());
        assert!("".parse::<DeleteMode>().is_err());
    }

    #[test]
    fn test_resolved_message_serializes_flat() {
        let resolved = ResolvedMessage {
            message: message("m-2"),
            reply_to: Some(message("m-1")),
        };
        let value = serde_json::to_value(&resolved).unwrap();
        assert_eq!(value["id"], "m-2");
        assert_eq!(value["senderId"], "alice");
        assert_eq!(value["replyTo"]["id"], "m-1");
        assert_eq!(value["deletedFor"][0], "bob");

        let back: ResolvedMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, resolved);
    }

    #[test]
    fn test_is_deleted_for() {
        let msg = message("m-1");
        assert!(msg.is_deleted_for("bob"));
        assert!(!msg.is_deleted_for("alice"));
    }
}
