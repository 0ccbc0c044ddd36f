//! Database models.
//!
//! Rows are decoded into the `*Row` structs here and converted into the shared
//! [`chat_types`] records handed to the rest of the workspace.

use chat_types::{Conversation, Message, ResolvedMessage, User};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Input for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub profile_pic: String,
}

impl NewUser {
    /// A user with a generated avatar URL.
    pub fn new(username: impl Into<String>, full_name: impl Into<String>) -> Self {
        let username = username.into();
        let profile_pic = format!("https://avatar.iran.liara.run/public?username={}", username);
        Self {
            username,
            full_name: full_name.into(),
            profile_pic,
        }
    }
}

/// Input for creating a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: Option<String>,
    pub audio_url: Option<String>,
    pub reply_to_id: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRow {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub profile_pic: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            profile_pic: row.profile_pic,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ConversationRow {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            participant_a: row.participant_a,
            participant_b: row.participant_b,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A message row with its soft-delete set folded into a comma-separated column.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: Option<String>,
    pub audio_url: Option<String>,
    pub reply_to_id: Option<String>,
    pub is_seen: bool,
    pub deleted_for: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            text: row.body,
            audio: row.audio_url,
            reply_to_id: row.reply_to_id,
            is_seen: row.is_seen,
            deleted_for: split_ids(row.deleted_for),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A message row joined with its (possibly missing) reply target.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ResolvedRow {
    #[sqlx(flatten)]
    pub message: MessageRow,
    pub r_id: Option<String>,
    pub r_conversation_id: Option<String>,
    pub r_sender_id: Option<String>,
    pub r_receiver_id: Option<String>,
    pub r_body: Option<String>,
    pub r_audio_url: Option<String>,
    pub r_reply_to_id: Option<String>,
    pub r_is_seen: Option<bool>,
    pub r_deleted_for: Option<String>,
    pub r_created_at: Option<String>,
    pub r_updated_at: Option<String>,
}

impl From<ResolvedRow> for ResolvedMessage {
    fn from(row: ResolvedRow) -> Self {
        let reply_to = match (
            row.r_id,
            row.r_conversation_id,
            row.r_sender_id,
            row.r_receiver_id,
        ) {
            (Some(id), Some(conversation_id), Some(sender_id), Some(receiver_id)) => Some(Message {
                id,
                conversation_id,
                sender_id,
                receiver_id,
                text: row.r_body,
                audio: row.r_audio_url,
                reply_to_id: row.r_reply_to_id,
                is_seen: row.r_is_seen.unwrap_or(false),
                deleted_for: split_ids(row.r_deleted_for),
                created_at: row.r_created_at.unwrap_or_default(),
                updated_at: row.r_updated_at.unwrap_or_default(),
            }),
            _ => None,
        };

        ResolvedMessage {
            message: row.message.into(),
            reply_to,
        }
    }
}

fn split_ids(joined: Option<String>) -> Vec<String> {
    joined
        .map(|s| {
            s.split(',')
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ids() {
        assert!(split_ids(None).is_empty());
        assert_eq!(split_ids(Some("a,b".to_string())), vec!["a", "b"]);
        assert_eq!(split_ids(Some("a".to_string())), vec!["a"]);
    }
}
