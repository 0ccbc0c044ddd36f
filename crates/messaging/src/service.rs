//! The message service.

use std::sync::Arc;

use chat_types::{
    DeleteMode, DeletedMessage, MessagesSeen, ResolvedMessage, ServerEvent, User,
};
use database::validation::{normalize_text, validate_message_content, validate_participants};
use database::{conversation, message, user, Database, DatabaseError, NewMessage};
use media_store::{ObjectStore, Upload};
use relay::Relay;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};

/// Input for [`MessageService::send`].
#[derive(Debug, Clone)]
pub struct SendMessage {
    /// Authenticated sender.
    pub sender_id: String,
    pub receiver_id: String,
    pub text: Option<String>,
    pub audio: Option<Upload>,
    /// Id of the message being replied to.
    pub reply_to_id: Option<String>,
}

impl SendMessage {
    /// A plain text message.
    pub fn text(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            text: Some(text.into()),
            audio: None,
            reply_to_id: None,
        }
    }

    pub fn with_audio(mut self, audio: Upload) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn replying_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to_id = Some(message_id.into());
        self
    }
}

/// Result of [`MessageService::mark_seen`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenOutcome {
    /// `false` when the two users have never exchanged a message.
    pub conversation_found: bool,
    /// Messages flipped to seen by this call.
    pub message_ids: Vec<String>,
}

/// Result of [`MessageService::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Hidden for the caller. `newly_hidden` is false on a repeat call.
    HiddenForCaller { newly_hidden: bool },
    /// Removed for both participants.
    DeletedForEveryone,
}

/// Conversation operations with realtime fan-out.
#[derive(Clone)]
pub struct MessageService {
    db: Database,
    storage: Arc<dyn ObjectStore>,
    relay: Relay,
}

impl MessageService {
    pub fn new(db: Database, storage: Arc<dyn ObjectStore>, relay: Relay) -> Self {
        Self { db, storage, relay }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Send a message from `sender_id` to `receiver_id`.
    ///
    /// All validation happens before anything is uploaded or written. The
    /// audio payload is stored first; the message row and its position in the
    /// conversation are then committed together. Both participants receive a
    /// `newMessage` push (the sender's other sessions stay in sync).
    pub async fn send(&self, request: SendMessage) -> Result<ResolvedMessage> {
        let pool = self.db.pool();
        let sender = request.sender_id.as_str();
        let receiver = request.receiver_id.as_str();

        validate_participants(sender, receiver)?;
        let text = normalize_text(request.text.as_deref());
        let audio = request.audio.filter(|upload| !upload.bytes.is_empty());
        validate_message_content(text.as_deref(), audio.is_some())?;

        if !user::user_exists(pool, receiver).await? {
            return Err(ServiceError::NotFound {
                entity: "User",
                id: receiver.to_string(),
            });
        }

        let reply_to_id = request
            .reply_to_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        if let Some(reply_id) = reply_to_id {
            self.check_reply_target(reply_id, sender, receiver).await?;
        }

        let conversation = conversation::find_or_create(pool, sender, receiver).await?;

        let audio_url = match audio {
            Some(upload) => Some(self.storage.store(upload).await?),
            None => None,
        };

        let new_message = NewMessage {
            conversation_id: conversation.id.clone(),
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            text,
            audio_url: audio_url.clone(),
            reply_to_id: reply_to_id.map(str::to_string),
        };

        let stored = match message::create_message(pool, &new_message).await {
            Ok(stored) => stored,
            Err(err) => {
                if let Some(url) = &audio_url {
                    self.discard_object(url).await;
                }
                return Err(err.into());
            }
        };

        let resolved = message::get_resolved(pool, &stored.id).await?;

        info!(
            message = %stored.id,
            conversation = %conversation.id,
            sender = %sender,
            receiver = %receiver,
            has_audio = audio_url.is_some(),
            "Message sent"
        );

        self.relay
            .notify_all(&[receiver, sender], ServerEvent::NewMessage(resolved.clone()));

        Ok(resolved)
    }

    /// Messages between `caller_id` and `other_id`, oldest first.
    ///
    /// Returns an empty list when the two have no conversation yet. Messages
    /// the caller deleted for themselves are omitted.
    pub async fn list(&self, caller_id: &str, other_id: &str) -> Result<Vec<ResolvedMessage>> {
        let pool = self.db.pool();

        let Some(conversation) = conversation::find_by_participants(pool, caller_id, other_id).await?
        else {
            debug!(caller = %caller_id, other = %other_id, "No conversation yet");
            return Ok(Vec::new());
        };

        let messages = message::list_resolved(pool, &conversation.id).await?;

        Ok(messages
            .into_iter()
            .filter(|m| !m.message.is_deleted_for(caller_id))
            .collect())
    }

    /// Mark everything `other_id` sent to `caller_id` as seen.
    ///
    /// The flip is one set-based update. When it changed anything, `other_id`
    /// receives a `messagesSeen` push with the affected ids.
    pub async fn mark_seen(&self, caller_id: &str, other_id: &str) -> Result<SeenOutcome> {
        let pool = self.db.pool();

        let Some(conversation) = conversation::find_by_participants(pool, caller_id, other_id).await?
        else {
            return Ok(SeenOutcome {
                conversation_found: false,
                message_ids: Vec::new(),
            });
        };

        let message_ids = message::mark_seen(pool, &conversation.id, caller_id, other_id).await?;

        if !message_ids.is_empty() {
            info!(
                conversation = %conversation.id,
                reader = %caller_id,
                count = message_ids.len(),
                "Messages marked as seen"
            );

            self.relay.notify(
                other_id,
                ServerEvent::MessagesSeen(MessagesSeen {
                    conversation_id: conversation.id.clone(),
                    seen_by: caller_id.to_string(),
                    message_ids: message_ids.clone(),
                }),
            );
        }

        Ok(SeenOutcome {
            conversation_found: true,
            message_ids,
        })
    }

    /// Delete a message.
    ///
    /// `mode` is the raw `me` / `everyone` parameter; anything else is a
    /// validation error. Deleting for everyone is reserved to the sender and
    /// always succeeds once authorized, even if the audio object cannot be
    /// removed from storage.
    pub async fn delete(
        &self,
        caller_id: &str,
        message_id: &str,
        mode: Option<&str>,
    ) -> Result<DeleteOutcome> {
        let mode: DeleteMode = mode
            .ok_or_else(|| ServiceError::validation("Delete mode is required (\"me\" or \"everyone\")"))?
            .parse()
            .map_err(|e: chat_types::ParseDeleteModeError| ServiceError::validation(e.to_string()))?;

        let pool = self.db.pool();
        let target = message::get_message(pool, message_id).await?;

        match mode {
            DeleteMode::Me => {
                if !target.involves(caller_id) {
                    return Err(ServiceError::forbidden(
                        "Unauthorized to delete this message for yourself",
                    ));
                }

                let newly_hidden = message::add_deleted_for(pool, &target.id, caller_id).await?;
                debug!(message = %target.id, user = %caller_id, newly_hidden, "Message hidden");

                Ok(DeleteOutcome::HiddenForCaller { newly_hidden })
            }
            DeleteMode::Everyone => {
                if target.sender_id != caller_id {
                    return Err(ServiceError::forbidden(
                        "Unauthorized to delete this message for everyone",
                    ));
                }

                if let Some(url) = &target.audio {
                    self.discard_object(url).await;
                }

                message::delete_message(pool, &target).await?;

                info!(
                    message = %target.id,
                    conversation = %target.conversation_id,
                    "Message deleted for everyone"
                );

                let event = ServerEvent::DeleteMessage(DeletedMessage {
                    message_id: target.id.clone(),
                });
                match conversation::get_conversation(pool, &target.conversation_id).await {
                    Ok(conversation) => {
                        self.relay.notify_all(&conversation.participants(), event);
                    }
                    Err(err) => {
                        warn!(
                            conversation = %target.conversation_id,
                            error = %err,
                            "Could not load conversation for delete broadcast"
                        );
                    }
                }

                Ok(DeleteOutcome::DeletedForEveryone)
            }
        }
    }

    /// Everyone except the caller, for the conversation picker.
    pub async fn contacts(&self, caller_id: &str) -> Result<Vec<User>> {
        Ok(user::list_other_users(self.db.pool(), caller_id).await?)
    }

    /// A reply target must exist and belong to the same pair of users.
    async fn check_reply_target(&self, reply_id: &str, sender: &str, receiver: &str) -> Result<()> {
        match message::get_message(self.db.pool(), reply_id).await {
            Ok(target) if target.involves(sender) && target.involves(receiver) => Ok(()),
            Ok(_) => Err(ServiceError::validation(
                "Replied message belongs to another conversation",
            )),
            Err(DatabaseError::NotFound { .. }) => {
                Err(ServiceError::validation("Replied message not found"))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Best-effort removal of a stored object; failures are only logged.
    async fn discard_object(&self, url: &str) {
        let Some(key) = self.storage.key_for_url(url) else {
            warn!(url, "Cannot derive object key from URL");
            return;
        };

        if let Err(err) = self.storage.delete(&key).await {
            warn!(key = %key, error = %err, "Failed to delete stored object");
        }
    }
}
