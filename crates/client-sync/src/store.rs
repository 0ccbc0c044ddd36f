//! Local state for one client session.

use chat_types::{MessagesSeen, ResolvedMessage};

/// What a client shows for the selected conversation.
///
/// Every transition is a plain method; nothing here performs I/O. One store
/// exists per session and is handed to whoever needs it.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    selected_peer: Option<String>,
    messages: Vec<ResolvedMessage>,
    peer_typing: bool,
    reply_draft: Option<ResolvedMessage>,
    online_users: Vec<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_peer(&self) -> Option<&str> {
        self.selected_peer.as_deref()
    }

    pub fn messages(&self) -> &[ResolvedMessage] {
        &self.messages
    }

    pub fn is_peer_typing(&self) -> bool {
        self.peer_typing
    }

    pub fn reply_draft(&self) -> Option<&ResolvedMessage> {
        self.reply_draft.as_ref()
    }

    pub fn online_users(&self) -> &[String] {
        &self.online_users
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.online_users.iter().any(|id| id == user_id)
    }

    /// Switch to the conversation with `peer_id`.
    ///
    /// Selecting a different peer clears messages, typing and the reply
    /// draft. Returns whether the selection changed.
    pub fn select_conversation(&mut self, peer_id: &str) -> bool {
        if self.selected_peer.as_deref() == Some(peer_id) {
            return false;
        }
        self.selected_peer = Some(peer_id.to_string());
        self.messages.clear();
        self.peer_typing = false;
        self.reply_draft = None;
        true
    }

    /// Replace the message list with an authoritative copy from the server.
    pub fn set_messages(&mut self, messages: Vec<ResolvedMessage>) {
        self.messages = messages;
        if let Some(draft) = &self.reply_draft {
            if !self.messages.iter().any(|m| m.id() == draft.id()) {
                self.reply_draft = None;
            }
        }
    }

    fn belongs_to_selected(&self, message: &ResolvedMessage) -> bool {
        match self.selected_peer.as_deref() {
            Some(peer) => message.message.involves(peer),
            None => false,
        }
    }

    /// Apply a `newMessage`. Returns whether the list changed.
    ///
    /// Messages for other conversations and duplicates are ignored.
    pub fn apply_new_message(&mut self, message: ResolvedMessage) -> bool {
        if !self.belongs_to_selected(&message) {
            return false;
        }
        if self.messages.iter().any(|m| m.id() == message.id()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Apply a `messagesSeen` receipt. Only receipts from the selected peer count.
    pub fn apply_seen(&mut self, receipt: &MessagesSeen) -> usize {
        if self.selected_peer.as_deref() != Some(receipt.seen_by.as_str()) {
            return 0;
        }
        self.mark_seen_local(&receipt.message_ids)
    }

    /// Set the seen flag on the listed messages. Returns how many changed.
    pub fn mark_seen_local(&mut self, message_ids: &[String]) -> usize {
        let mut changed = 0;
        for m in self.messages.iter_mut() {
            if !m.message.is_seen && message_ids.iter().any(|id| id == &m.message.id) {
                m.message.is_seen = true;
                changed += 1;
            }
        }
        changed
    }

    /// Apply a `deleteMessage`. Returns whether the message was present.
    ///
    /// Replies that quoted the removed message lose their resolved target.
    pub fn apply_delete(&mut self, message_id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id() != message_id);

        for m in self.messages.iter_mut() {
            if m.reply_to.as_ref().is_some_and(|r| r.id == message_id) {
                m.reply_to = None;
            }
        }

        if self.reply_draft.as_ref().is_some_and(|d| d.id() == message_id) {
            self.reply_draft = None;
        }

        before != self.messages.len()
    }

    pub fn apply_typing(&mut self, from_user: &str) {
        if self.selected_peer.as_deref() == Some(from_user) {
            self.peer_typing = true;
        }
    }

    pub fn apply_stop_typing(&mut self, from_user: &str) {
        if self.selected_peer.as_deref() == Some(from_user) {
            self.peer_typing = false;
        }
    }

    pub fn apply_online_users(&mut self, users: Vec<String>) {
        self.online_users = users;
    }

    /// Start replying to a message of the current conversation.
    pub fn set_reply_draft(&mut self, message_id: &str) -> bool {
        match self.messages.iter().find(|m| m.id() == message_id) {
            Some(m) => {
                self.reply_draft = Some(m.clone());
                true
            }
            None => false,
        }
    }

    pub fn clear_reply_draft(&mut self) {
        self.reply_draft = None;
    }

    /// Whether the peer sent something the local user has not seen yet.
    pub fn has_unseen_from_peer(&self) -> bool {
        let Some(peer) = self.selected_peer.as_deref() else {
            return false;
        };
        self.messages
            .iter()
            .any(|m| m.message.sender_id == peer && !m.message.is_seen)
    }
}
