//! Client actions that combine server calls with local state updates.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use chat_types::{DeleteMode, ResolvedMessage};
use tracing::{debug, info};

use crate::api::{ChatApi, OutgoingMessage, SeenReceipt};
use crate::error::{ClientError, Result};
use crate::hooks::SharedStore;
use crate::store::SessionStore;

/// One signed-in client: an API handle plus the session's store.
///
/// No store borrow is held across an `.await`, so relay events dispatched
/// while a request is in flight apply normally.
pub struct ClientSession<A> {
    api: A,
    store: SharedStore,
}

impl<A: ChatApi> ClientSession<A> {
    pub fn new(api: A) -> Self {
        Self::with_store(api, Rc::new(RefCell::new(SessionStore::new())))
    }

    pub fn with_store(api: A, store: SharedStore) -> Self {
        Self { api, store }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// The shared store, for mounting [`SyncHooks`](crate::SyncHooks).
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> Ref<'_, SessionStore> {
        self.store.borrow()
    }

    fn selected_peer(&self) -> Result<String> {
        self.store
            .borrow()
            .selected_peer()
            .map(str::to_string)
            .ok_or(ClientError::NoConversation)
    }

    /// Select the conversation with `peer_id` and load its messages.
    pub async fn open(&self, peer_id: &str) -> Result<()> {
        self.store.borrow_mut().select_conversation(peer_id);
        self.load(peer_id).await
    }

    /// Reload the selected conversation from the server.
    ///
    /// This is the catch-up path after missed relay events: the server's list
    /// replaces whatever the store held.
    pub async fn refetch(&self) -> Result<()> {
        let peer = self.selected_peer()?;
        self.load(&peer).await
    }

    async fn load(&self, peer_id: &str) -> Result<()> {
        let messages = self.api.list_messages(peer_id).await?;

        let mut store = self.store.borrow_mut();
        if store.selected_peer() != Some(peer_id) {
            debug!(peer = %peer_id, "Discarding messages for deselected conversation");
            return Err(ClientError::Stale);
        }
        store.set_messages(messages);
        Ok(())
    }

    /// Send to the selected peer.
    ///
    /// A pending reply draft is used when the message names no target. The
    /// server's copy is appended at once; the relay echo of the same message
    /// is later ignored as a duplicate.
    pub async fn send(&self, mut message: OutgoingMessage) -> Result<ResolvedMessage> {
        let peer = self.selected_peer()?;
        if message.reply_to_id.is_none() {
            message.reply_to_id = self
                .store
                .borrow()
                .reply_draft()
                .map(|draft| draft.id().to_string());
        }

        let sent = self.api.send_message(&peer, message).await?;

        let mut store = self.store.borrow_mut();
        store.apply_new_message(sent.clone());
        store.clear_reply_draft();
        Ok(sent)
    }

    /// Tell the server the peer's messages were read, if any are unseen.
    ///
    /// Only messages the store held when the request went out, plus the ids
    /// the server reports, are flipped locally. A message that arrives while
    /// the request is in flight stays unseen until the next call.
    pub async fn mark_seen_if_needed(&self) -> Result<Option<SeenReceipt>> {
        let (peer, pending) = {
            let store = self.store.borrow();
            let Some(peer) = store.selected_peer() else {
                return Ok(None);
            };
            let pending: Vec<String> = store
                .messages()
                .iter()
                .filter(|m| m.message.sender_id == peer && !m.message.is_seen)
                .map(|m| m.id().to_string())
                .collect();
            if pending.is_empty() {
                return Ok(None);
            }
            (peer.to_string(), pending)
        };

        let receipt = self.api.mark_seen(&peer).await?;

        let mut store = self.store.borrow_mut();
        if store.selected_peer() == Some(peer.as_str()) {
            let mut ids = pending;
            ids.extend(receipt.message_ids.iter().cloned());
            store.mark_seen_local(&ids);
        }

        Ok(Some(receipt))
    }

    /// Delete a message, then drop it from the local list.
    pub async fn delete(&self, message_id: &str, mode: DeleteMode) -> Result<()> {
        self.api.delete_message(message_id, mode).await?;
        self.store.borrow_mut().apply_delete(message_id);
        info!(message = %message_id, mode = mode.as_str(), "Message deleted");
        Ok(())
    }

    pub fn reply_to(&self, message_id: &str) -> bool {
        self.store.borrow_mut().set_reply_draft(message_id)
    }

    pub fn cancel_reply(&self) {
        self.store.borrow_mut().clear_reply_draft();
    }
}
