//! Subscribers that keep a [`SessionStore`] in step with relay events.

use std::cell::RefCell;
use std::rc::Rc;

use chat_types::ServerEvent;

use crate::bus::{EventBus, Subscription};
use crate::store::SessionStore;

/// Shared handle to a session's store.
pub type SharedStore = Rc<RefCell<SessionStore>>;

/// Relay listeners for one mounted conversation view.
///
/// Each listener is its own subscription; dropping the hooks unregisters all
/// of them, after which relay events no longer reach the store.
pub struct SyncHooks {
    _subscriptions: Vec<Subscription>,
}

impl SyncHooks {
    /// Mount all listeners on `bus`, applying events to `store`.
    pub fn mount(bus: &EventBus, store: &SharedStore) -> Self {
        Self {
            _subscriptions: vec![
                listen_messages(bus, store),
                listen_messages_seen(bus, store),
                listen_deletes(bus, store),
                listen_typing(bus, store),
                listen_presence(bus, store),
            ],
        }
    }
}

pub fn listen_messages(bus: &EventBus, store: &SharedStore) -> Subscription {
    let store = Rc::clone(store);
    bus.subscribe(move |event| {
        if let ServerEvent::NewMessage(message) = event {
            store.borrow_mut().apply_new_message(message.clone());
        }
    })
}

pub fn listen_messages_seen(bus: &EventBus, store: &SharedStore) -> Subscription {
    let store = Rc::clone(store);
    bus.subscribe(move |event| {
        if let ServerEvent::MessagesSeen(receipt) = event {
            store.borrow_mut().apply_seen(receipt);
        }
    })
}

pub fn listen_deletes(bus: &EventBus, store: &SharedStore) -> Subscription {
    let store = Rc::clone(store);
    bus.subscribe(move |event| {
        if let ServerEvent::DeleteMessage(deleted) = event {
            store.borrow_mut().apply_delete(&deleted.message_id);
        }
    })
}

pub fn listen_typing(bus: &EventBus, store: &SharedStore) -> Subscription {
    let store = Rc::clone(store);
    bus.subscribe(move |event| match event {
        ServerEvent::UserTyping(user_id) => store.borrow_mut().apply_typing(user_id),
        ServerEvent::UserStopTyping(user_id) => store.borrow_mut().apply_stop_typing(user_id),
        _ => {}
    })
}

pub fn listen_presence(bus: &EventBus, store: &SharedStore) -> Subscription {
    let store = Rc::clone(store);
    bus.subscribe(move |event| {
        if let ServerEvent::OnlineUsers(users) = event {
            store.borrow_mut().apply_online_users(users.clone());
        }
    })
}
