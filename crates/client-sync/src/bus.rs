//! Single-threaded dispatch of relay events to subscribers.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use chat_types::ServerEvent;
use tracing::{debug, warn};

type Handler = Rc<dyn Fn(&ServerEvent)>;

#[derive(Default)]
struct Registry {
    handlers: RefCell<Vec<(u64, Handler)>>,
    next_id: Cell<u64>,
}

/// Routes [`ServerEvent`]s received from the relay to registered handlers.
///
/// Handlers run on the thread that calls [`dispatch`](EventBus::dispatch),
/// in registration order. Clones share the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It stays registered until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ServerEvent) + 'static,
    {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        self.registry
            .handlers
            .borrow_mut()
            .push((id, Rc::new(handler)));

        Subscription {
            registry: Rc::downgrade(&self.registry),
            id,
        }
    }

    /// Deliver an event to every current handler.
    ///
    /// Handlers may subscribe or unsubscribe while running; such changes take
    /// effect from the next dispatch.
    pub fn dispatch(&self, event: &ServerEvent) {
        let handlers: Vec<Handler> = self
            .registry
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();

        debug!(event = event.name(), handlers = handlers.len(), "Dispatching event");
        for handler in handlers {
            handler(event);
        }
    }

    /// Parse a raw relay frame and dispatch it.
    pub fn dispatch_frame(&self, frame: &str) -> Result<(), serde_json::Error> {
        let event: ServerEvent = serde_json::from_str(frame).map_err(|e| {
            warn!(error = %e, "Unrecognized relay frame");
            e
        })?;
        self.dispatch(&event);
        Ok(())
    }

    pub fn handler_count(&self) -> usize {
        self.registry.handlers.borrow().len()
    }
}

/// Registration handle returned by [`EventBus::subscribe`].
pub struct Subscription {
    registry: Weak<Registry>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .handlers
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));

        let counter = Rc::clone(&hits);
        let sub = bus.subscribe(move |_| counter.set(counter.get() + 1));

        bus.dispatch(&ServerEvent::UserTyping("bob".to_string()));
        assert_eq!(hits.get(), 1);

        drop(sub);
        assert_eq!(bus.handler_count(), 0);
        bus.dispatch(&ServerEvent::UserTyping("bob".to_string()));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_dispatch_frame() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&seen);
        let _sub = bus.subscribe(move |e| log.borrow_mut().push(e.name()));

        bus.dispatch_frame(r#"{"event":"userStopTyping","data":"bob"}"#).unwrap();
        assert!(bus.dispatch_frame("not json").is_err());

        assert_eq!(*seen.borrow(), vec!["userStopTyping"]);
    }

    #[test]
    fn test_handler_may_unsubscribe_during_dispatch() {
        let bus = EventBus::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let inner = Rc::clone(&slot);
        let sub = bus.subscribe(move |_| {
            inner.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(sub);

        bus.dispatch(&ServerEvent::OnlineUsers(Vec::new()));
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus = EventBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        drop(sub);
    }
}
