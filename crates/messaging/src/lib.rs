//! Message service for Duet chat.
//!
//! [`MessageService`] implements the four conversation operations on top of
//! the persistent store, the object storage gateway and the realtime relay:
//!
//! - [`send`](MessageService::send) - create a message (and its conversation on first use)
//! - [`list`](MessageService::list) - ordered messages with reply targets resolved
//! - [`mark_seen`](MessageService::mark_seen) - bulk read receipt
//! - [`delete`](MessageService::delete) - hide for me, or remove for everyone
//!
//! Realtime pushes happen after the store has committed and never affect the
//! operation's result.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use database::{user, Database, NewUser};
//! use media_store::MemoryObjectStore;
//! use messaging::{MessageService, SendMessage};
//! use relay::Relay;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::in_memory().await?;
//! let alice = user::create_user(db.pool(), &NewUser::new("alice", "Alice")).await?;
//! let bob = user::create_user(db.pool(), &NewUser::new("bob", "Bob")).await?;
//!
//! let service = MessageService::new(db, Arc::new(MemoryObjectStore::new("chat_audios")), Relay::new());
//!
//! let sent = service.send(SendMessage::text(&alice.id, &bob.id, "hi")).await?;
//! let history = service.list(&bob.id, &alice.id).await?;
//! assert_eq!(history.last().map(|m| m.id()), Some(sent.id()));
//! # Ok(())
//! # }
//! ```

mod error;
mod service;

pub use error::{Result, ServiceError};
pub use service::{DeleteOutcome, MessageService, SeenOutcome, SendMessage};
