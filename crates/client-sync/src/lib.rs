//! Client-side conversation state for Duet chat.
//!
//! A [`SessionStore`] holds what one signed-in client shows: the selected
//! peer, that conversation's messages, the peer's typing indicator and a
//! reply draft. It changes in two ways:
//!
//! - [`ClientSession`] actions (open, send, mark seen, delete, refetch) call
//!   the server through a [`ChatApi`] and apply the result;
//! - [`SyncHooks`] mounted on an [`EventBus`] apply relay events as they
//!   arrive.
//!
//! Everything runs on one thread. Relay delivery is best effort, so a client
//! that may have missed events calls [`ClientSession::refetch`].
//!
//! # Example
//!
//! ```no_run
//! use client_sync::{ClientSession, EventBus, HttpChatApi, OutgoingMessage, SyncHooks};
//!
//! # async fn example() -> client_sync::Result<()> {
//! let session = ClientSession::new(HttpChatApi::new("http://127.0.0.1:5000", "token")?);
//! let bus = EventBus::new();
//! let _hooks = SyncHooks::mount(&bus, session.store());
//!
//! session.open("bob-id").await?;
//! session.send(OutgoingMessage::text("hi")).await?;
//!
//! // Frames read from the WebSocket
//! bus.dispatch_frame(r#"{"event":"userTyping","data":"bob-id"}"#).ok();
//! assert!(session.state().is_peer_typing());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod bus;
pub mod error;
pub mod hooks;
pub mod session;
pub mod store;

pub use api::{AudioClip, ChatApi, HttpChatApi, OutgoingMessage, SeenReceipt};
pub use bus::{EventBus, Subscription};
pub use error::{ClientError, Result};
pub use hooks::{SharedStore, SyncHooks};
pub use session::ClientSession;
pub use store::SessionStore;
