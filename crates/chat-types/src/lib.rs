//! Shared types for the Duet chat workspace.
//!
//! Both the server crates and the client library speak the same wire format,
//! so the records and realtime events are defined once here:
//!
//! - [`User`], [`Conversation`], [`Message`], [`ResolvedMessage`] - persisted records
//! - [`DeleteMode`] - the two ways a message can be deleted
//! - [`ServerEvent`] / [`ClientEvent`] - realtime relay payloads
//!
//! # Example
//!
//! ```rust
//! use chat_types::{ServerEvent, DeletedMessage};
//!
//! let event = ServerEvent::DeleteMessage(DeletedMessage {
//!     message_id: "m-1".to_string(),
//! });
//! let json = serde_json::to_string(&event).unwrap();
//! assert_eq!(json, r#"{"event":"deleteMessage","data":{"messageId":"m-1"}}"#);
//! ```

mod events;
mod models;

pub use events::{ClientEvent, DeletedMessage, MessagesSeen, ServerEvent};
pub use models::{
    canonical_pair, Conversation, DeleteMode, Message, ParseDeleteModeError, ResolvedMessage,
    User,
};
