//! Object storage gateway for audio attachments.
//!
//! Uploaded blobs are stored under `<folder>/<object id>.<ext>` and addressed
//! afterwards by a key derived from their public URL (`<folder>/<object id>`),
//! so a message only needs to remember the URL.
//!
//! Three backends implement [`ObjectStore`]:
//! - [`HttpObjectStore`] - an external storage service over HTTP
//! - [`DiskObjectStore`] - a local directory served back by the chat server
//! - [`MemoryObjectStore`] - in-process, for tests
//!
//! # Example
//!
//! ```rust
//! use media_store::{MemoryObjectStore, ObjectStore, Upload};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> media_store::Result<()> {
//! let store = MemoryObjectStore::new("chat_audios");
//! let url = store.store(Upload::new(vec![1, 2, 3]).with_file_name("voice.webm")).await?;
//!
//! let key = store.key_for_url(&url).expect("url has a file name");
//! store.delete(&key).await?;
//! # Ok(())
//! # }
//! ```

mod disk;
mod error;
mod http;
mod memory;

pub use disk::DiskObjectStore;
pub use error::{Result, StorageError};
pub use http::{HttpObjectStore, HttpStoreConfig};
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use bytes::Bytes;

/// Default folder for chat audio objects.
pub const DEFAULT_FOLDER: &str = "chat_audios";

/// A blob to be stored.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl Upload {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
            file_name: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// File extension for the stored object, from the file name or content type.
    pub fn extension(&self) -> &str {
        if let Some(ext) = self
            .file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return ext;
        }

        let mime = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .unwrap_or("");

        match mime {
            "audio/webm" | "video/webm" => "webm",
            "audio/ogg" => "ogg",
            "audio/mpeg" => "mp3",
            "audio/mp4" | "audio/x-m4a" => "m4a",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            _ => "bin",
        }
    }
}

/// Storage for uploaded blobs.
///
/// Implementations must be safe to share across request tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a blob and return its public URL.
    async fn store(&self, upload: Upload) -> Result<String>;

    /// Delete the object with the given key.
    ///
    /// Deleting a key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Folder that new objects are placed in.
    fn folder(&self) -> &str;

    /// Derive the object key for a URL returned by [`ObjectStore::store`].
    fn key_for_url(&self, url: &str) -> Option<String> {
        derive_object_key(url, self.folder())
    }
}

/// Derive `<folder>/<object id>` from an object URL.
///
/// The object id is the last path segment up to its first `.`; query strings
/// and fragments are ignored.
///
/// ```rust
/// assert_eq!(
///     media_store::derive_object_key("https://cdn.example.com/v1/chat_audios/abc123.webm", "chat_audios"),
///     Some("chat_audios/abc123".to_string())
/// );
/// ```
pub fn derive_object_key(url: &str, folder: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = path.trim_end_matches('/').rsplit('/').next()?;
    let object_id = file_name.split('.').next()?;

    if object_id.is_empty() {
        return None;
    }

    Some(format!("{}/{}", folder, object_id))
}

/// Generate a fresh object id.
pub(crate) fn new_object_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Reject keys that could escape the storage root.
pub(crate) fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && key
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
