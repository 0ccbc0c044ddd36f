//! In-memory object store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::error::{Result, StorageError};
use crate::{check_key, new_object_id, ObjectStore, Upload};

/// Keeps objects in a map. Clones share the same contents.
///
/// Failures can be switched on to exercise callers' error paths.
#[derive(Debug, Clone)]
pub struct MemoryObjectStore {
    folder: String,
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    fail_stores: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl MemoryObjectStore {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            objects: Arc::new(Mutex::new(HashMap::new())),
            fail_stores: Arc::new(AtomicBool::new(false)),
            fail_deletes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make subsequent `store` calls fail.
    pub fn fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `delete` calls fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn store(&self, upload: Upload) -> Result<String> {
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(StorageError::Gateway {
                status: 503,
                body: "store disabled".to_string(),
            });
        }

        let object_id = new_object_id();
        let key = format!("{}/{}", self.folder, object_id);
        let url = format!("memory://{}.{}", key, upload.extension());
        self.objects.lock().await.insert(key, upload.bytes);
        Ok(url)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Gateway {
                status: 503,
                body: "delete disabled".to_string(),
            });
        }

        self.objects.lock().await.remove(key);
        Ok(())
    }

    fn folder(&self) -> &str {
        &self.folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_delete_by_derived_key() {
        let store = MemoryObjectStore::new("chat_audios");
        let url = store
            .store(Upload::new(vec![1, 2, 3]).with_content_type("audio/webm"))
            .await
            .unwrap();
        assert!(url.ends_with(".webm"));

        let key = store.key_for_url(&url).unwrap();
        assert!(store.contains(&key).await);

        store.delete(&key).await.unwrap();
        assert!(store.is_empty().await);

        // Deleting again is fine
        store.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let store = MemoryObjectStore::new("chat_audios");
        store.fail_stores(true);
        assert!(store.store(Upload::new(vec![1])).await.is_err());

        store.fail_stores(false);
        let url = store.store(Upload::new(vec![1])).await.unwrap();
        let key = store.key_for_url(&url).unwrap();

        store.fail_deletes(true);
        assert!(store.delete(&key).await.is_err());
        assert_eq!(store.len().await, 1);
    }
}
