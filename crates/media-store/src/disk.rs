//! Local directory object store.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;
use crate::{check_key, new_object_id, ObjectStore, Upload};

/// Stores objects as files under `<root>/<folder>/`.
///
/// URLs are built from `public_base`, which the server is expected to map back
/// onto `root` (e.g. `/media` served from `uploads/`).
#[derive(Debug, Clone)]
pub struct DiskObjectStore {
    root: PathBuf,
    public_base: String,
    folder: String,
}

impl DiskObjectStore {
    pub fn new(
        root: impl Into<PathBuf>,
        public_base: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        let root = root.into();
        let public_base = public_base.into().trim_end_matches('/').to_string();
        let folder = folder.into();
        info!(root = %root.display(), public_base = %public_base, folder = %folder, "Using disk object store");
        Self {
            root,
            public_base,
            folder,
        }
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn store(&self, upload: Upload) -> Result<String> {
        check_key(&self.folder)?;

        let dir = self.root.join(&self.folder);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", new_object_id(), upload.extension());
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &upload.bytes).await?;

        debug!(path = %path.display(), size = upload.bytes.len(), "Stored object on disk");

        Ok(format!("{}/{}/{}", self.public_base, self.folder, file_name))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;

        let (folder, object_id) = match key.rsplit_once('/') {
            Some(parts) => parts,
            None => ("", key),
        };
        let dir = self.root.join(folder);

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.split('.').next() == Some(object_id) {
                tokio::fs::remove_file(entry.path()).await?;
                debug!(key, file = %name, "Deleted object from disk");
            }
        }

        Ok(())
    }

    fn folder(&self) -> &str {
        &self.folder
    }
}
