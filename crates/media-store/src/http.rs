//! HTTP object storage gateway client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::{check_key, new_object_id, ObjectStore, Upload, DEFAULT_FOLDER};

/// Configuration for an HTTP storage gateway.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the gateway (e.g., "https://media.example.com").
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Folder for new objects.
    pub folder: String,
}

impl HttpStoreConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            folder: DEFAULT_FOLDER.to_string(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Get the upload endpoint URL.
    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url)
    }

    /// Get the URL addressing an object key.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/objects/{}", self.base_url, key)
    }
}

/// Upload response from the gateway.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(alias = "secure_url")]
    url: String,
}

/// Client for an external object storage service.
///
/// Uploads are `POST {base}/upload` multipart forms (`folder`, `public_id`,
/// `file`) answered with `{"url": ...}`; deletes are `DELETE {base}/objects/{key}`.
#[derive(Clone)]
pub struct HttpObjectStore {
    http: Client,
    config: HttpStoreConfig,
}

impl HttpObjectStore {
    pub fn new(config: HttpStoreConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(StorageError::Config("gateway base URL is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(StorageError::Http)?;

        info!(base_url = %config.base_url, folder = %config.folder, "Using HTTP object store");

        Ok(Self { http, config })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn store(&self, upload: Upload) -> Result<String> {
        let object_id = new_object_id();
        let file_name = format!("{}.{}", object_id, upload.extension());
        let content_type = upload
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let size = upload.bytes.len();

        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(file_name)
            .mime_str(&content_type)?;

        let form = Form::new()
            .text("folder", self.config.folder.clone())
            .text("public_id", object_id.clone())
            .part("file", part);

        let resp = self
            .authorize(self.http.post(self.config.upload_url()))
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        let uploaded: UploadResponse = resp.json().await?;
        debug!(object = %object_id, size, url = %uploaded.url, "Uploaded object");
        Ok(uploaded.url)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;

        let resp = self
            .authorize(self.http.delete(self.config.object_url(key)))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!(key, status = status.as_u16(), "Deleted object");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(StorageError::Gateway {
            status: status.as_u16(),
            body,
        })
    }

    fn folder(&self) -> &str {
        &self.config.folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_urls() {
        let config = HttpStoreConfig::new("http://localhost:9000/");
        assert_eq!(config.upload_url(), "http://localhost:9000/upload");
        assert_eq!(
            config.object_url("chat_audios/abc"),
            "http://localhost:9000/objects/chat_audios/abc"
        );
        assert_eq!(config.folder, DEFAULT_FOLDER);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(matches!(
            HttpObjectStore::new(HttpStoreConfig::new("")),
            Err(StorageError::Config(_))
        ));
    }
}
