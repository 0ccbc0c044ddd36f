//! Access to the chat server's HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use chat_types::{DeleteMode, ResolvedMessage, User};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ClientError, Result};

/// An audio recording to attach to a message.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

impl AudioClip {
    /// A WebM recording, the format browsers produce.
    pub fn webm(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "audio/webm".to_string(),
            file_name: "audio.webm".to_string(),
        }
    }
}

/// A message about to be sent.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub text: Option<String>,
    pub audio: Option<AudioClip>,
    pub reply_to_id: Option<String>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn audio(clip: AudioClip) -> Self {
        Self {
            audio: Some(clip),
            ..Self::default()
        }
    }

    pub fn replying_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to_id = Some(message_id.into());
        self
    }
}

/// Body of a mark-seen response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenReceipt {
    pub message: String,
    pub conversation_found: bool,
    #[serde(default)]
    pub message_ids: Vec<String>,
}

/// Operations the client performs against the server.
#[async_trait]
pub trait ChatApi {
    async fn list_messages(&self, peer_id: &str) -> Result<Vec<ResolvedMessage>>;

    async fn send_message(&self, peer_id: &str, message: OutgoingMessage) -> Result<ResolvedMessage>;

    async fn mark_seen(&self, peer_id: &str) -> Result<SeenReceipt>;

    async fn delete_message(&self, message_id: &str, mode: DeleteMode) -> Result<()>;

    async fn list_users(&self) -> Result<Vec<User>>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`ChatApi`] over HTTP with a bearer session token.
#[derive(Clone)]
pub struct HttpChatApi {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let resp = request.bearer_auth(&self.token).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        debug!(status = status.as_u16(), %message, "Chat API error");

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        Ok(self.execute(request).await?.json().await?)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_messages(&self, peer_id: &str) -> Result<Vec<ResolvedMessage>> {
        let url = self.url(&format!("/api/conversations/{}/messages", peer_id));
        self.json(self.http.get(url)).await
    }

    async fn send_message(&self, peer_id: &str, message: OutgoingMessage) -> Result<ResolvedMessage> {
        let mut form = Form::new();
        if let Some(text) = message.text {
            form = form.text("message", text);
        }
        if let Some(clip) = message.audio {
            let part = Part::bytes(clip.bytes)
                .file_name(clip.file_name)
                .mime_str(&clip.content_type)?;
            form = form.part("audio", part);
        }
        if let Some(reply_to_id) = message.reply_to_id {
            form = form.text("repliedMessageId", reply_to_id);
        }

        let url = self.url(&format!("/api/conversations/{}/messages", peer_id));
        self.json(self.http.post(url).multipart(form)).await
    }

    async fn mark_seen(&self, peer_id: &str) -> Result<SeenReceipt> {
        let url = self.url(&format!("/api/conversations/{}/seen", peer_id));
        self.json(self.http.post(url)).await
    }

    async fn delete_message(&self, message_id: &str, mode: DeleteMode) -> Result<()> {
        let url = self.url(&format!("/api/messages/{}", message_id));
        self.execute(self.http.delete(url).query(&[("mode", mode.as_str())]))
            .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.json(self.http.get(self.url("/api/users"))).await
    }
}
