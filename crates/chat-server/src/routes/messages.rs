//! Conversation and message routes.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chat_types::ResolvedMessage;
use media_store::Upload;
use messaging::{DeleteOutcome, SendMessage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::SessionUser;
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Response for mark-seen.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenResponse {
    pub message: String,
    pub conversation_found: bool,
    pub message_ids: Vec<String>,
}

/// Query parameters for delete.
#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(alias = "deleteType")]
    pub mode: Option<String>,
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub message: String,
}

/// GET /api/conversations/:other_id/messages
pub async fn list_messages(
    State(state): State<AppState>,
    user: SessionUser,
    Path(other_id): Path<String>,
) -> Result<Json<Vec<ResolvedMessage>>> {
    let messages = state.service.list(&user.id, &other_id).await?;
    Ok(Json(messages))
}

/// POST /api/conversations/:other_id/messages
///
/// Multipart fields: `message` (text), `audio` (file), `repliedMessageId`.
/// Unknown fields are ignored.
pub async fn send_message(
    State(state): State<AppState>,
    user: SessionUser,
    Path(other_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResolvedMessage>)> {
    let mut request = SendMessage {
        sender_id: user.id,
        receiver_id: other_id,
        text: None,
        audio: None,
        reply_to_id: None,
    };

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "message" => request.text = Some(field.text().await?),
            "repliedMessageId" => request.reply_to_id = Some(field.text().await?),
            "audio" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;

                let mut upload = Upload::new(bytes);
                if let Some(content_type) = content_type {
                    upload = upload.with_content_type(content_type);
                }
                if let Some(file_name) = file_name {
                    upload = upload.with_file_name(file_name);
                }
                request.audio = Some(upload);
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let message = state.service.send(request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/conversations/:other_id/seen
pub async fn mark_seen(
    State(state): State<AppState>,
    user: SessionUser,
    Path(other_id): Path<String>,
) -> Result<Json<SeenResponse>> {
    let outcome = state.service.mark_seen(&user.id, &other_id).await?;

    let message = if !outcome.conversation_found {
        "No conversation found"
    } else if outcome.message_ids.is_empty() {
        "No new messages to mark as seen"
    } else {
        "Messages marked as seen"
    };

    Ok(Json(SeenResponse {
        message: message.to_string(),
        conversation_found: outcome.conversation_found,
        message_ids: outcome.message_ids,
    }))
}

/// DELETE /api/messages/:message_id?mode=me|everyone
pub async fn delete_message(
    State(state): State<AppState>,
    user: SessionUser,
    Path(message_id): Path<String>,
    params: std::result::Result<Query<DeleteParams>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<Ack>> {
    let Query(params) =
        params.map_err(|e| ApiError::BadRequest(format!("Invalid query: {}", e.body_text())))?;

    let outcome = state
        .service
        .delete(&user.id, &message_id, params.mode.as_deref())
        .await?;

    let message = match outcome {
        DeleteOutcome::HiddenForCaller { .. } => "Message deleted for you",
        DeleteOutcome::DeletedForEveryone => "Message deleted for everyone",
    };

    Ok(Json(Ack {
        message: message.to_string(),
    }))
}
