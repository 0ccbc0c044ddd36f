//! Message storage: creation, resolved reads, read receipts and deletes.

use chat_types::{Message, ResolvedMessage};
use sqlx::SqlitePool;

use crate::conversation;
use crate::error::{DatabaseError, Result};
use crate::models::{MessageRow, NewMessage, ResolvedRow};
use crate::validation::validate_message_content;

const MESSAGE_COLUMNS: &str = r#"
    m.id, m.conversation_id, m.sender_id, m.receiver_id, m.body, m.audio_url,
    m.reply_to_id, m.is_seen, m.created_at, m.updated_at,
    (SELECT GROUP_CONCAT(d.user_id, ',') FROM message_deletions d WHERE d.message_id = m.id)
        AS deleted_for
"#;

const REPLY_COLUMNS: &str = r#"
    r.id AS r_id, r.conversation_id AS r_conversation_id, r.sender_id AS r_sender_id,
    r.receiver_id AS r_receiver_id, r.body AS r_body, r.audio_url AS r_audio_url,
    r.reply_to_id AS r_reply_to_id, r.is_seen AS r_is_seen,
    r.created_at AS r_created_at, r.updated_at AS r_updated_at,
    (SELECT GROUP_CONCAT(d.user_id, ',') FROM message_deletions d WHERE d.message_id = r.id)
        AS r_deleted_for
"#;

/// Insert a message and append it to its conversation in one transaction.
///
/// Either both the message row and its position in the conversation are
/// written, or neither is.
pub async fn create_message(pool: &SqlitePool, new_message: &NewMessage) -> Result<Message> {
    validate_message_content(new_message.text.as_deref(), new_message.audio_url.is_some())?;

    let id = crate::new_id();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, receiver_id, body, audio_url, reply_to_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_message.conversation_id)
    .bind(&new_message.sender_id)
    .bind(&new_message.receiver_id)
    .bind(&new_message.text)
    .bind(&new_message.audio_url)
    .bind(&new_message.reply_to_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Message", &id))?;

    conversation::append_message(&mut *tx, &new_message.conversation_id, &id).await?;

    tx.commit().await?;

    tracing::debug!(
        message = %id,
        conversation = %new_message.conversation_id,
        "Stored message"
    );

    get_message(pool, &id).await
}

/// Get a message by ID.
pub async fn get_message(pool: &SqlitePool, id: &str) -> Result<Message> {
    let sql = format!("SELECT {} FROM messages m WHERE m.id = ?", MESSAGE_COLUMNS);

    sqlx::query_as::<_, MessageRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Message::from)
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Message",
            id: id.to_string(),
        })
}

/// Get a message with its reply target resolved.
pub async fn get_resolved(pool: &SqlitePool, id: &str) -> Result<ResolvedMessage> {
    let sql = format!(
        "SELECT {}, {} FROM messages m LEFT JOIN messages r ON r.id = m.reply_to_id WHERE m.id = ?",
        MESSAGE_COLUMNS, REPLY_COLUMNS
    );

    sqlx::query_as::<_, ResolvedRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(ResolvedMessage::from)
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Message",
            id: id.to_string(),
        })
}

/// All messages of a conversation in order, each with its reply target resolved.
///
/// Reply targets that no longer exist resolve to `None`.
pub async fn list_resolved(pool: &SqlitePool, conversation_id: &str) -> Result<Vec<ResolvedMessage>> {
    let sql = format!(
        r#"
        SELECT {}, {}
        FROM conversation_messages cm
        JOIN messages m ON m.id = cm.message_id
        LEFT JOIN messages r ON r.id = m.reply_to_id
        WHERE cm.conversation_id = ?
        ORDER BY cm.position
        "#,
        MESSAGE_COLUMNS, REPLY_COLUMNS
    );

    let rows = sqlx::query_as::<_, ResolvedRow>(&sql)
        .bind(conversation_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(ResolvedMessage::from).collect())
}

/// Mark every unseen message from `author_id` to `reader_id` in a conversation as seen.
///
/// Runs as a single UPDATE so readers never observe a partially seen batch.
/// Returns the ids that changed.
pub async fn mark_seen(
    pool: &SqlitePool,
    conversation_id: &str,
    reader_id: &str,
    author_id: &str,
) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        UPDATE messages
        SET is_seen = 1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE conversation_id = ?
          AND receiver_id = ?
          AND sender_id = ?
          AND is_seen = 0
        RETURNING id
        "#,
    )
    .bind(conversation_id)
    .bind(reader_id)
    .bind(author_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Hide a message for one user. Returns `false` if it was already hidden.
pub async fn add_deleted_for(pool: &SqlitePool, message_id: &str, user_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO message_deletions (message_id, user_id)
        VALUES (?, ?)
        "#,
    )
    .bind(message_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove a message from its conversation and delete the record.
pub async fn delete_message(pool: &SqlitePool, message: &Message) -> Result<()> {
    let mut tx = pool.begin().await?;

    conversation::remove_message(&mut *tx, &message.conversation_id, &message.id).await?;

    let result = sqlx::query(
        r#"
        DELETE FROM messages
        WHERE id = ?
        "#,
    )
    .bind(&message.id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Message",
            id: message.id.clone(),
        });
    }

    tx.commit().await?;

    tracing::debug!(message = %message.id, conversation = %message.conversation_id, "Deleted message");

    Ok(())
}
