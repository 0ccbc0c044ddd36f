//! Conversation lookup, creation and message ordering.
//!
//! A conversation is keyed by its canonicalized participant pair under a
//! UNIQUE constraint. Concurrent first messages between the same pair may both
//! try to create it; the loser sees a unique violation and re-reads the
//! winner's row instead of taking any lock.

use chat_types::{canonical_pair, Conversation};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::ConversationRow;
use crate::validation::validate_participants;

/// Find the conversation between two users, in either order.
pub async fn find_by_participants(
    pool: &SqlitePool,
    user_a: &str,
    user_b: &str,
) -> Result<Option<Conversation>> {
    let (a, b) = canonical_pair(user_a, user_b);

    let row = sqlx::query_as::<_, ConversationRow>(
        r#"
        SELECT id, participant_a, participant_b, created_at, updated_at
        FROM conversations
        WHERE participant_a = ? AND participant_b = ?
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Conversation::from))
}

/// Get a conversation by ID.
pub async fn get_conversation(pool: &SqlitePool, id: &str) -> Result<Conversation> {
    sqlx::query_as::<_, ConversationRow>(
        r#"
        SELECT id, participant_a, participant_b, created_at, updated_at
        FROM conversations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(Conversation::from)
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: id.to_string(),
    })
}

/// Create the conversation for a pair.
///
/// Fails with [`DatabaseError::AlreadyExists`] if the pair already has one.
pub async fn create_conversation(
    pool: &SqlitePool,
    user_a: &str,
    user_b: &str,
) -> Result<Conversation> {
    validate_participants(user_a, user_b)?;
    let (a, b) = canonical_pair(user_a, user_b);
    let id = crate::new_id();

    sqlx::query(
        r#"
        INSERT INTO conversations (id, participant_a, participant_b)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(a)
    .bind(b)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Conversation", &format!("{}:{}", a, b)))?;

    tracing::info!(conversation = %id, participant_a = %a, participant_b = %b, "Created conversation");

    get_conversation(pool, &id).await
}

/// Return the pair's conversation, creating it on first use.
pub async fn find_or_create(pool: &SqlitePool, user_a: &str, user_b: &str) -> Result<Conversation> {
    if let Some(existing) = find_by_participants(pool, user_a, user_b).await? {
        return Ok(existing);
    }

    match create_conversation(pool, user_a, user_b).await {
        Ok(created) => Ok(created),
        Err(DatabaseError::AlreadyExists { .. }) => {
            tracing::debug!(user_a, user_b, "Lost conversation create race, re-reading");
            find_by_participants(pool, user_a, user_b)
                .await?
                .ok_or_else(|| DatabaseError::NotFound {
                    entity: "Conversation",
                    id: format!("{}:{}", user_a, user_b),
                })
        }
        Err(e) => Err(e),
    }
}

/// Ordered message ids of a conversation.
pub async fn message_ids(pool: &SqlitePool, conversation_id: &str) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT message_id
        FROM conversation_messages
        WHERE conversation_id = ?
        ORDER BY position
        "#,
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Number of conversations between the two users (0 or 1).
pub async fn count_for_pair(pool: &SqlitePool, user_a: &str, user_b: &str) -> Result<i64> {
    let (a, b) = canonical_pair(user_a, user_b);
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM conversations
        WHERE participant_a = ? AND participant_b = ?
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Append a message reference to the end of the conversation's sequence.
pub(crate) async fn append_message(
    conn: &mut SqliteConnection,
    conversation_id: &str,
    message_id: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversation_messages (conversation_id, message_id)
        VALUES (?, ?)
        "#,
    )
    .bind(conversation_id)
    .bind(message_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE conversations
        SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(conversation_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Remove a message reference from the conversation's sequence.
pub(crate) async fn remove_message(
    conn: &mut SqliteConnection,
    conversation_id: &str,
    message_id: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM conversation_messages
        WHERE conversation_id = ? AND message_id = ?
        "#,
    )
    .bind(conversation_id)
    .bind(message_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
