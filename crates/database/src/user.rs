//! User CRUD operations.

use chat_types::User;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{NewUser, UserRow};
use crate::validation::{validate_full_name, validate_username};

/// Create a new user with a generated id.
pub async fn create_user(pool: &SqlitePool, new_user: &NewUser) -> Result<User> {
    validate_username(&new_user.username)?;
    validate_full_name(&new_user.full_name)?;

    let id = crate::new_id();

    sqlx::query(
        r#"
        INSERT INTO users (id, username, full_name, profile_pic)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_user.username)
    .bind(new_user.full_name.trim())
    .bind(&new_user.profile_pic)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "User", &new_user.username))?;

    tracing::debug!(user = %id, username = %new_user.username, "Created user");

    get_user(pool, &id).await
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<User> {
    sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, full_name, profile_pic
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(User::from)
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Get a user by username.
pub async fn get_user_by_username(pool: &SqlitePool, username: &str) -> Result<User> {
    sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, full_name, profile_pic
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?
    .map(User::from)
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: username.to_string(),
    })
}

/// Whether a user with this id exists.
pub async fn user_exists(pool: &SqlitePool, id: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// List every user except `exclude_id`, ordered by display name.
pub async fn list_other_users(pool: &SqlitePool, exclude_id: &str) -> Result<Vec<User>> {
    let rows = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, full_name, profile_pic
        FROM users
        WHERE id != ?
        ORDER BY full_name
        "#,
    )
    .bind(exclude_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(User::from).collect())
}
