//! User listing.

use axum::extract::State;
use axum::Json;
use chat_types::User;

use crate::auth::SessionUser;
use crate::error::Result;
use crate::state::AppState;

/// Everyone the caller can start a conversation with.
pub async fn list_users(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<Vec<User>>> {
    let users = state.service.contacts(&user.id).await?;
    Ok(Json(users))
}
