//! Session token verification.
//!
//! Tokens are issued by the login service as `<userId>.<signature>`, where the
//! signature is the hex HMAC-SHA256 of the user id under the shared session
//! secret. A token may arrive as an `Authorization: Bearer` header, a `jwt`
//! cookie, or a `token` query parameter (browsers cannot set headers on a
//! WebSocket upgrade).

use axum::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "jwt";

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    secret: Vec<u8>,
}

impl SessionKeys {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).ok()
    }

    /// Issue a token for `user_id`.
    pub fn sign(&self, user_id: &str) -> Option<String> {
        let mut mac = self.mac()?;
        mac.update(user_id.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Some(format!("{}.{}", user_id, signature))
    }

    /// Return the user id carried by a valid token.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (user_id, signature) = token.rsplit_once('.')?;
        if user_id.is_empty() {
            return None;
        }

        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac()?;
        mac.update(user_id.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some(user_id.to_string())
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name.trim() == SESSION_COOKIE && !value.trim().is_empty())
                .then(|| value.trim().to_string())
        })
}

fn query_token(parts: &Parts) -> Option<String> {
    let Query(query) = Query::<TokenQuery>::try_from_uri(&parts.uri).ok()?;
    query.token.filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .or_else(|| query_token(parts))
            .ok_or(ApiError::Unauthorized)?;

        let Some(user_id) = state.sessions.verify(&token) else {
            debug!("Rejected session token with bad signature");
            return Err(ApiError::Unauthorized);
        };

        if !database::user::user_exists(state.service.database().pool(), &user_id).await? {
            debug!(user = %user_id, "Session token for unknown user");
            return Err(ApiError::Unauthorized);
        }

        Ok(SessionUser { id: user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keys = SessionKeys::new("secret");
        let token = keys.sign("user-1").unwrap();
        assert!(token.starts_with("user-1."));
        assert_eq!(keys.verify(&token).as_deref(), Some("user-1"));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let keys = SessionKeys::new("secret");
        let token = keys.sign("user-1").unwrap();
        let (_, sig) = token.split_once('.').unwrap();

        assert!(keys.verify(&format!("user-2.{}", sig)).is_none());
        assert!(SessionKeys::new("other").verify(&token).is_none());
        assert!(keys.verify("user-1").is_none());
        assert!(keys.verify("user-1.zz").is_none());
        assert!(keys.verify(&format!(".{}", sig)).is_none());
    }

    #[test]
    fn test_token_sources() {
        let req = axum::http::Request::builder()
            .uri("/api/ws?token=from-query")
            .header(COOKIE, "theme=dark; jwt=from-cookie")
            .header(AUTHORIZATION, "Bearer from-header")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();

        assert_eq!(bearer_token(&parts).as_deref(), Some("from-header"));
        assert_eq!(cookie_token(&parts).as_deref(), Some("from-cookie"));
        assert_eq!(query_token(&parts).as_deref(), Some("from-query"));
    }
}
