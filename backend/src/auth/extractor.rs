use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

use super::{Permission, Role, User};
use crate::api::{ws::EVENTS_PATH, AppState};
use crate::error::{AppError, AppResult};

/// The authenticated caller of a request.
///
/// Reads `Authorization: Bearer <token>`; the WebSocket event route may
/// take `?token=` instead since browsers cannot set headers there. With auth
/// disabled every request is an anonymous admin.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token: Option<String>,
}

impl AuthUser {
    pub fn require(&self, permission: Permission) -> AppResult<()> {
        self.user.require(permission)
    }
}

fn bearer_token(parts: &Parts) -> AppResult<Option<String>> {
    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AppError::unauthorized("Invalid authorization header"))?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;
        return Ok(Some(token.trim().to_string()));
    }

    if parts.uri.path() != EVENTS_PATH {
        return Ok(None);
    }

    let from_query = parts.uri.query().and_then(|query| {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "token")
            .map(|(_, value)| value.to_string())
    });
    Ok(from_query)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !state.config.auth_enabled {
            return Ok(AuthUser {
                user: User::new("anonymous", Role::Admin),
                token: None,
            });
        }

        let token = bearer_token(parts)?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Missing authorization token"))?;

        let session = state
            .sessions
            .validate(&token)
            .await
            .ok_or_else(|| AppError::unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user: session.user,
            token: Some(token),
        })
    }
}
