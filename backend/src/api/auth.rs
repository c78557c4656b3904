use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::api::response::ApiResponse;
use crate::api::AppState;
use crate::auth::{AuthUser, Permission, User};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub permissions: Vec<Permission>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: User,
    pub permissions: Vec<Permission>,
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = match state.auth.authenticate(&req.username, &req.password) {
        Some(user) => user,
        None => {
            warn!(username = %req.username, "Failed login attempt");
            return Err(AppError::unauthorized("Invalid credentials"));
        }
    };

    let session = state.sessions.create(user).await;
    info!(username = %session.user.username, role = %session.user.role, "User logged in");

    Ok(Json(LoginResponse {
        token: session.token,
        permissions: session.user.role.permissions().to_vec(),
        user: session.user,
        expires_at: session.expires_at,
    }))
}

/// Revoke the caller's token
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResponse<()> {
    if let Some(token) = &auth.token {
        state.sessions.revoke(token).await;
    }
    ApiResponse::ok()
}

/// Current user and the permissions their role grants
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        permissions: auth.user.role.permissions().to_vec(),
        user: auth.user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MockAuthProvider, Role};
    use crate::clusters::InMemoryClusterStore;
    use crate::config::Config;
    use crate::db::Database;
    use std::sync::Arc;

    async fn state_with(provider: MockAuthProvider) -> AppState {
        let db = Database::new("sqlite::memory:").await.unwrap();
        AppState::with_parts(
            db,
            Config::default(),
            Arc::new(InMemoryClusterStore::new()),
            Arc::new(provider),
        )
    }

    #[tokio::test]
    async fn test_login_issues_session() {
        let mut provider = MockAuthProvider::new();
        provider
            .expect_authenticate()
            .withf(|user, pass| user == "ed" && pass == "secret")
            .returning(|user, _| Some(User::new(user, Role::Editor)));
        let state = state_with(provider).await;

        let response = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "ed".to_string(),
                password: "secret".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.permissions, vec![Permission::View, Permission::Edit]);
        let session = state.sessions.validate(&response.token).await.unwrap();
        assert_eq!(session.user.username, "ed");
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let mut provider = MockAuthProvider::new();
        provider.expect_authenticate().returning(|_, _| None);
        let state = state_with(provider).await;

        let err = login(
            State(state),
            Json(LoginRequest {
                username: "ed".to_string(),
                password: "nope".to_string(),
            }),
        )
        .await
        .err()
        .map(|e| e.code());

        assert_eq!(err, Some("UNAUTHORIZED"));
    }
}
