use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::response::{ApiResponse, PaginationParams};
use crate::api::AppState;
use crate::auth::{AuthUser, Permission};
use crate::error::{AppError, AppResult};
use crate::models::{CreateNotification, Notification};

#[derive(Debug, Deserialize, IntoParams)]
pub struct NotificationQuery {
    /// Page number (1-indexed, default: 1)
    pub page: Option<u32>,
    /// Items per page (default: 20, max: 100)
    pub per_page: Option<u32>,
    /// Only return unread notifications
    #[serde(default)]
    pub unread_only: bool,
}

impl NotificationQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedRead {
    pub updated: u64,
}

/// List notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Page of notifications with pagination meta", body = Vec<Notification>)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<ApiResponse<Vec<Notification>>> {
    auth.require(Permission::View)?;

    let pagination = query.pagination();
    let (items, total) = tokio::try_join!(
        state.db.list_notifications(query.unread_only, pagination.limit(), pagination.offset()),
        state.db.count_notifications(query.unread_only),
    )?;

    Ok(ApiResponse::success_with_meta(
        items,
        pagination.to_meta(total.max(0) as u64),
    ))
}

/// Post a notification to every dashboard
#[utoipa::path(
    post,
    path = "/api/notifications",
    tag = "notifications",
    request_body = CreateNotification,
    responses(
        (status = 200, description = "Notification stored", body = Notification),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateNotification>,
) -> AppResult<Json<Notification>> {
    auth.require(Permission::Edit)?;

    if req.title.trim().is_empty() {
        return Err(AppError::bad_request("Notification title is required"));
    }

    let notification = state.notify(Notification::new(req)).await?;
    Ok(Json(notification))
}

/// Number of unread notifications
#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "notifications",
    responses(
        (status = 200, description = "Unread count", body = UnreadCount)
    )
)]
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<UnreadCount>> {
    auth.require(Permission::View)?;
    let count = state.db.count_notifications(true).await?;
    Ok(Json(UnreadCount { count }))
}

/// Mark every notification read
#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "notifications",
    responses(
        (status = 200, description = "Notifications updated", body = MarkedRead)
    )
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<MarkedRead>> {
    auth.require(Permission::View)?;
    let updated = state.db.mark_all_notifications_read().await?;
    Ok(Json(MarkedRead { updated }))
}

/// Mark one notification read
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "notifications",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    auth.require(Permission::View)?;

    if !state.db.mark_notification_read(&id).await? {
        return Err(AppError::not_found(&format!("Notification {} not found", id)));
    }
    Ok(ApiResponse::ok())
}

/// Remove a notification
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "notifications",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification removed"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    auth.require(Permission::View)?;

    if !state.db.delete_notification(&id).await? {
        return Err(AppError::not_found(&format!("Notification {} not found", id)));
    }
    Ok(ApiResponse::ok())
}
