use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::info;
use utoipa::ToSchema;

use super::clusters::NamespaceQuery;
use crate::api::response::ApiResponse;
use crate::api::AppState;
use crate::auth::{AuthUser, Permission};
use crate::error::{AppError, AppResult};
use crate::k8s::{split_manifest, AppliedResource};
use crate::models::ResourceKind;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyRequest {
    /// One or more YAML documents separated by `---`
    pub manifest: String,
}

pub(crate) fn parse_kind(kind: &str) -> AppResult<ResourceKind> {
    ResourceKind::from_str(kind)
        .map_err(|_| AppError::bad_request(&format!("Unsupported resource type: {}", kind)))
}

/// List resources of one kind
#[utoipa::path(
    get,
    path = "/api/clusters/{id}/resources/{kind}",
    tag = "resources",
    params(
        ("id" = String, Path, description = "Cluster ID"),
        ("kind" = String, Path, description = "Plural resource type, e.g. pods"),
        NamespaceQuery
    ),
    responses(
        (status = 200, description = "Raw resource objects", body = Vec<Object>),
        (status = 400, description = "Unsupported resource type"),
        (status = 404, description = "Cluster not found")
    )
)]
pub async fn list_resources(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, kind)): Path<(String, String)>,
    Query(query): Query<NamespaceQuery>,
) -> AppResult<Json<Vec<Value>>> {
    auth.require(Permission::View)?;
    let kind = parse_kind(&kind)?;

    let client = state.clusters.client(&id).await?;
    let resources = client
        .list_resources(kind, query.filter())
        .await
        .map_err(AppError::cluster)?;
    Ok(Json(resources))
}

/// Delete one resource
#[utoipa::path(
    delete,
    path = "/api/clusters/{id}/resources/{kind}/{name}",
    tag = "resources",
    params(
        ("id" = String, Path, description = "Cluster ID"),
        ("kind" = String, Path, description = "Plural resource type"),
        ("name" = String, Path, description = "Resource name"),
        NamespaceQuery
    ),
    responses(
        (status = 200, description = "Resource deleted"),
        (status = 403, description = "Delete permission required"),
        (status = 404, description = "Cluster or resource not found")
    )
)]
pub async fn delete_resource(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, kind, name)): Path<(String, String, String)>,
    Query(query): Query<NamespaceQuery>,
) -> AppResult<ApiResponse<()>> {
    auth.require(Permission::Delete)?;
    let kind = parse_kind(&kind)?;

    let client = state.clusters.client(&id).await?;
    client
        .delete_resource(kind, &name, query.filter())
        .await
        .map_err(AppError::cluster)?;

    info!(cluster_id = %id, kind = %kind, name = %name, user = %auth.user.username, "Resource deleted");
    Ok(ApiResponse::ok())
}

/// Server-side apply a YAML manifest
#[utoipa::path(
    post,
    path = "/api/clusters/{id}/apply",
    tag = "resources",
    params(("id" = String, Path, description = "Cluster ID")),
    request_body = ApplyRequest,
    responses(
        (status = 200, description = "Applied resources", body = Vec<AppliedResource>),
        (status = 400, description = "Invalid manifest"),
        (status = 403, description = "Edit permission required")
    )
)]
pub async fn apply_manifest(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<ApplyRequest>,
) -> AppResult<Json<Vec<AppliedResource>>> {
    auth.require(Permission::Edit)?;

    let documents = split_manifest(&req.manifest)
        .map_err(|e| AppError::bad_request(&format!("Invalid manifest: {:#}", e)))?;
    if documents.is_empty() {
        return Err(AppError::bad_request("Manifest is empty"));
    }

    let client = state.clusters.client(&id).await?;
    let applied = client
        .apply_manifest(&req.manifest)
        .await
        .map_err(AppError::cluster)?;

    info!(cluster_id = %id, count = applied.len(), user = %auth.user.username, "Manifest applied");
    Ok(Json(applied))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("pods").unwrap(), ResourceKind::Pods);
        assert_eq!(parse_kind("Deployments").unwrap(), ResourceKind::Deployments);
        assert_eq!(parse_kind("widgets").unwrap_err().code(), "BAD_REQUEST");
    }
}
