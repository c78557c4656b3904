use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;
use tracing::info;
use utoipa::IntoParams;

use crate::api::response::ApiResponse;
use crate::api::{AppState, Event};
use crate::auth::{AuthUser, Permission};
use crate::error::{AppError, AppResult};
use crate::k8s::ClusterOverview;
use crate::models::{
    AddClusterRequest, ClusterHealth, ClusterStatus, ClusterSummary, NodeUsage, Notification,
    NotificationSeverity, UsagePoint, UsageRange,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct NamespaceQuery {
    /// Namespace to scope to; empty or `all` means every namespace
    pub namespace: Option<String>,
}

impl NamespaceQuery {
    pub fn filter(&self) -> Option<&str> {
        namespace_filter(self.namespace.as_deref())
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UsageHistoryQuery {
    /// `1h` (default), `6h`, `24h` or `7d`
    pub range: Option<String>,
    /// Node name; empty or `all` means every node
    pub node: Option<String>,
}

impl UsageHistoryQuery {
    fn range(&self) -> AppResult<UsageRange> {
        match self.range.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(range) => UsageRange::from_str(range)
                .map_err(|_| AppError::bad_request(&format!("Unsupported range: {}", range))),
            None => Ok(UsageRange::default()),
        }
    }

    fn node(&self) -> Option<&str> {
        self.node
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case("all"))
    }
}

pub(crate) fn namespace_filter(namespace: Option<&str>) -> Option<&str> {
    namespace
        .map(str::trim)
        .filter(|ns| !ns.is_empty() && !ns.eq_ignore_ascii_case("all"))
}

/// List registered clusters
#[utoipa::path(
    get,
    path = "/api/clusters",
    tag = "clusters",
    responses(
        (status = 200, description = "Registered clusters", body = Vec<ClusterSummary>),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_clusters(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<ClusterSummary>>> {
    auth.require(Permission::View)?;
    Ok(Json(state.clusters.list()))
}

/// Register a cluster from kubeconfig text
#[utoipa::path(
    post,
    path = "/api/clusters",
    tag = "clusters",
    request_body = AddClusterRequest,
    responses(
        (status = 200, description = "Cluster registered", body = ClusterSummary),
        (status = 400, description = "Invalid kubeconfig"),
        (status = 403, description = "Admin permission required")
    )
)]
pub async fn add_cluster(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<AddClusterRequest>,
) -> AppResult<Json<ClusterSummary>> {
    auth.require(Permission::Admin)?;

    let summary = state.clusters.register(&req.name, &req.kubeconfig).await?;
    info!(cluster_id = %summary.id, user = %auth.user.username, "Cluster added");

    state
        .notify(Notification::update(
            "Cluster added",
            format!("{} is now available", summary.name),
            NotificationSeverity::Success,
        ))
        .await?;

    Ok(Json(summary))
}

/// Remove a cluster
#[utoipa::path(
    delete,
    path = "/api/clusters/{id}",
    tag = "clusters",
    params(("id" = String, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Cluster removed"),
        (status = 404, description = "Cluster not found"),
        (status = 403, description = "Admin permission required")
    )
)]
pub async fn remove_cluster(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    auth.require(Permission::Admin)?;

    state.clusters.remove(&id).await?;
    state.alerts.lock().await.forget_cluster(&id);
    state.usage_history.forget_cluster(&id);
    Ok(ApiResponse::ok())
}

/// Check connectivity to a cluster's API server
#[utoipa::path(
    get,
    path = "/api/clusters/{id}/status",
    tag = "clusters",
    params(("id" = String, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Connectivity", body = ClusterStatus),
        (status = 404, description = "Cluster not found")
    )
)]
pub async fn cluster_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ClusterStatus>> {
    auth.require(Permission::View)?;
    state.clusters.get(&id)?;

    let result = match state.clusters.client(&id).await {
        Ok(client) => client.health_check().await.map_err(AppError::cluster),
        Err(e) => Err(e),
    };

    let status = match result {
        Ok(_) => ClusterStatus {
            id: id.clone(),
            connected: true,
            message: "Connected".to_string(),
        },
        Err(e) => ClusterStatus {
            id: id.clone(),
            connected: false,
            message: e.to_string(),
        },
    };

    let _ = state.event_tx.send(Event::ClusterStatus {
        id,
        connected: status.connected,
    });
    Ok(Json(status))
}

/// Node and control plane health
#[utoipa::path(
    get,
    path = "/api/clusters/{id}/health",
    tag = "clusters",
    params(("id" = String, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Cluster health", body = ClusterHealth),
        (status = 404, description = "Cluster not found"),
        (status = 502, description = "Cluster unreachable")
    )
)]
pub async fn cluster_health(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ClusterHealth>> {
    auth.require(Permission::View)?;
    let client = state.clusters.client(&id).await?;
    let health = client.cluster_health().await.map_err(AppError::cluster)?;
    Ok(Json(health))
}

/// Namespace names
#[utoipa::path(
    get,
    path = "/api/clusters/{id}/namespaces",
    tag = "clusters",
    params(("id" = String, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Namespaces", body = Vec<String>),
        (status = 404, description = "Cluster not found")
    )
)]
pub async fn list_namespaces(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<String>>> {
    auth.require(Permission::View)?;
    let client = state.clusters.client(&id).await?;
    let namespaces = client.list_namespaces().await.map_err(AppError::cluster)?;
    Ok(Json(namespaces))
}

/// Pods, deployments, services and nodes in one call
#[utoipa::path(
    get,
    path = "/api/clusters/{id}/overview",
    tag = "clusters",
    params(("id" = String, Path, description = "Cluster ID"), NamespaceQuery),
    responses(
        (status = 200, description = "Cluster overview", body = ClusterOverview),
        (status = 404, description = "Cluster not found")
    )
)]
pub async fn cluster_overview(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> AppResult<Json<ClusterOverview>> {
    auth.require(Permission::View)?;
    let client = state.clusters.client(&id).await?;
    let overview = client
        .fetch_overview(query.filter())
        .await
        .map_err(AppError::cluster)?;
    Ok(Json(overview))
}

/// Per-node CPU, memory and pod usage
#[utoipa::path(
    get,
    path = "/api/clusters/{id}/nodes/usage",
    tag = "clusters",
    params(("id" = String, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Node usage", body = Vec<NodeUsage>),
        (status = 404, description = "Cluster not found")
    )
)]
pub async fn node_usage(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<NodeUsage>>> {
    auth.require(Permission::View)?;
    let client = state.clusters.client(&id).await?;
    let usage = client.node_usage().await.map_err(AppError::cluster)?;
    Ok(Json(usage))
}

/// Node usage sampled by the monitor over a time range
#[utoipa::path(
    get,
    path = "/api/clusters/{id}/nodes/usage/history",
    tag = "clusters",
    params(("id" = String, Path, description = "Cluster ID"), UsageHistoryQuery),
    responses(
        (status = 200, description = "Usage points, oldest first", body = Vec<UsagePoint>),
        (status = 400, description = "Unsupported range"),
        (status = 404, description = "Cluster not found")
    )
)]
pub async fn node_usage_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<UsageHistoryQuery>,
) -> AppResult<Json<Vec<UsagePoint>>> {
    auth.require(Permission::View)?;
    state.clusters.get(&id)?;

    let since = Utc::now() - query.range()?.duration();
    Ok(Json(state.usage_history.query(&id, since, query.node())))
}
