//! Relationship graph endpoints
//!
//! Cluster-backed graphs fetch their resources through the cluster's client;
//! the `/api/graph/*` endpoints work on posted JSON so clients can graph
//! offline data. Layout is CPU bound and runs on the blocking pool.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use super::clusters::namespace_filter;
use super::resources::parse_kind;
use crate::api::AppState;
use crate::auth::{AuthUser, Permission};
use crate::error::{AppError, AppResult};
use crate::graph::{
    build_cluster_overview, ForceLayout, GraphBuilder, GraphEdge, GraphNode, LayoutConfig,
    NodePosition, ResourceGraph,
};
use crate::models::ResourceKind;

/// Tick budget for server-side layout; the default config settles in ~300
pub const DEFAULT_MAX_TICKS: usize = 500;
const MAX_TICKS_LIMIT: usize = 5_000;

/// Largest graph the server lays out; each tick is quadratic in nodes
pub const MAX_LAYOUT_NODES: usize = 1_000;

/// Largest posted build, resources and live pods together
pub const MAX_BUILD_RESOURCES: usize = 5_000;

#[derive(Debug, Serialize, ToSchema)]
pub struct GraphResponse {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Present when a layout was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<NodePosition>>,
}

impl From<ResourceGraph> for GraphResponse {
    fn from(graph: ResourceGraph) -> Self {
        Self {
            nodes: graph.nodes,
            edges: graph.edges,
            positions: None,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct GraphQuery {
    /// Plural resource type to graph
    #[serde(default = "default_kind")]
    pub kind: String,
    pub namespace: Option<String>,
    /// Link live pods by selector instead of drawing placeholders
    #[serde(default = "default_true")]
    pub correlate: bool,
    /// Include force layout positions
    #[serde(default)]
    pub layout: bool,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OverviewGraphQuery {
    pub namespace: Option<String>,
    #[serde(default)]
    pub layout: bool,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BuildGraphRequest {
    /// Declared type of every entry in `resources`
    pub resource_type: String,
    #[schema(value_type = Vec<Object>)]
    pub resources: Vec<Value>,
    /// Live pods to correlate against; placeholders are drawn when absent
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub pods: Option<Vec<Value>>,
    #[serde(default)]
    pub layout: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LayoutRequest {
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Nodes held at fixed positions
    #[serde(default)]
    pub pins: Vec<NodePosition>,
    #[serde(default)]
    pub config: Option<LayoutConfig>,
    pub max_ticks: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LayoutResponse {
    pub positions: Vec<NodePosition>,
    /// Ticks run before the simulation cooled or hit its budget
    pub ticks: usize,
    pub settled: bool,
}

fn default_kind() -> String {
    "pods".to_string()
}

fn default_true() -> bool {
    true
}

fn sized_config(width: Option<f64>, height: Option<f64>) -> LayoutConfig {
    let mut config = LayoutConfig::default();
    if let Some(width) = width.filter(|w| w.is_finite() && *w > 0.0) {
        config.width = width;
    }
    if let Some(height) = height.filter(|h| h.is_finite() && *h > 0.0) {
        config.height = height;
    }
    config
}

fn record_build(kind: &str, graph: &ResourceGraph) {
    metrics::increment_counter!("kubeview_graph_builds_total", "kind" => kind.to_string());
    metrics::histogram!("kubeview_graph_nodes", graph.nodes.len() as f64);
    debug!(kind, nodes = graph.nodes.len(), edges = graph.edges.len(), "Built graph");
}

/// Run a layout on the blocking pool
async fn run_layout(
    graph: ResourceGraph,
    config: LayoutConfig,
    pins: Vec<NodePosition>,
    max_ticks: usize,
) -> AppResult<(ResourceGraph, LayoutResponse)> {
    if graph.nodes.len() > MAX_LAYOUT_NODES {
        return Err(AppError::bad_request(&format!(
            "Graph too large to lay out: {} nodes (limit {})",
            graph.nodes.len(),
            MAX_LAYOUT_NODES
        )));
    }

    tokio::task::spawn_blocking(move || {
        let mut layout = ForceLayout::new(&graph, config);
        for pin in &pins {
            layout.pin(&pin.id, pin.x, pin.y);
        }
        let ticks = layout.run(max_ticks);
        let response = LayoutResponse {
            positions: layout.positions(),
            ticks,
            settled: layout.is_settled(),
        };
        (graph, response)
    })
    .await
    .map_err(|e| AppError::internal(&format!("Layout task failed: {}", e)))
}

async fn respond(graph: ResourceGraph, layout: bool, config: LayoutConfig) -> AppResult<GraphResponse> {
    if !layout {
        return Ok(graph.into());
    }
    let (graph, laid_out) = run_layout(graph, config, Vec::new(), DEFAULT_MAX_TICKS).await?;
    let mut response = GraphResponse::from(graph);
    response.positions = Some(laid_out.positions);
    Ok(response)
}

/// Relationship graph for one resource type of a cluster
#[utoipa::path(
    get,
    path = "/api/clusters/{id}/graph",
    tag = "graph",
    params(("id" = String, Path, description = "Cluster ID"), GraphQuery),
    responses(
        (status = 200, description = "Relationship graph", body = GraphResponse),
        (status = 400, description = "Unsupported resource type"),
        (status = 404, description = "Cluster not found")
    )
)]
pub async fn cluster_graph(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<GraphQuery>,
) -> AppResult<Json<GraphResponse>> {
    auth.require(Permission::View)?;
    let kind = parse_kind(&query.kind)?;
    let namespace = namespace_filter(query.namespace.as_deref());

    let client = state.clusters.client(&id).await?;
    let correlate = query.correlate
        && matches!(kind, ResourceKind::Deployments | ResourceKind::Services);

    let (resources, pods) = if correlate {
        let (resources, pods) = tokio::try_join!(
            client.list_resources(kind, namespace),
            client.list_resources(ResourceKind::Pods, namespace),
        )
        .map_err(AppError::cluster)?;
        (resources, Some(pods))
    } else {
        let resources = client
            .list_resources(kind, namespace)
            .await
            .map_err(AppError::cluster)?;
        (resources, None)
    };

    let mut builder = GraphBuilder::new(kind.as_ref());
    if let Some(pods) = pods.as_deref() {
        builder = builder.with_live_pods(pods);
    }
    let graph = builder.build(&resources);
    record_build(kind.as_ref(), &graph);

    let config = sized_config(query.width, query.height);
    Ok(Json(respond(graph, query.layout, config).await?))
}

/// Services, pods and the nodes they run on
#[utoipa::path(
    get,
    path = "/api/clusters/{id}/graph/overview",
    tag = "graph",
    params(("id" = String, Path, description = "Cluster ID"), OverviewGraphQuery),
    responses(
        (status = 200, description = "Cluster overview graph", body = GraphResponse),
        (status = 404, description = "Cluster not found")
    )
)]
pub async fn cluster_overview_graph(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<OverviewGraphQuery>,
) -> AppResult<Json<GraphResponse>> {
    auth.require(Permission::View)?;
    let namespace = namespace_filter(query.namespace.as_deref());

    let client = state.clusters.client(&id).await?;
    let overview = client
        .fetch_overview(namespace)
        .await
        .map_err(AppError::cluster)?;

    let graph = build_cluster_overview(&overview.pods, &overview.services, &overview.nodes);
    record_build("overview", &graph);

    let config = sized_config(query.width, query.height);
    Ok(Json(respond(graph, query.layout, config).await?))
}

/// Build a graph from posted resource objects
#[utoipa::path(
    post,
    path = "/api/graph/build",
    tag = "graph",
    request_body = BuildGraphRequest,
    responses(
        (status = 200, description = "Relationship graph", body = GraphResponse),
        (status = 400, description = "Too many resources")
    )
)]
pub async fn build_graph(
    auth: AuthUser,
    Json(req): Json<BuildGraphRequest>,
) -> AppResult<Json<GraphResponse>> {
    auth.require(Permission::View)?;

    let posted = req.resources.len() + req.pods.as_ref().map_or(0, Vec::len);
    if posted > MAX_BUILD_RESOURCES {
        return Err(AppError::bad_request(&format!(
            "Too many resources: {} (limit {})",
            posted, MAX_BUILD_RESOURCES
        )));
    }

    let mut builder = GraphBuilder::new(&req.resource_type);
    if let Some(pods) = req.pods.as_deref() {
        builder = builder.with_live_pods(pods);
    }
    let graph = builder.build(&req.resources);
    record_build(&req.resource_type, &graph);

    Ok(Json(respond(graph, req.layout, LayoutConfig::default()).await?))
}

/// Lay out a posted graph, holding pinned nodes in place
#[utoipa::path(
    post,
    path = "/api/graph/layout",
    tag = "graph",
    request_body = LayoutRequest,
    responses(
        (status = 200, description = "Node positions", body = LayoutResponse),
        (status = 400, description = "Duplicate or unknown node ids, or graph too large")
    )
)]
pub async fn layout_graph(
    auth: AuthUser,
    Json(req): Json<LayoutRequest>,
) -> AppResult<Json<LayoutResponse>> {
    auth.require(Permission::View)?;

    let graph = ResourceGraph::from_parts(req.nodes, req.edges)
        .map_err(|e| AppError::bad_request(&e))?;
    graph.validate().map_err(|e| AppError::bad_request(&e))?;

    if let Some(pin) = req.pins.iter().find(|p| !graph.contains(&p.id)) {
        return Err(AppError::bad_request(&format!("Pinned node not found: {}", pin.id)));
    }

    let max_ticks = req.max_ticks.unwrap_or(DEFAULT_MAX_TICKS).min(MAX_TICKS_LIMIT);
    let config = req.config.unwrap_or_default();
    let (_, response) = run_layout(graph, config, req.pins, max_ticks).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_config_ignores_bad_sizes() {
        let config = sized_config(Some(1200.0), Some(-5.0));
        assert_eq!(config.width, 1200.0);
        assert_eq!(config.height, LayoutConfig::default().height);

        let config = sized_config(Some(f64::NAN), None);
        assert_eq!(config.width, LayoutConfig::default().width);
    }

    #[tokio::test]
    async fn test_run_layout_keeps_pins() {
        let graph = ResourceGraph::from_parts(
            vec![GraphNode::new("a", "a", "pod"), GraphNode::new("b", "b", "pod")],
            vec![],
        )
        .unwrap();
        let pins = vec![NodePosition {
            id: "a".to_string(),
            x: 10.0,
            y: 20.0,
        }];

        let (_, response) = run_layout(graph, LayoutConfig::default(), pins, 50).await.unwrap();
        let a = response.positions.iter().find(|p| p.id == "a").unwrap();
        assert_eq!((a.x, a.y), (10.0, 20.0));
        assert!(response.ticks <= 50);
    }

    #[tokio::test]
    async fn test_run_layout_rejects_oversized_graph() {
        let nodes = (0..=MAX_LAYOUT_NODES)
            .map(|i| GraphNode::new(format!("n{}", i), format!("n{}", i), "pod"))
            .collect();
        let graph = ResourceGraph::from_parts(nodes, vec![]).unwrap();

        let err = run_layout(graph, LayoutConfig::default(), vec![], 10)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }
}
