//! OpenAPI documentation for the KubeView API

use serde::{Deserialize, Serialize};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

/// API Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "KubeView API",
        version = "1.0.0",
        description = "Kubernetes resource dashboard backend.\n\n## Features\n- Register and switch between clusters\n- Browse, delete and apply resources\n- Resource relationship graphs with force layout\n- Cluster and node health\n- Notifications and threshold alert rules",
        license(name = "MIT"),
        contact(name = "KubeView Team")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    modifiers(&BearerAuth),
    security(("bearer" = [])),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Login and sessions"),
        (name = "clusters", description = "Cluster registry, status and health"),
        (name = "resources", description = "List, delete and apply Kubernetes resources"),
        (name = "graph", description = "Resource relationship graphs and layout"),
        (name = "notifications", description = "Dashboard notifications"),
        (name = "alerts", description = "Threshold alert rules"),
        (name = "events", description = "WebSocket event stream"),
        (name = "metrics", description = "Prometheus metrics")
    ),
    paths(
        crate::api::health::health_check,
        // Auth
        crate::api::auth::login,
        crate::api::auth::logout,
        crate::api::auth::me,
        // Clusters
        crate::api::clusters::list_clusters,
        crate::api::clusters::add_cluster,
        crate::api::clusters::remove_cluster,
        crate::api::clusters::cluster_status,
        crate::api::clusters::cluster_health,
        crate::api::clusters::list_namespaces,
        crate::api::clusters::cluster_overview,
        crate::api::clusters::node_usage,
        crate::api::clusters::node_usage_history,
        // Resources
        crate::api::resources::list_resources,
        crate::api::resources::delete_resource,
        crate::api::resources::apply_manifest,
        // Graph
        crate::api::graph::cluster_graph,
        crate::api::graph::cluster_overview_graph,
        crate::api::graph::build_graph,
        crate::api::graph::layout_graph,
        // Notifications
        crate::api::notifications::list,
        crate::api::notifications::create,
        crate::api::notifications::unread_count,
        crate::api::notifications::mark_all_read,
        crate::api::notifications::mark_read,
        crate::api::notifications::delete,
        // Alert rules
        crate::api::alerts::list,
        crate::api::alerts::create,
        crate::api::alerts::update,
        crate::api::alerts::toggle,
        crate::api::alerts::delete,
        // WebSocket (note: ws endpoints may not render in Swagger UI)
        crate::api::ws::ws_handler,
        crate::api::metrics::metrics_handler,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,
            // Auth
            crate::api::auth::LoginRequest,
            crate::api::auth::LoginResponse,
            crate::api::auth::MeResponse,
            crate::auth::User,
            crate::auth::Role,
            crate::auth::Permission,
            // Clusters
            crate::models::ClusterSummary,
            crate::models::AddClusterRequest,
            crate::models::ClusterStatus,
            crate::models::ClusterHealth,
            crate::models::NodeHealth,
            crate::models::ComponentHealth,
            crate::models::ConditionSummary,
            crate::models::NodeUsage,
            crate::models::UsagePoint,
            crate::models::UsageRange,
            crate::k8s::ClusterOverview,
            // Resources
            crate::models::ResourceKind,
            crate::api::resources::ApplyRequest,
            crate::k8s::AppliedResource,
            // Graph
            crate::graph::GraphNode,
            crate::graph::GraphEdge,
            crate::graph::Relation,
            crate::graph::LayoutConfig,
            crate::graph::NodePosition,
            crate::api::graph::GraphResponse,
            crate::api::graph::BuildGraphRequest,
            crate::api::graph::LayoutRequest,
            crate::api::graph::LayoutResponse,
            // Notifications
            crate::models::Notification,
            crate::models::CreateNotification,
            crate::models::NotificationType,
            crate::models::NotificationSeverity,
            crate::api::notifications::UnreadCount,
            crate::api::notifications::MarkedRead,
            // Alert rules
            crate::models::AlertRule,
            crate::models::AlertRuleRequest,
            crate::models::AlertResource,
            crate::models::AlertSeverity,
            // Common
            crate::api::response::ApiError,
            crate::api::response::ResponseMeta,
            ErrorResponse,
        )
    )
)]
pub struct ApiDoc;

/// Error envelope returned by every failing endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    pub error: crate::api::response::ApiError,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
