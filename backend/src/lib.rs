//! KubeView Backend Library
//!
//! Cluster registry, resource relationship graphs, health, notifications and
//! alerting behind the dashboard's HTTP API.

pub mod alerts;
pub mod api;
pub mod auth;
pub mod clusters;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod history;
pub mod k8s;
pub mod models;
pub mod monitor;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use axum::http::{header, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::AppState;
use crate::api::openapi::ApiDoc;

/// Create the application router with the given state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Auth
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        // Clusters
        .route("/api/clusters", get(api::clusters::list_clusters))
        .route("/api/clusters", post(api::clusters::add_cluster))
        .route("/api/clusters/:id", delete(api::clusters::remove_cluster))
        .route("/api/clusters/:id/status", get(api::clusters::cluster_status))
        .route("/api/clusters/:id/health", get(api::clusters::cluster_health))
        .route("/api/clusters/:id/namespaces", get(api::clusters::list_namespaces))
        .route("/api/clusters/:id/overview", get(api::clusters::cluster_overview))
        .route("/api/clusters/:id/nodes/usage", get(api::clusters::node_usage))
        .route(
            "/api/clusters/:id/nodes/usage/history",
            get(api::clusters::node_usage_history),
        )
        // Resources
        .route(
            "/api/clusters/:id/resources/:kind",
            get(api::resources::list_resources),
        )
        .route(
            "/api/clusters/:id/resources/:kind/:name",
            delete(api::resources::delete_resource),
        )
        .route("/api/clusters/:id/apply", post(api::resources::apply_manifest))
        // Graph
        .route("/api/clusters/:id/graph", get(api::graph::cluster_graph))
        .route(
            "/api/clusters/:id/graph/overview",
            get(api::graph::cluster_overview_graph),
        )
        .route("/api/graph/build", post(api::graph::build_graph))
        .route("/api/graph/layout", post(api::graph::layout_graph))
        // Notifications
        .route("/api/notifications", get(api::notifications::list))
        .route("/api/notifications", post(api::notifications::create))
        .route(
            "/api/notifications/unread-count",
            get(api::notifications::unread_count),
        )
        .route(
            "/api/notifications/read-all",
            post(api::notifications::mark_all_read),
        )
        .route("/api/notifications/:id/read", post(api::notifications::mark_read))
        .route("/api/notifications/:id", delete(api::notifications::delete))
        // Alert rules
        .route("/api/alert-rules", get(api::alerts::list))
        .route("/api/alert-rules", post(api::alerts::create))
        .route("/api/alert-rules/:id", put(api::alerts::update))
        .route("/api/alert-rules/:id", delete(api::alerts::delete))
        .route("/api/alert-rules/:id/toggle", post(api::alerts::toggle))
        // WebSocket
        .route(api::ws::EVENTS_PATH, get(api::ws::ws_handler))
        // Metrics (Prometheus)
        .route("/metrics", get(api::metrics::metrics_handler))
        // OpenAPI / Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Note: Rate limiting should be implemented at proxy/ingress level
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Create CORS layer with secure configuration
fn cors_layer() -> CorsLayer {
    // Allow origins from environment or default to localhost for development
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .allow_credentials(true)
}
