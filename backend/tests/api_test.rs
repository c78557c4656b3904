//! Integration tests for the API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use kubeview_backend::{
    api::AppState,
    auth::{Role, StaticAuthProvider},
    clusters::InMemoryClusterStore,
    config::Config,
    db::Database,
};

const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: test
  cluster:
    server: http://127.0.0.1:1
contexts:
- name: test
  context:
    cluster: test
    user: tester
current-context: test
users:
- name: tester
  user:
    token: abc
"#;

async fn setup_state(config: Config) -> AppState {
    let db = Database::new("sqlite::memory:").await.unwrap();
    db.run_migrations().await.unwrap();

    let auth = StaticAuthProvider::new()
        .with_user("admin", "password", Role::Admin)
        .with_user("viewer", "viewer", Role::Viewer)
        .with_user("editor", "editor", Role::Editor);

    AppState::with_parts(db, config, Arc::new(InMemoryClusterStore::new()), Arc::new(auth))
}

async fn setup_app() -> Router {
    kubeview_backend::create_router(setup_state(Config::default()).await)
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_app().await;

    let (status, json) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_requires_token() {
    let app = setup_app().await;

    let (status, json) = send(&app, "GET", "/api/clusters", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, "GET", "/api/clusters", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_me_logout() {
    let app = setup_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "admin", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "admin", "password").await;

    let (status, me) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["username"], "admin");
    assert_eq!(me["user"]["role"], "admin");
    assert_eq!(me["permissions"].as_array().unwrap().len(), 4);

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_permissions_enforced() {
    let app = setup_app().await;
    let viewer = login(&app, "viewer", "viewer").await;
    let editor = login(&app, "editor", "editor").await;

    let (status, rules) = send(&app, "GET", "/api/alert-rules", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rules.as_array().unwrap().len(), 5);

    let rule = json!({"name": "Disk", "resource": "disk", "threshold": 90.0, "severity": "warning"});
    let (status, json) = send(&app, "POST", "/api/alert-rules", Some(&viewer), Some(rule.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "FORBIDDEN");

    let (status, _) = send(&app, "POST", "/api/alert-rules", Some(&editor), Some(rule)).await;
    assert_eq!(status, StatusCode::OK);

    // deleting needs the delete permission
    let (status, _) = send(&app, "DELETE", "/api/alert-rules/high-cpu", Some(&editor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        "/api/clusters",
        Some(&editor),
        Some(json!({"name": "dev", "kubeconfig": KUBECONFIG})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_auth_disabled_allows_anonymous() {
    let config = Config {
        auth_enabled: false,
        ..Config::default()
    };
    let app = kubeview_backend::create_router(setup_state(config).await);

    let (status, json) = send(&app, "GET", "/api/clusters", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cluster_registration() {
    let app = setup_app().await;
    let token = login(&app, "admin", "password").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/clusters",
        Some(&token),
        Some(json!({"name": "broken", "kubeconfig": "not: [valid"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("Invalid kubeconfig"));

    let (status, created) = send(
        &app,
        "POST",
        "/api/clusters",
        Some(&token),
        Some(json!({"name": "dev", "kubeconfig": KUBECONFIG})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("cluster-"));
    assert!(created.get("kubeconfig").is_none());

    let (_, listed) = send(&app, "GET", "/api/clusters", Some(&token), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "dev");

    // registering announces the cluster
    let (_, count) = send(&app, "GET", "/api/notifications/unread-count", Some(&token), None).await;
    assert_eq!(count["count"], 1);

    let (status, _) = send(&app, "DELETE", &format!("/api/clusters/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("/api/clusters/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_cluster_and_kind() {
    let app = setup_app().await;
    let token = login(&app, "admin", "password").await;

    let (status, _) = send(&app, "GET", "/api/clusters/cluster-missing/graph", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/clusters/cluster-missing/health", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(
        &app,
        "GET",
        "/api/clusters/cluster-missing/resources/widgets",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_notification_lifecycle() {
    let app = setup_app().await;
    let token = login(&app, "admin", "password").await;

    for i in 0..3 {
        let (status, created) = send(
            &app,
            "POST",
            "/api/notifications",
            Some(&token),
            Some(json!({
                "title": format!("Deploy {}", i),
                "message": "Rolled out",
                "type": "update",
                "severity": "success"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["read"], false);
        assert_eq!(created["type"], "update");
    }

    let (status, page) = send(&app, "GET", "/api/notifications?page=1&per_page=2", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["success"], true);
    assert_eq!(page["data"].as_array().unwrap().len(), 2);
    assert_eq!(page["data"][0]["title"], "Deploy 2");
    assert_eq!(page["meta"]["total"], 3);
    assert_eq!(page["meta"]["total_pages"], 2);

    let first = page["data"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = send(&app, "POST", &format!("/api/notifications/{}/read", first), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, count) = send(&app, "GET", "/api/notifications/unread-count", Some(&token), None).await;
    assert_eq!(count["count"], 2);

    let (_, unread) = send(&app, "GET", "/api/notifications?unread_only=true", Some(&token), None).await;
    assert_eq!(unread["data"].as_array().unwrap().len(), 2);

    let (_, marked) = send(&app, "POST", "/api/notifications/read-all", Some(&token), None).await;
    assert_eq!(marked["updated"], 2);

    let (status, _) = send(&app, "DELETE", &format!("/api/notifications/{}", first), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("/api/notifications/{}", first), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/notifications",
        Some(&token),
        Some(json!({"title": " ", "message": "x", "type": "alert", "severity": "info"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_alert_rule_crud() {
    let app = setup_app().await;
    let token = login(&app, "admin", "password").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/alert-rules",
        Some(&token),
        Some(json!({"name": "Too high", "resource": "cpu", "threshold": 150.0, "severity": "critical"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    let (status, created) = send(
        &app,
        "POST",
        "/api/alert-rules",
        Some(&token),
        Some(json!({"name": "Pods nearly full", "resource": "pods", "threshold": 95.0, "severity": "critical"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["enabled"], true);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/alert-rules/{}", id),
        Some(&token),
        Some(json!({"name": "Pods full", "resource": "pods", "threshold": 99.0, "severity": "critical", "enabled": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["threshold"], 99.0);

    let (status, toggled) = send(&app, "POST", &format!("/api/alert-rules/{}/toggle", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["enabled"], true);

    let (_, rules) = send(&app, "GET", "/api/alert-rules", Some(&token), None).await;
    assert_eq!(rules.as_array().unwrap().len(), 6);
    assert_eq!(rules[5]["name"], "Pods full");

    let (status, _) = send(&app, "DELETE", &format!("/api/alert-rules/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", &format!("/api/alert-rules/{}/toggle", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/alert-rules/missing",
        Some(&token),
        Some(json!({"name": "x", "resource": "cpu", "threshold": 50.0, "severity": "info"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_graph_build_endpoint() {
    let app = setup_app().await;
    let token = login(&app, "admin", "password").await;

    let (status, graph) = send(
        &app,
        "POST",
        "/api/graph/build",
        Some(&token),
        Some(json!({
            "resource_type": "deployments",
            "resources": [{"metadata": {"uid": "d1", "name": "web"}, "spec": {"replicas": 3}}],
            "layout": true
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 5);
    assert_eq!(graph["edges"].as_array().unwrap().len(), 4);
    assert_eq!(graph["edges"][0]["relation"], "manages");
    assert_eq!(graph["edges"][0]["dashed"], true);
    assert_eq!(graph["positions"].as_array().unwrap().len(), 5);

    let (status, graph) = send(
        &app,
        "POST",
        "/api/graph/build",
        Some(&token),
        Some(json!({
            "resource_type": "services",
            "resources": [{"metadata": {"uid": "s1", "name": "web"}, "spec": {"selector": {"app": "web"}}}],
            "pods": [
                {"metadata": {"uid": "p1", "name": "web-1", "labels": {"app": "web"}}},
                {"metadata": {"uid": "p2", "name": "db-0", "labels": {"app": "db"}}}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
    assert!(graph.get("positions").is_none());
}

#[tokio::test]
async fn test_graph_layout_endpoint() {
    let app = setup_app().await;
    let token = login(&app, "admin", "password").await;

    let nodes = json!([
        {"id": "a", "name": "a", "kind": "pod"},
        {"id": "b", "name": "b", "kind": "pod"},
        {"id": "c", "name": "c", "kind": "service"}
    ]);

    let (status, json) = send(
        &app,
        "POST",
        "/api/graph/layout",
        Some(&token),
        Some(json!({"nodes": nodes, "edges": [{"source": "a", "target": "zzz", "relation": "selects"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("zzz"));

    let (status, layout) = send(
        &app,
        "POST",
        "/api/graph/layout",
        Some(&token),
        Some(json!({
            "nodes": nodes,
            "edges": [{"source": "c", "target": "a", "relation": "selects"}],
            "pins": [{"id": "c", "x": 100.0, "y": 50.0}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let positions = layout["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 3);
    let pinned = positions.iter().find(|p| p["id"] == "c").unwrap();
    assert_eq!(pinned["x"], 100.0);
    assert_eq!(pinned["y"], 50.0);
    assert_eq!(layout["settled"], true);
}

#[tokio::test]
async fn test_metrics_and_openapi_are_public() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, doc) = send(&app, "GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], "KubeView API");
}

#[tokio::test]
async fn test_graph_endpoints_reject_oversized_input() {
    use kubeview_backend::api::graph::{MAX_BUILD_RESOURCES, MAX_LAYOUT_NODES};
    use kubeview_backend::graph::builder::MAX_PLACEHOLDER_REPLICAS;

    let app = setup_app().await;
    let token = login(&app, "viewer", "viewer").await;

    let (status, graph) = send(
        &app,
        "POST",
        "/api/graph/build",
        Some(&token),
        Some(json!({
            "resource_type": "deployments",
            "resources": [{"metadata": {"uid": "d1", "name": "web"}, "spec": {"replicas": 2147483647}}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), MAX_PLACEHOLDER_REPLICAS + 2);

    let resources: Vec<Value> = (0..=MAX_BUILD_RESOURCES).map(|_| json!({})).collect();
    let (status, json) = send(
        &app,
        "POST",
        "/api/graph/build",
        Some(&token),
        Some(json!({"resource_type": "configmaps", "resources": resources})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("Too many resources"));

    let nodes: Vec<Value> = (0..=MAX_LAYOUT_NODES)
        .map(|i| json!({"id": format!("n{}", i), "name": format!("n{}", i), "kind": "pod"}))
        .collect();
    let (status, json) = send(&app, "POST", "/api/graph/layout", Some(&token), Some(json!({"nodes": nodes}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("too large"));
}

#[tokio::test]
async fn test_graph_layout_rejects_duplicate_ids() {
    let app = setup_app().await;
    let token = login(&app, "viewer", "viewer").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/graph/layout",
        Some(&token),
        Some(json!({"nodes": [
            {"id": "a", "name": "first", "kind": "pod"},
            {"id": "a", "name": "second", "kind": "pod"}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Duplicate node ID: a");
}

#[tokio::test]
async fn test_query_token_only_on_event_stream() {
    let app = setup_app().await;
    let token = login(&app, "admin", "password").await;

    let (status, _) = send(&app, "GET", &format!("/api/clusters?token={}", token), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/clusters", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_node_usage_history() {
    use kubeview_backend::models::NodeUsage;

    let state = setup_state(Config::default()).await;
    let app = kubeview_backend::create_router(state.clone());
    let token = login(&app, "admin", "password").await;

    let (_, created) = send(
        &app,
        "POST",
        "/api/clusters",
        Some(&token),
        Some(json!({"name": "dev", "kubeconfig": KUBECONFIG})),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let node = |name: &str, cpu: f64| NodeUsage {
        name: name.to_string(),
        cpu_percent: Some(cpu),
        memory_percent: None,
        pods_percent: Some(10.0),
        pods_used: 11,
        pods_capacity: 110,
    };
    let now = chrono::Utc::now();
    state
        .usage_history
        .record_at(&id, now - chrono::Duration::hours(3), vec![node("worker-1", 90.0)]);
    state
        .usage_history
        .record_at(&id, now, vec![node("worker-1", 40.0), node("worker-2", 60.0)]);

    let uri = format!("/api/clusters/{}/nodes/usage/history", id);
    let (status, points) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let points = points.as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["cpu_percent"], 50.0);
    assert_eq!(points[0]["pods_used"], 22);
    assert!(points[0]["memory_percent"].is_null());

    let (_, points) = send(&app, "GET", &format!("{}?range=6h&node=worker-1", uri), Some(&token), None).await;
    let cpu: Vec<f64> = points
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["cpu_percent"].as_f64().unwrap())
        .collect();
    assert_eq!(cpu, vec![90.0, 40.0]);

    let (status, _) = send(&app, "GET", &format!("{}?range=2w", uri), Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/clusters/cluster-nope/nodes/usage/history", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, "DELETE", &format!("/api/clusters/{}", id), Some(&token), None).await;
    assert_eq!(state.usage_history.sample_count(&id), 0);
}
