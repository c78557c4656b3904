//! Relationship graph construction
//!
//! Turns a flat list of resource objects (raw Kubernetes JSON) of one declared
//! type into nodes and edges:
//! - pods expand into their containers and owners
//! - deployments expand into a replicaset and its pods
//! - services with a selector (`{}` included) expand into an endpoint and the
//!   selected pods
//! - every other type contributes only its own node
//!
//! Without a live pod list the pods under deployments and services are
//! placeholders (`replicas` of them up to [`MAX_PLACEHOLDER_REPLICAS`], or
//! three per service). With a live pod list the builder links the pods
//! actually matched by each selector; an empty selector links none.
//!
//! Input is never trusted: missing or mistyped fields fall back to defaults
//! and never abort the build.

use serde_json::Value;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use super::selector::LabelSelector;
use super::types::{GraphNode, Relation, ResourceGraph};
use crate::models::ResourceKind;

/// Placeholder pods drawn under a service endpoint
pub const SERVICE_PLACEHOLDER_PODS: usize = 3;

/// Upper bound on placeholder pods drawn under one deployment
pub const MAX_PLACEHOLDER_REPLICAS: usize = 100;

const UNKNOWN: &str = "unknown";

/// Builds a [`ResourceGraph`] for one resource type
pub struct GraphBuilder<'a> {
    kind: Option<ResourceKind>,
    node_kind: String,
    live_pods: Option<&'a [Value]>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(resource_type: &str) -> Self {
        let kind = ResourceKind::from_str(resource_type.trim()).ok();
        let node_kind = match kind {
            Some(k) => k.singular().to_string(),
            None => resource_type.trim().to_lowercase(),
        };

        Self {
            kind,
            node_kind,
            live_pods: None,
        }
    }

    /// Link real pods by label selector instead of drawing placeholders
    pub fn with_live_pods(mut self, pods: &'a [Value]) -> Self {
        self.live_pods = Some(pods);
        self
    }

    pub fn build(&self, resources: &[Value]) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        let live_pods = self.live_pods.map(|pods| {
            pods.iter()
                .map(|pod| (base_node(pod, "pod"), pod))
                .collect::<Vec<_>>()
        });

        for resource in resources {
            let node = base_node(resource, &self.node_kind);
            let id = node.id.clone();
            let name = node.name.clone();
            graph.upsert_node(node);

            match self.kind {
                Some(ResourceKind::Pods) => expand_pod(&mut graph, resource, &id),
                Some(ResourceKind::Deployments) => match &live_pods {
                    Some(pods) => expand_deployment_live(&mut graph, resource, &id, &name, pods),
                    None => expand_deployment(&mut graph, resource, &id, &name),
                },
                Some(ResourceKind::Services) => match &live_pods {
                    Some(pods) => expand_service_live(&mut graph, resource, &id, &name, pods),
                    None => expand_service(&mut graph, resource, &id, &name),
                },
                _ => {}
            }
        }

        debug!(
            kind = %self.node_kind,
            resources = resources.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Built resource graph"
        );

        graph
    }
}

/// Build a graph for `resource_type` with placeholder pods
pub fn build_graph(resource_type: &str, resources: &[Value]) -> ResourceGraph {
    GraphBuilder::new(resource_type).build(resources)
}

/// Whole-namespace view: services select pods, pods run on cluster nodes
pub fn build_cluster_overview(pods: &[Value], services: &[Value], nodes: &[Value]) -> ResourceGraph {
    let mut graph = ResourceGraph::new();

    let mut node_ids = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut graph_node = base_node(node, "node");
        graph_node.status = Some(node_readiness(node).to_string());
        node_ids.push((graph_node.name.clone(), graph_node.id.clone()));
        graph.upsert_node(graph_node);
    }

    let selectors: Vec<(String, LabelSelector)> = services
        .iter()
        .map(|service| {
            let graph_node = base_node(service, "service");
            let id = graph_node.id.clone();
            graph.upsert_node(graph_node);
            let selector = service
                .pointer("/spec/selector")
                .and_then(LabelSelector::from_map)
                .unwrap_or_default();
            (id, selector)
        })
        .collect();

    for pod in pods {
        let graph_node = base_node(pod, "pod");
        let pod_id = graph_node.id.clone();
        graph.upsert_node(graph_node);

        for (service_id, selector) in &selectors {
            if !selector.is_empty() && selector.matches_resource(pod) {
                graph.add_edge(service_id, &pod_id, Relation::Selects);
            }
        }

        if let Some(node_name) = pod.pointer("/spec/nodeName").and_then(Value::as_str) {
            if let Some((_, node_id)) = node_ids.iter().find(|(name, _)| name == node_name) {
                graph.add_edge(&pod_id, node_id, Relation::RunsOn);
            }
        }
    }

    graph
}

fn base_node(resource: &Value, kind: &str) -> GraphNode {
    let name = resource
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN);

    let id = match resource.pointer("/metadata/uid").and_then(Value::as_str) {
        Some(uid) if !uid.is_empty() => uid.to_string(),
        _ => format!("{}-{}", name, Uuid::new_v4()),
    };

    GraphNode::new(id, name, kind).with_status(resource_status(resource))
}

/// `status.phase`, else the first condition's status
fn resource_status(resource: &Value) -> &str {
    resource
        .pointer("/status/phase")
        .and_then(Value::as_str)
        .or_else(|| {
            resource
                .pointer("/status/conditions/0/status")
                .and_then(Value::as_str)
        })
        .unwrap_or(UNKNOWN)
}

fn node_readiness(node: &Value) -> &'static str {
    let ready = node
        .pointer("/status/conditions")
        .and_then(Value::as_array)
        .and_then(|conds| {
            conds
                .iter()
                .find(|c| c.get("type").and_then(Value::as_str) == Some("Ready"))
        })
        .and_then(|c| c.get("status").and_then(Value::as_str));

    match ready {
        Some("True") => "Ready",
        Some(_) => "NotReady",
        None => "Unknown",
    }
}

fn expand_pod(graph: &mut ResourceGraph, pod: &Value, pod_id: &str) {
    if let Some(containers) = pod.pointer("/spec/containers").and_then(Value::as_array) {
        for (i, container) in containers.iter().enumerate() {
            // unnamed containers are told apart by position
            let (suffix, name) = match container.get("name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => (name.to_string(), name.to_string()),
                _ => (i.to_string(), format!("container-{}", i)),
            };
            let container_id = format!("{}-container-{}", pod_id, suffix);
            graph.add_node_if_absent(GraphNode::new(&container_id, name, "container"));
            graph.add_edge(pod_id, &container_id, Relation::Contains);
        }
    }

    if let Some(owners) = pod
        .pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
    {
        for owner in owners {
            let name = owner.get("name").and_then(Value::as_str).unwrap_or(UNKNOWN);
            let kind = owner
                .get("kind")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN)
                .to_lowercase();

            let owner_id = match owner.get("uid").and_then(Value::as_str) {
                Some(uid) if !uid.is_empty() => uid.to_string(),
                _ => format!("{}-{}", name, kind),
            };

            graph.add_node_if_absent(GraphNode::new(&owner_id, name, kind));
            graph.add_edge(&owner_id, pod_id, Relation::Owns);
        }
    }
}

/// `spec.replicas`, 1 when unset, clamped to `0..=MAX_PLACEHOLDER_REPLICAS`
fn desired_replicas(deployment: &Value) -> usize {
    match deployment.pointer("/spec/replicas").and_then(Value::as_i64) {
        Some(n) => n.clamp(0, MAX_PLACEHOLDER_REPLICAS as i64) as usize,
        None => 1,
    }
}

fn add_replicaset(graph: &mut ResourceGraph, deployment_id: &str, name: &str) -> String {
    let rs_id = format!("{}-rs", deployment_id);
    graph.add_node_if_absent(GraphNode::new(&rs_id, format!("{}-rs", name), "replicaset"));
    graph.add_edge(deployment_id, &rs_id, Relation::Manages);
    rs_id
}

fn expand_deployment(graph: &mut ResourceGraph, deployment: &Value, id: &str, name: &str) {
    let rs_id = add_replicaset(graph, id, name);

    for i in 0..desired_replicas(deployment) {
        let pod_id = format!("{}-pod-{}", rs_id, i);
        graph.add_node_if_absent(GraphNode::new(&pod_id, format!("{}-pod-{}", name, i), "pod"));
        graph.add_edge(&rs_id, &pod_id, Relation::Manages);
    }
}

fn expand_deployment_live(
    graph: &mut ResourceGraph,
    deployment: &Value,
    id: &str,
    name: &str,
    pods: &[(GraphNode, &Value)],
) {
    let rs_id = add_replicaset(graph, id, name);

    let Some(selector) = deployment
        .pointer("/spec/selector")
        .and_then(LabelSelector::from_label_selector)
    else {
        return;
    };
    if selector.is_empty() {
        return;
    }

    link_matching_pods(graph, &rs_id, &selector, pods, Relation::Manages);
}

/// The service selector when `spec.selector` is a map, empty or not
fn service_selector(service: &Value) -> Option<LabelSelector> {
    service
        .pointer("/spec/selector")
        .and_then(LabelSelector::from_map)
}

fn add_endpoint(graph: &mut ResourceGraph, service_id: &str, name: &str) -> String {
    let endpoint_id = format!("{}-endpoint", service_id);
    graph.add_node_if_absent(GraphNode::new(
        &endpoint_id,
        format!("{}-endpoints", name),
        "endpoint",
    ));
    graph.add_edge(service_id, &endpoint_id, Relation::Exposes);
    endpoint_id
}

fn expand_service(graph: &mut ResourceGraph, service: &Value, id: &str, name: &str) {
    if service_selector(service).is_none() {
        return;
    }

    let endpoint_id = add_endpoint(graph, id, name);
    for i in 0..SERVICE_PLACEHOLDER_PODS {
        let pod_id = format!("{}-pod-{}", endpoint_id, i);
        graph.add_node_if_absent(GraphNode::new(&pod_id, format!("pod-{}", i), "pod"));
        graph.add_edge(&endpoint_id, &pod_id, Relation::Selects);
    }
}

fn expand_service_live(
    graph: &mut ResourceGraph,
    service: &Value,
    id: &str,
    name: &str,
    pods: &[(GraphNode, &Value)],
) {
    let Some(selector) = service_selector(service) else {
        return;
    };

    let endpoint_id = add_endpoint(graph, id, name);
    if !selector.is_empty() {
        link_matching_pods(graph, &endpoint_id, &selector, pods, Relation::Selects);
    }
}

fn link_matching_pods(
    graph: &mut ResourceGraph,
    from: &str,
    selector: &LabelSelector,
    pods: &[(GraphNode, &Value)],
    relation: Relation,
) {
    for (pod_node, pod) in pods {
        if selector.matches_resource(pod) {
            graph.add_node_if_absent(pod_node.clone());
            graph.add_edge(from, &pod_node.id, relation);
        }
    }
}
