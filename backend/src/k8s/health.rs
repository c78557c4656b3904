//! Cluster health summary from node and component status objects

use serde_json::Value;

use crate::models::{ClusterHealth, ComponentHealth, ConditionSummary, NodeHealth};

fn conditions(resource: &Value) -> Vec<ConditionSummary> {
    resource
        .get("conditions")
        .or_else(|| resource.pointer("/status/conditions"))
        .and_then(Value::as_array)
        .map(|conds| {
            conds
                .iter()
                .map(|c| ConditionSummary {
                    condition_type: c
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown")
                        .to_string(),
                    status: c
                        .get("status")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown")
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn name_of(resource: &Value) -> String {
    resource
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

/// Build a [`ClusterHealth`]. Health percentage is the share of ready nodes.
pub fn summarize(api_server: bool, nodes: &[Value], components: &[Value]) -> ClusterHealth {
    let nodes: Vec<NodeHealth> = nodes
        .iter()
        .map(|node| {
            let conditions = conditions(node);
            let ready = conditions
                .iter()
                .any(|c| c.condition_type == "Ready" && c.status == "True");
            NodeHealth {
                name: name_of(node),
                ready,
                conditions,
            }
        })
        .collect();

    let components: Vec<ComponentHealth> = components
        .iter()
        .map(|component| {
            let conditions = conditions(component);
            ComponentHealth {
                name: name_of(component),
                healthy: conditions.iter().all(|c| c.status == "True"),
                conditions,
            }
        })
        .collect();

    let ready = nodes.iter().filter(|n| n.ready).count();
    let health_percentage = if nodes.is_empty() {
        0.0
    } else {
        (ready as f64 / nodes.len() as f64 * 100.0).round()
    };

    let healthy = api_server
        && !nodes.is_empty()
        && ready == nodes.len()
        && components.iter().all(|c| c.healthy);

    ClusterHealth {
        healthy,
        api_server,
        health_percentage,
        nodes,
        components,
    }
}
