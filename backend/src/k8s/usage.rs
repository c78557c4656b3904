//! Node usage as percentages of allocatable capacity
//!
//! CPU and memory come from metrics.k8s.io `NodeMetrics` when the metrics
//! server is installed; pod counts come from the pod list.

use serde_json::Value;
use std::collections::HashMap;

use crate::models::NodeUsage;

/// CPU quantity in millicores (`250m`, `2`, `1500000n`, `0.5`)
pub fn parse_cpu_millis(quantity: &str) -> Option<f64> {
    let quantity = quantity.trim();
    if let Some(n) = quantity.strip_suffix('n') {
        return n.parse::<f64>().ok().map(|v| v / 1_000_000.0);
    }
    if let Some(u) = quantity.strip_suffix('u') {
        return u.parse::<f64>().ok().map(|v| v / 1_000.0);
    }
    if let Some(m) = quantity.strip_suffix('m') {
        return m.parse::<f64>().ok();
    }
    quantity.parse::<f64>().ok().map(|cores| cores * 1000.0)
}

/// Memory quantity in bytes, binary (`Ki`, `Mi`, ...) and decimal (`k`, `M`, ...) suffixes
pub fn parse_memory_bytes(quantity: &str) -> Option<f64> {
    const SUFFIXES: [(&str, f64); 10] = [
        ("Ki", 1024.0),
        ("Mi", 1024.0 * 1024.0),
        ("Gi", 1024.0 * 1024.0 * 1024.0),
        ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
    ];

    let quantity = quantity.trim();
    for (suffix, factor) in SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|v| v * factor);
        }
    }
    quantity.parse::<f64>().ok()
}

/// `(cpu millicores, memory bytes)` per node name from a NodeMetrics list
pub fn metrics_by_node(node_metrics: &[Value]) -> HashMap<String, (f64, f64)> {
    node_metrics
        .iter()
        .filter_map(|item| {
            let name = item.pointer("/metadata/name")?.as_str()?.to_string();
            let usage = item.get("usage")?;
            let cpu = usage.get("cpu").and_then(Value::as_str).and_then(parse_cpu_millis)?;
            let memory = usage
                .get("memory")
                .and_then(Value::as_str)
                .and_then(parse_memory_bytes)?;
            Some((name, (cpu, memory)))
        })
        .collect()
}

/// Combine nodes, pods and optional metrics into per-node usage
pub fn compute_node_usage(
    nodes: &[Value],
    pods: &[Value],
    metrics: &HashMap<String, (f64, f64)>,
) -> Vec<NodeUsage> {
    let mut pods_per_node: HashMap<&str, u32> = HashMap::new();
    for pod in pods {
        let phase = pod.pointer("/status/phase").and_then(Value::as_str);
        if matches!(phase, Some("Succeeded") | Some("Failed")) {
            continue;
        }
        if let Some(node) = pod.pointer("/spec/nodeName").and_then(Value::as_str) {
            *pods_per_node.entry(node).or_default() += 1;
        }
    }

    nodes
        .iter()
        .filter_map(|node| {
            let name = node.pointer("/metadata/name")?.as_str()?;
            let allocatable = node.pointer("/status/allocatable");
            let quantity = |key: &str| {
                allocatable
                    .and_then(|a| a.get(key))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };

            let cpu_capacity = quantity("cpu").as_deref().and_then(parse_cpu_millis);
            let memory_capacity = quantity("memory").as_deref().and_then(parse_memory_bytes);
            let pods_capacity = quantity("pods")
                .and_then(|p| p.parse::<u32>().ok())
                .unwrap_or(0);
            let pods_used = pods_per_node.get(name).copied().unwrap_or(0);

            let (cpu_percent, memory_percent) = match metrics.get(name) {
                Some(&(cpu, memory)) => (
                    percentage(cpu, cpu_capacity),
                    percentage(memory, memory_capacity),
                ),
                None => (None, None),
            };

            Some(NodeUsage {
                name: name.to_string(),
                cpu_percent,
                memory_percent,
                pods_percent: percentage(pods_used as f64, Some(pods_capacity as f64)),
                pods_used,
                pods_capacity,
            })
        })
        .collect()
}

fn percentage(used: f64, capacity: Option<f64>) -> Option<f64> {
    match capacity {
        Some(capacity) if capacity > 0.0 => Some(used / capacity * 100.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cpu() {
        assert_eq!(parse_cpu_millis("250m"), Some(250.0));
        assert_eq!(parse_cpu_millis("2"), Some(2000.0));
        assert_eq!(parse_cpu_millis("0.5"), Some(500.0));
        assert_eq!(parse_cpu_millis("1500000n"), Some(1.5));
        assert_eq!(parse_cpu_millis("lots"), None);
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(parse_memory_bytes("1Ki"), Some(1024.0));
        assert_eq!(parse_memory_bytes("2Gi"), Some(2.0 * 1024.0 * 1024.0 * 1024.0));
        assert_eq!(parse_memory_bytes("500M"), Some(5e8));
        assert_eq!(parse_memory_bytes("1048576"), Some(1048576.0));
    }

    #[test]
    fn test_compute_node_usage() {
        let nodes = vec![json!({
            "metadata": {"name": "node-1"},
            "status": {"allocatable": {"cpu": "4", "memory": "8Gi", "pods": "10"}}
        })];
        let pods = vec![
            json!({"spec": {"nodeName": "node-1"}, "status": {"phase": "Running"}}),
            json!({"spec": {"nodeName": "node-1"}, "status": {"phase": "Pending"}}),
            json!({"spec": {"nodeName": "node-1"}, "status": {"phase": "Succeeded"}}),
            json!({"spec": {"nodeName": "node-2"}, "status": {"phase": "Running"}}),
        ];
        let metrics = metrics_by_node(&[json!({
            "metadata": {"name": "node-1"},
            "usage": {"cpu": "3000m", "memory": "4Gi"}
        })]);

        let usage = compute_node_usage(&nodes, &pods, &metrics);
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].cpu_percent, Some(75.0));
        assert_eq!(usage[0].memory_percent, Some(50.0));
        assert_eq!(usage[0].pods_used, 2);
        assert_eq!(usage[0].pods_percent, Some(20.0));
    }

    #[test]
    fn test_usage_without_metrics_server() {
        let nodes = vec![json!({"metadata": {"name": "n"}, "status": {}})];
        let usage = compute_node_usage(&nodes, &[], &HashMap::new());
        assert_eq!(usage[0].cpu_percent, None);
        assert_eq!(usage[0].pods_percent, None);
    }
}
