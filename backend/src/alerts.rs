//! Alert rule evaluation over node usage
//!
//! For every (cluster, node, resource) the highest-severity enabled rule
//! whose threshold is reached fires. A notification is produced when a
//! resource starts firing or escalates to a higher severity; dropping below
//! every threshold clears it.

use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::models::{AlertResource, AlertRule, AlertSeverity, Notification, NodeUsage};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AlertKey {
    cluster_id: String,
    node: String,
    resource: AlertResource,
}

/// Resources the usage collector reports; disk and network are not exposed by the API server
const MEASURED: [AlertResource; 3] = [AlertResource::Cpu, AlertResource::Memory, AlertResource::Pods];

/// Highest-severity enabled rule for `resource` whose threshold `value` reaches.
/// Among equal severities the stricter (higher) threshold wins.
pub fn select_rule<'a>(
    rules: &'a [AlertRule],
    resource: AlertResource,
    value: f64,
) -> Option<&'a AlertRule> {
    rules
        .iter()
        .filter(|r| r.enabled && r.resource == resource && value >= r.threshold)
        .max_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then(a.threshold.total_cmp(&b.threshold))
        })
}

fn usage_value(usage: &NodeUsage, resource: AlertResource) -> Option<f64> {
    match resource {
        AlertResource::Cpu => usage.cpu_percent,
        AlertResource::Memory => usage.memory_percent,
        AlertResource::Pods => usage.pods_percent,
        AlertResource::Disk | AlertResource::Network => None,
    }
}

fn alert_message(cluster: &str, usage: &NodeUsage, resource: AlertResource, value: f64) -> String {
    match resource {
        AlertResource::Pods => format!(
            "Node {} in {} is running {}/{} pods ({:.1}%)",
            usage.name, cluster, usage.pods_used, usage.pods_capacity, value
        ),
        AlertResource::Cpu => format!(
            "Node {} in {} CPU usage is at {:.1}%",
            usage.name, cluster, value
        ),
        _ => format!(
            "Node {} in {} {} usage is at {:.1}%",
            usage.name, cluster, resource, value
        ),
    }
}

/// Tracks which node resources are currently firing
#[derive(Debug, Default)]
pub struct AlertEvaluator {
    firing: HashMap<AlertKey, AlertSeverity>,
}

impl AlertEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one cluster's usage snapshot and return notifications for new or escalated alerts
    pub fn evaluate(
        &mut self,
        cluster_id: &str,
        cluster_name: &str,
        usage: &[NodeUsage],
        rules: &[AlertRule],
    ) -> Vec<Notification> {
        let mut notifications = Vec::new();
        let mut seen = HashSet::new();

        for node in usage {
            for resource in MEASURED {
                let key = AlertKey {
                    cluster_id: cluster_id.to_string(),
                    node: node.name.clone(),
                    resource,
                };

                let fired = usage_value(node, resource)
                    .and_then(|value| select_rule(rules, resource, value).map(|rule| (rule, value)));

                match fired {
                    Some((rule, value)) => {
                        let previous = self.firing.insert(key.clone(), rule.severity);
                        if previous.map_or(true, |p| p < rule.severity) {
                            info!(
                                cluster_id,
                                node = %node.name,
                                resource = %resource,
                                severity = %rule.severity,
                                value,
                                "Alert fired"
                            );
                            metrics::increment_counter!(
                                "kubeview_alerts_fired_total",
                                "severity" => rule.severity.to_string()
                            );
                            notifications.push(Notification::alert(
                                rule.name.clone(),
                                alert_message(cluster_name, node, resource, value),
                                rule.severity.into(),
                            ));
                        }
                        seen.insert(key);
                    }
                    None => {
                        self.firing.remove(&key);
                    }
                }
            }
        }

        // nodes that disappeared stop firing
        self.firing
            .retain(|key, _| key.cluster_id != cluster_id || seen.contains(key));

        notifications
    }

    /// Drop all state for a removed cluster
    pub fn forget_cluster(&mut self, cluster_id: &str) {
        self.firing.retain(|key, _| key.cluster_id != cluster_id);
    }

    pub fn firing_count(&self) -> usize {
        self.firing.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationSeverity;

    fn rule(id: &str, resource: AlertResource, threshold: f64, severity: AlertSeverity) -> AlertRule {
        AlertRule {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            resource,
            threshold,
            severity,
            enabled: true,
        }
    }

    fn default_rules() -> Vec<AlertRule> {
        vec![
            rule("High CPU Usage", AlertResource::Cpu, 70.0, AlertSeverity::Warning),
            rule("Critical CPU Usage", AlertResource::Cpu, 85.0, AlertSeverity::Critical),
            rule("High Memory Usage", AlertResource::Memory, 75.0, AlertSeverity::Warning),
            rule("High Pod Count", AlertResource::Pods, 80.0, AlertSeverity::Warning),
        ]
    }

    fn node(cpu: f64) -> NodeUsage {
        NodeUsage {
            name: "node-1".to_string(),
            cpu_percent: Some(cpu),
            memory_percent: Some(10.0),
            pods_percent: Some(10.0),
            pods_used: 11,
            pods_capacity: 110,
        }
    }

    #[test]
    fn test_select_highest_severity() {
        let rules = default_rules();
        assert_eq!(
            select_rule(&rules, AlertResource::Cpu, 90.0).map(|r| r.severity),
            Some(AlertSeverity::Critical)
        );
        assert_eq!(
            select_rule(&rules, AlertResource::Cpu, 70.0).map(|r| r.severity),
            Some(AlertSeverity::Warning)
        );
        assert!(select_rule(&rules, AlertResource::Cpu, 69.9).is_none());
    }

    #[test]
    fn test_disabled_rules_ignored() {
        let mut rules = default_rules();
        rules[1].enabled = false;
        assert_eq!(
            select_rule(&rules, AlertResource::Cpu, 95.0).map(|r| r.name.as_str()),
            Some("High CPU Usage")
        );
    }

    #[test]
    fn test_fires_once_then_escalates_then_clears() {
        let rules = default_rules();
        let mut evaluator = AlertEvaluator::new();

        let fired = evaluator.evaluate("c1", "dev", &[node(75.0)], &rules);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].severity, NotificationSeverity::Warning);
        assert!(fired[0].message.contains("node-1"));

        assert!(evaluator.evaluate("c1", "dev", &[node(78.0)], &rules).is_empty());

        let escalated = evaluator.evaluate("c1", "dev", &[node(92.0)], &rules);
        assert_eq!(escalated.len(), 1);
        assert_eq!(escalated[0].title, "Critical CPU Usage");

        // de-escalation does not notify
        assert!(evaluator.evaluate("c1", "dev", &[node(72.0)], &rules).is_empty());

        assert!(evaluator.evaluate("c1", "dev", &[node(20.0)], &rules).is_empty());
        assert_eq!(evaluator.firing_count(), 0);

        assert_eq!(evaluator.evaluate("c1", "dev", &[node(80.0)], &rules).len(), 1);
    }

    #[test]
    fn test_missing_metrics_never_fire() {
        let rules = vec![
            rule("disk", AlertResource::Disk, 0.0, AlertSeverity::Critical),
            rule("cpu", AlertResource::Cpu, 0.0, AlertSeverity::Critical),
        ];
        let mut usage = node(50.0);
        usage.cpu_percent = None;

        let mut evaluator = AlertEvaluator::new();
        assert!(evaluator.evaluate("c1", "dev", &[usage], &rules).is_empty());
    }

    #[test]
    fn test_removed_node_and_cluster_cleared() {
        let rules = default_rules();
        let mut evaluator = AlertEvaluator::new();
        evaluator.evaluate("c1", "dev", &[node(90.0)], &rules);
        evaluator.evaluate("c2", "prod", &[node(90.0)], &rules);
        assert_eq!(evaluator.firing_count(), 2);

        evaluator.evaluate("c1", "dev", &[], &rules);
        assert_eq!(evaluator.firing_count(), 1);

        evaluator.forget_cluster("c2");
        assert_eq!(evaluator.firing_count(), 0);
    }
}
