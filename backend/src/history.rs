//! Rolling node usage history
//!
//! The monitor records one sample per cluster and pass. Each cluster keeps at
//! most `capacity` samples; the oldest are dropped first.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::models::{NodeUsage, UsagePoint};

#[derive(Debug, Clone)]
struct UsageSample {
    timestamp: DateTime<Utc>,
    nodes: Vec<NodeUsage>,
}

#[derive(Clone)]
pub struct UsageHistory {
    capacity: usize,
    samples: Arc<RwLock<HashMap<String, VecDeque<UsageSample>>>>,
}

impl UsageHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn record(&self, cluster_id: &str, nodes: Vec<NodeUsage>) {
        self.record_at(cluster_id, Utc::now(), nodes);
    }

    pub fn record_at(&self, cluster_id: &str, timestamp: DateTime<Utc>, nodes: Vec<NodeUsage>) {
        let mut samples = self.samples.write().unwrap_or_else(|e| e.into_inner());
        let ring = samples
            .entry(cluster_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity.min(256)));

        ring.push_back(UsageSample { timestamp, nodes });
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    /// Points at or after `since`, oldest first, for one node or (with `None`) all of them.
    /// Samples in which the node does not appear are skipped.
    pub fn query(&self, cluster_id: &str, since: DateTime<Utc>, node: Option<&str>) -> Vec<UsagePoint> {
        let samples = self.samples.read().unwrap_or_else(|e| e.into_inner());
        let Some(ring) = samples.get(cluster_id) else {
            return Vec::new();
        };

        ring.iter()
            .filter(|sample| sample.timestamp >= since)
            .filter_map(|sample| {
                let selected: Vec<&NodeUsage> = sample
                    .nodes
                    .iter()
                    .filter(|n| node.map_or(true, |name| n.name == name))
                    .collect();
                (!selected.is_empty()).then(|| aggregate(sample.timestamp, &selected))
            })
            .collect()
    }

    pub fn sample_count(&self, cluster_id: &str) -> usize {
        let samples = self.samples.read().unwrap_or_else(|e| e.into_inner());
        samples.get(cluster_id).map_or(0, VecDeque::len)
    }

    pub fn forget_cluster(&self, cluster_id: &str) {
        let mut samples = self.samples.write().unwrap_or_else(|e| e.into_inner());
        samples.remove(cluster_id);
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn aggregate(timestamp: DateTime<Utc>, nodes: &[&NodeUsage]) -> UsagePoint {
    UsagePoint {
        timestamp,
        cpu_percent: mean(nodes.iter().filter_map(|n| n.cpu_percent)),
        memory_percent: mean(nodes.iter().filter_map(|n| n.memory_percent)),
        pods_used: nodes.iter().map(|n| n.pods_used).sum(),
        pods_capacity: nodes.iter().map(|n| n.pods_capacity).sum(),
        nodes: nodes.len(),
    }
}
