use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A registered cluster. The kubeconfig never leaves the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
    pub kubeconfig: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClusterSummary {
    pub id: String,
    pub name: String,
}

impl From<&ClusterRecord> for ClusterSummary {
    fn from(record: &ClusterRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddClusterRequest {
    pub name: String,
    pub kubeconfig: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClusterStatus {
    pub id: String,
    pub connected: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConditionSummary {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NodeHealth {
    pub name: String,
    pub ready: bool,
    pub conditions: Vec<ConditionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub name: String,
    pub healthy: bool,
    pub conditions: Vec<ConditionSummary>,
}

/// Aggregated health as reported by the API server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClusterHealth {
    pub healthy: bool,
    pub api_server: bool,
    /// Share of ready nodes, 0-100
    pub health_percentage: f64,
    pub nodes: Vec<NodeHealth>,
    pub components: Vec<ComponentHealth>,
}

/// Usage of one node as percentages of its allocatable capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NodeUsage {
    pub name: String,
    /// None when metrics.k8s.io is not installed
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub pods_percent: Option<f64>,
    pub pods_used: u32,
    pub pods_capacity: u32,
}

/// Window of a node usage history query
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
pub enum UsageRange {
    #[default]
    #[serde(rename = "1h")]
    #[strum(serialize = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    #[strum(serialize = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    #[strum(serialize = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    #[strum(serialize = "7d")]
    SevenDays,
}

impl UsageRange {
    pub fn duration(&self) -> chrono::Duration {
        match self {
            UsageRange::OneHour => chrono::Duration::hours(1),
            UsageRange::SixHours => chrono::Duration::hours(6),
            UsageRange::OneDay => chrono::Duration::hours(24),
            UsageRange::SevenDays => chrono::Duration::days(7),
        }
    }
}

/// Usage of the selected nodes at one sample time.
/// Percentages are averaged over the nodes that report them; pod counts are summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UsagePoint {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub pods_used: u32,
    pub pods_capacity: u32,
    pub nodes: usize,
}
