use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::notification::NotificationSeverity;

/// Node resource an alert rule watches
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertResource {
    Cpu,
    Memory,
    Pods,
    Disk,
    Network,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl From<AlertSeverity> for NotificationSeverity {
    fn from(severity: AlertSeverity) -> Self {
        match severity {
            AlertSeverity::Info => NotificationSeverity::Info,
            AlertSeverity::Warning => NotificationSeverity::Warning,
            AlertSeverity::Critical => NotificationSeverity::Critical,
        }
    }
}

/// Threshold rule over node usage percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub resource: AlertResource,
    /// Percentage, 0-100
    pub threshold: f64,
    pub severity: AlertSeverity,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlertRuleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub resource: AlertResource,
    pub threshold: f64,
    pub severity: AlertSeverity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AlertRuleRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Rule name is required".to_string());
        }
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(format!(
                "Threshold must be between 0 and 100, got {}",
                self.threshold
            ));
        }
        Ok(())
    }

    pub fn into_rule(self, id: Option<String>) -> AlertRule {
        AlertRule {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: self.name,
            description: self.description,
            resource: self.resource,
            threshold: self.threshold,
            severity: self.severity,
            enabled: self.enabled,
        }
    }
}
