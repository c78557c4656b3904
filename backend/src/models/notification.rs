use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationType {
    Alert,
    Update,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationSeverity {
    Info,
    Success,
    Warning,
    Critical,
}

/// A message shown in the dashboard's notification tray
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub severity: NotificationSeverity,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Request body for posting a notification; id, timestamp and read state are server-assigned
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateNotification {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub severity: NotificationSeverity,
}

impl Notification {
    pub fn new(request: CreateNotification) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: request.title,
            message: request.message,
            notification_type: request.notification_type,
            severity: request.severity,
            timestamp: Utc::now(),
            read: false,
        }
    }

    pub fn alert(title: impl Into<String>, message: impl Into<String>, severity: NotificationSeverity) -> Self {
        Self::new(CreateNotification {
            title: title.into(),
            message: message.into(),
            notification_type: NotificationType::Alert,
            severity,
        })
    }

    pub fn update(title: impl Into<String>, message: impl Into<String>, severity: NotificationSeverity) -> Self {
        Self::new(CreateNotification {
            title: title.into(),
            message: message.into(),
            notification_type: NotificationType::Update,
            severity,
        })
    }
}
