pub mod alerts;
pub mod auth;
pub mod clusters;
pub mod graph;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod openapi;
pub mod resources;
pub mod response;
pub mod ws;

use crate::alerts::AlertEvaluator;
use crate::auth::{AuthProvider, SessionStore, StaticAuthProvider, Role};
use crate::clusters::{ClusterManager, ClusterStore, InMemoryClusterStore};
use crate::config::Config;
use crate::db::Database;
use crate::error::AppResult;
use crate::history::UsageHistory;
use crate::models::Notification;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub event_tx: broadcast::Sender<Event>,
    pub clusters: ClusterManager,
    pub auth: Arc<dyn AuthProvider>,
    pub sessions: SessionStore,
    pub alerts: Arc<Mutex<AlertEvaluator>>,
    pub usage_history: UsageHistory,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let store: Arc<dyn ClusterStore> = Arc::new(InMemoryClusterStore::new());
        let auth = StaticAuthProvider::new().with_user(
            &config.admin_username,
            &config.admin_password,
            Role::Admin,
        );
        Self::with_parts(db, config, store, Arc::new(auth))
    }

    /// Build state around explicit cluster store and auth provider implementations
    pub fn with_parts(
        db: Database,
        config: Config,
        store: Arc<dyn ClusterStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let sessions = SessionStore::new(chrono::Duration::hours(config.session_ttl_hours));
        let usage_history = UsageHistory::new(config.usage_history_samples);
        Self {
            db,
            clusters: ClusterManager::new(store, event_tx.clone()),
            config,
            event_tx,
            auth,
            sessions,
            alerts: Arc::new(Mutex::new(AlertEvaluator::new())),
            usage_history,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Persist a notification and push it to connected clients
    pub async fn notify(&self, notification: Notification) -> AppResult<Notification> {
        self.db.create_notification(&notification).await?;
        let _ = self.event_tx.send(Event::NotificationCreated {
            notification: notification.clone(),
        });
        Ok(notification)
    }
}

/// Events broadcasted via WebSocket
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    #[serde(rename = "cluster:added")]
    ClusterAdded { id: String, name: String },
    #[serde(rename = "cluster:removed")]
    ClusterRemoved { id: String },
    #[serde(rename = "cluster:status")]
    ClusterStatus { id: String, connected: bool },
    #[serde(rename = "resource:changed")]
    ResourceChanged {
        cluster_id: String,
        kind: String,
        namespace: Option<String>,
        name: Option<String>,
        action: String,
    },
    #[serde(rename = "notification:created")]
    NotificationCreated { notification: Notification },
    #[serde(rename = "alert-rules:changed")]
    AlertRulesChanged,
}
