//! Periodic cluster monitor
//!
//! Every `poll_interval_secs` the monitor checks each registered cluster's
//! API server and reports connectivity changes. For connected clusters it
//! samples node usage into the history and evaluates alert rules against it.
//! Expired sessions are purged at the end of each pass.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{AppState, Event};
use crate::error::{AppError, AppResult};
use crate::models::{ClusterSummary, Notification, NotificationSeverity};

pub struct Monitor {
    state: AppState,
    connectivity: HashMap<String, bool>,
}

/// Notification for a connectivity change; the first observation only reports failures
fn connectivity_notification(
    cluster: &ClusterSummary,
    previous: Option<bool>,
    connected: bool,
) -> Option<Notification> {
    match (previous, connected) {
        (Some(was), now) if was == now => None,
        (None, true) => None,
        (_, true) => Some(Notification::update(
            "Cluster reconnected",
            format!("Connection to {} restored", cluster.name),
            NotificationSeverity::Success,
        )),
        (_, false) => Some(Notification::alert(
            "Cluster unreachable",
            format!("Cannot reach the API server of {}", cluster.name),
            NotificationSeverity::Critical,
        )),
    }
}

impl Monitor {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            connectivity: HashMap::new(),
        }
    }

    /// Run passes forever on the configured interval
    pub fn spawn(state: AppState) -> JoinHandle<()> {
        let period = Duration::from_secs(state.config.poll_interval_secs.max(1));
        let mut monitor = Monitor::new(state);

        tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Cluster monitor started");
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                monitor.run_once().await;
            }
        })
    }

    /// One pass over every registered cluster
    pub async fn run_once(&mut self) {
        let clusters = self.state.clusters.list();

        self.connectivity
            .retain(|id, _| clusters.iter().any(|c| &c.id == id));

        for cluster in &clusters {
            let connected = self.check_cluster(cluster).await;
            if connected {
                if let Err(e) = self.collect_usage(cluster).await {
                    warn!(cluster_id = %cluster.id, error = %e, "Usage collection failed");
                }
            }
        }

        let purged = self.state.sessions.purge_expired().await;
        if purged > 0 {
            debug!(purged, "Purged expired sessions");
        }
    }

    async fn check_cluster(&mut self, cluster: &ClusterSummary) -> bool {
        let connected = match self.state.clusters.client(&cluster.id).await {
            Ok(client) => client.health_check().await.is_ok(),
            Err(_) => false,
        };

        let previous = self.connectivity.insert(cluster.id.clone(), connected);
        if previous != Some(connected) {
            info!(cluster_id = %cluster.id, connected, "Cluster connectivity changed");
            let _ = self.state.event_tx.send(Event::ClusterStatus {
                id: cluster.id.clone(),
                connected,
            });
        }

        if let Some(notification) = connectivity_notification(cluster, previous, connected) {
            if let Err(e) = self.state.notify(notification).await {
                warn!(error = %e, "Failed to store connectivity notification");
            }
        }

        connected
    }

    async fn collect_usage(&self, cluster: &ClusterSummary) -> AppResult<()> {
        let client = self.state.clusters.client(&cluster.id).await?;
        let usage = client.node_usage().await.map_err(AppError::cluster)?;
        self.state.usage_history.record(&cluster.id, usage.clone());

        let rules = self.state.db.list_alert_rules().await?;

        let notifications = self
            .state
            .alerts
            .lock()
            .await
            .evaluate(&cluster.id, &cluster.name, &usage, &rules);

        for notification in notifications {
            self.state.notify(notification).await?;
        }
        Ok(())
    }
}
