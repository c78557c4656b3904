use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::store::ClusterStore;
use crate::api::Event;
use crate::error::{AppError, AppResult};
use crate::k8s::{start_pod_watcher, K8sClient};
use crate::models::{ClusterRecord, ClusterSummary};

/// Registered clusters plus their cached clients and pod watchers
#[derive(Clone)]
pub struct ClusterManager {
    store: Arc<dyn ClusterStore>,
    clients: Arc<RwLock<HashMap<String, K8sClient>>>,
    watchers: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
    event_tx: broadcast::Sender<Event>,
}

impl ClusterManager {
    pub fn new(store: Arc<dyn ClusterStore>, event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            store,
            clients: Arc::new(RwLock::new(HashMap::new())),
            watchers: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
        }
    }

    pub fn list(&self) -> Vec<ClusterSummary> {
        self.store.list().iter().map(ClusterSummary::from).collect()
    }

    pub fn get(&self, id: &str) -> AppResult<ClusterRecord> {
        self.store
            .get(id)
            .ok_or_else(|| AppError::not_found(&format!("Cluster {} not found", id)))
    }

    /// Register a cluster and start watching its pods.
    /// A cluster whose client cannot be built is still registered and shows as disconnected.
    pub async fn register(&self, name: &str, kubeconfig: &str) -> AppResult<ClusterSummary> {
        let record = self.store.add(name, kubeconfig)?;
        info!(cluster_id = %record.id, name = %record.name, "Registered cluster");

        if let Err(e) = self.client(&record.id).await {
            warn!(cluster_id = %record.id, error = %e, "Cluster registered without a working client");
        }

        let _ = self.event_tx.send(Event::ClusterAdded {
            id: record.id.clone(),
            name: record.name.clone(),
        });

        Ok(ClusterSummary::from(&record))
    }

    pub async fn remove(&self, id: &str) -> AppResult<()> {
        if !self.store.remove(id) {
            return Err(AppError::not_found(&format!("Cluster {} not found", id)));
        }

        self.clients.write().await.remove(id);
        if let Some(handle) = self.watchers.write().await.remove(id) {
            handle.abort();
        }

        info!(cluster_id = %id, "Removed cluster");
        let _ = self.event_tx.send(Event::ClusterRemoved { id: id.to_string() });
        Ok(())
    }

    /// Cached client for a cluster, built (and its watcher started) on first use
    pub async fn client(&self, id: &str) -> AppResult<K8sClient> {
        if let Some(client) = self.clients.read().await.get(id) {
            return Ok(client.clone());
        }

        let record = self.get(id)?;
        let client = K8sClient::from_kubeconfig(&record.kubeconfig)
            .await
            .map_err(AppError::cluster)?;

        // held until the watcher is registered so `remove` cannot interleave
        let mut clients = self.clients.write().await;
        // another request may have won the race
        if let Some(existing) = clients.get(id) {
            return Ok(existing.clone());
        }
        // the cluster may have been removed while the client was built
        self.get(id)?;

        clients.insert(id.to_string(), client.clone());
        self.spawn_watcher(id, &client).await;
        Ok(client)
    }

    async fn spawn_watcher(&self, id: &str, client: &K8sClient) {
        let handle = tokio::spawn(start_pod_watcher(
            client.inner().clone(),
            id.to_string(),
            self.event_tx.clone(),
        ));

        if let Some(previous) = self.watchers.write().await.insert(id.to_string(), handle) {
            previous.abort();
        }
    }

    pub async fn watcher_count(&self) -> usize {
        self.watchers.read().await.len()
    }
}
