use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::k8s::parse_kubeconfig;
use crate::models::ClusterRecord;

/// Registry of clusters the dashboard can talk to
#[cfg_attr(test, mockall::automock)]
pub trait ClusterStore: Send + Sync {
    fn get(&self, id: &str) -> Option<ClusterRecord>;

    /// Validate and register a kubeconfig under a new id
    fn add(&self, name: &str, kubeconfig: &str) -> AppResult<ClusterRecord>;

    /// All clusters in registration order
    fn list(&self) -> Vec<ClusterRecord>;

    /// Returns false when the id is unknown
    fn remove(&self, id: &str) -> bool;
}

/// Process-local store; registrations are lost on restart
#[derive(Default)]
pub struct InMemoryClusterStore {
    clusters: RwLock<Vec<ClusterRecord>>,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn validate_registration(name: &str, kubeconfig: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::bad_request("Cluster name is required"));
    }
    parse_kubeconfig(kubeconfig)
        .map_err(|e| AppError::bad_request(&format!("Invalid kubeconfig: {}", e)))?;
    Ok(())
}

fn new_cluster_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("cluster-{}", &uuid[..8])
}

impl ClusterStore for InMemoryClusterStore {
    fn get(&self, id: &str) -> Option<ClusterRecord> {
        let clusters = self.clusters.read().unwrap_or_else(|e| e.into_inner());
        clusters.iter().find(|c| c.id == id).cloned()
    }

    fn add(&self, name: &str, kubeconfig: &str) -> AppResult<ClusterRecord> {
        validate_registration(name, kubeconfig)?;

        let record = ClusterRecord {
            id: new_cluster_id(),
            name: name.trim().to_string(),
            kubeconfig: kubeconfig.to_string(),
        };

        let mut clusters = self.clusters.write().unwrap_or_else(|e| e.into_inner());
        clusters.push(record.clone());
        Ok(record)
    }

    fn list(&self) -> Vec<ClusterRecord> {
        self.clusters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn remove(&self, id: &str) -> bool {
        let mut clusters = self.clusters.write().unwrap_or_else(|e| e.into_inner());
        let before = clusters.len();
        clusters.retain(|c| c.id != id);
        clusters.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: kind
  cluster:
    server: https://127.0.0.1:6443
contexts:
- name: kind
  context:
    cluster: kind
    user: kind
current-context: kind
users:
- name: kind
  user:
    token: secret
"#;

    #[test]
    fn test_add_list_get_remove() {
        let store = InMemoryClusterStore::new();
        let first = store.add("dev", KUBECONFIG).unwrap();
        let second = store.add("prod", KUBECONFIG).unwrap();

        assert!(first.id.starts_with("cluster-"));
        assert_eq!(first.id.len(), "cluster-".len() + 8);
        assert_ne!(first.id, second.id);

        let names: Vec<_> = store.list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["dev", "prod"]);

        assert_eq!(store.get(&second.id).map(|c| c.name), Some("prod".to_string()));
        assert!(store.remove(&first.id));
        assert!(!store.remove(&first.id));
        assert!(store.get(&first.id).is_none());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_invalid_kubeconfig_rejected() {
        let store = InMemoryClusterStore::new();
        let err = store.add("bad", "kind: Config\n").unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
        assert!(err.to_string().contains("Invalid kubeconfig"));
        assert!(store.list().is_empty());

        assert!(store.add("  ", KUBECONFIG).is_err());
    }
}
