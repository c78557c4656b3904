//! Cluster registry
//!
//! Clusters are registered from kubeconfig text and kept in a
//! [`ClusterStore`]; [`ClusterManager`] adds client caching and per-cluster
//! pod watchers on top.

mod manager;
mod store;

pub use manager::ClusterManager;
pub use store::{ClusterStore, InMemoryClusterStore};

use kube::config::Kubeconfig;
use tracing::{info, warn};

use crate::config::Config;

/// Kubeconfig text for the cluster registered at startup.
///
/// An explicit `KUBECONFIG` path wins; otherwise the local kubeconfig is used
/// when `load_local_kubeconfig` is set and one can be found.
pub fn load_default_kubeconfig(config: &Config) -> Option<String> {
    if let Some(path) = &config.kubeconfig {
        return match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to read configured kubeconfig");
                None
            }
        };
    }

    if !config.load_local_kubeconfig {
        return None;
    }

    match Kubeconfig::read() {
        Ok(kubeconfig) => match serde_yaml::to_string(&kubeconfig) {
            Ok(text) => {
                info!("Loaded local kubeconfig");
                Some(text)
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize local kubeconfig");
                None
            }
        },
        Err(e) => {
            info!(error = %e, "No local kubeconfig found");
            None
        }
    }
}
