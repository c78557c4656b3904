//! Kubernetes integration module for KubeView
//!
//! This module handles all interactions with registered clusters:
//! - Listing, deleting and applying resources by kind
//! - Cluster health and node usage
//! - Watching pods for change notifications

mod client;
pub mod health;
pub mod usage;
mod watcher;

pub use client::{
    api_resource, parse_kubeconfig, split_manifest, AppliedResource, ClusterOverview, K8sClient,
};
pub use watcher::start_pod_watcher;
