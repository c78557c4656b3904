//! Kubernetes Pod Watcher
//!
//! Watches pods of one registered cluster and broadcasts change events so
//! connected dashboards refresh their graphs.

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::Api,
    runtime::{
        watcher::{self, Event as WatchEvent},
        WatchStreamExt,
    },
    Client,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::api::Event;

/// Watch all pods of a cluster until the stream ends or the task is aborted
pub async fn start_pod_watcher(client: Client, cluster_id: String, event_tx: broadcast::Sender<Event>) {
    info!(cluster_id = %cluster_id, "Starting pod watcher");

    let pods: Api<Pod> = Api::all(client);
    let mut pod_stream = watcher::watcher(pods, watcher::Config::default())
        .default_backoff()
        .boxed();

    while let Some(event) = pod_stream.next().await {
        match event {
            Ok(WatchEvent::Applied(pod)) => {
                handle_pod_event(&event_tx, &cluster_id, &pod, "applied");
            }
            Ok(WatchEvent::Deleted(pod)) => {
                handle_pod_event(&event_tx, &cluster_id, &pod, "deleted");
            }
            Ok(WatchEvent::Restarted(pods)) => {
                debug!(cluster_id = %cluster_id, count = pods.len(), "Pod watcher resynced");
                let _ = event_tx.send(Event::ResourceChanged {
                    cluster_id: cluster_id.clone(),
                    kind: "pods".to_string(),
                    namespace: None,
                    name: None,
                    action: "synced".to_string(),
                });
            }
            Err(e) => {
                error!(cluster_id = %cluster_id, "Pod watcher error: {}", e);
                // backoff is applied by the stream, keep polling
            }
        }
    }

    warn!(cluster_id = %cluster_id, "Pod watcher stream ended");
}

fn handle_pod_event(
    event_tx: &broadcast::Sender<Event>,
    cluster_id: &str,
    pod: &Pod,
    action: &str,
) {
    let name = pod.metadata.name.clone();
    let namespace = pod.metadata.namespace.clone();

    debug!(
        cluster_id,
        pod = name.as_deref().unwrap_or("unknown"),
        action,
        "Pod event"
    );

    let _ = event_tx.send(Event::ResourceChanged {
        cluster_id: cluster_id.to_string(),
        kind: "pods".to_string(),
        namespace,
        name,
        action: action.to_string(),
    });
}
