//! Kubernetes client wrapper for KubeView

use anyhow::{anyhow, Context, Result};
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{
    ComponentStatus, ConfigMap, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
    Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::{
    api::{Api, DeleteParams, DynamicObject, GroupVersionKind, ListParams, Patch, PatchParams},
    config::{KubeConfigOptions, Kubeconfig},
    discovery::{self, ApiResource, Scope},
    Client, Config,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use super::{health, usage};
use crate::models::{ClusterHealth, NodeUsage, ResourceKind};

const FIELD_MANAGER: &str = "kubeview";
const DEFAULT_NAMESPACE: &str = "default";

/// Resource lists backing the dashboard overview and graph views
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ClusterOverview {
    #[schema(value_type = Vec<Object>)]
    pub pods: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub deployments: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub services: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub nodes: Vec<Value>,
}

/// One object created or updated by [`K8sClient::apply_manifest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedResource {
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Map a resource kind to its API group/version/plural
pub fn api_resource(kind: ResourceKind) -> ApiResource {
    match kind {
        ResourceKind::Pods => ApiResource::erase::<Pod>(&()),
        ResourceKind::Deployments => ApiResource::erase::<Deployment>(&()),
        ResourceKind::ReplicaSets => ApiResource::erase::<ReplicaSet>(&()),
        ResourceKind::Services => ApiResource::erase::<Service>(&()),
        ResourceKind::Ingresses => ApiResource::erase::<Ingress>(&()),
        ResourceKind::ConfigMaps => ApiResource::erase::<ConfigMap>(&()),
        ResourceKind::Secrets => ApiResource::erase::<Secret>(&()),
        ResourceKind::Nodes => ApiResource::erase::<Node>(&()),
        ResourceKind::Namespaces => ApiResource::erase::<Namespace>(&()),
        ResourceKind::PersistentVolumes => ApiResource::erase::<PersistentVolume>(&()),
        ResourceKind::PersistentVolumeClaims => ApiResource::erase::<PersistentVolumeClaim>(&()),
        ResourceKind::StorageClasses => ApiResource::erase::<StorageClass>(&()),
        ResourceKind::Roles => ApiResource::erase::<Role>(&()),
        ResourceKind::RoleBindings => ApiResource::erase::<RoleBinding>(&()),
        ResourceKind::ClusterRoles => ApiResource::erase::<ClusterRole>(&()),
        ResourceKind::ClusterRoleBindings => ApiResource::erase::<ClusterRoleBinding>(&()),
        ResourceKind::HorizontalPodAutoscalers => {
            ApiResource::erase::<HorizontalPodAutoscaler>(&())
        }
    }
}

fn node_metrics_resource() -> ApiResource {
    ApiResource {
        group: "metrics.k8s.io".to_string(),
        version: "v1beta1".to_string(),
        api_version: "metrics.k8s.io/v1beta1".to_string(),
        kind: "NodeMetrics".to_string(),
        plural: "nodes".to_string(),
    }
}

/// Parse kubeconfig text and check it names at least one context or cluster
pub fn parse_kubeconfig(text: &str) -> Result<Kubeconfig> {
    let kubeconfig = Kubeconfig::from_yaml(text).context("kubeconfig is not valid YAML")?;
    if kubeconfig.contexts.is_empty() && kubeconfig.clusters.is_empty() {
        return Err(anyhow!("kubeconfig has no contexts or clusters"));
    }
    Ok(kubeconfig)
}

/// Wrapper around kube::Client with the operations the dashboard needs
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Build a client from kubeconfig text, using its current context
    #[instrument(skip_all)]
    pub async fn from_kubeconfig(text: &str) -> Result<Self> {
        let kubeconfig = parse_kubeconfig(text)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context("failed to load kubeconfig")?;
        let client = Client::try_from(config)?;

        debug!("Created Kubernetes client from kubeconfig");

        Ok(Self { client })
    }

    /// Get the inner kube Client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn dynamic_api(&self, kind: ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = api_resource(kind);
        match namespace {
            Some(ns) if kind.is_namespaced() => Api::namespaced_with(self.client.clone(), ns, &ar),
            _ => Api::all_with(self.client.clone(), &ar),
        }
    }

    /// Check if cluster is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let version = self.client.apiserver_version().await?;
        debug!(version = %version.git_version, "Kubernetes cluster is healthy");
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        metrics::increment_counter!("kubeview_k8s_requests_total", "operation" => "list", "kind" => "namespaces");

        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    /// List objects of one kind as raw JSON. `None` namespace lists across all namespaces.
    #[instrument(skip(self, kind), fields(kind = kind.as_ref()))]
    pub async fn list_resources(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>> {
        metrics::increment_counter!("kubeview_k8s_requests_total", "operation" => "list", "kind" => kind.to_string());

        let api = self.dynamic_api(kind, namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list {}", kind))?;

        debug!(count = list.items.len(), "Listed resources");

        list.items
            .into_iter()
            .map(|obj| serde_json::to_value(obj).map_err(Into::into))
            .collect()
    }

    /// Fetch pods, deployments, services and nodes concurrently
    #[instrument(skip(self))]
    pub async fn fetch_overview(&self, namespace: Option<&str>) -> Result<ClusterOverview> {
        let (pods, deployments, services, nodes) = tokio::try_join!(
            self.list_resources(ResourceKind::Pods, namespace),
            self.list_resources(ResourceKind::Deployments, namespace),
            self.list_resources(ResourceKind::Services, namespace),
            self.list_resources(ResourceKind::Nodes, None),
        )?;

        Ok(ClusterOverview {
            pods,
            deployments,
            services,
            nodes,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_resource(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<()> {
        metrics::increment_counter!("kubeview_k8s_requests_total", "operation" => "delete", "kind" => kind.to_string());

        let namespace = namespace.unwrap_or(DEFAULT_NAMESPACE);
        let api = self.dynamic_api(kind, Some(namespace));
        api.delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("failed to delete {} {}", kind.singular(), name))?;

        info!(kind = %kind, name, "Deleted resource");
        Ok(())
    }

    /// Server-side apply every document of a (multi-document) YAML manifest
    #[instrument(skip(self, manifest))]
    pub async fn apply_manifest(&self, manifest: &str) -> Result<Vec<AppliedResource>> {
        let documents = split_manifest(manifest)?;
        if documents.is_empty() {
            return Err(anyhow!("manifest contains no documents"));
        }

        let params = PatchParams::apply(FIELD_MANAGER).force();
        let mut applied = Vec::with_capacity(documents.len());

        for doc in documents {
            let gvk = document_gvk(&doc)?;
            let name = doc
                .pointer("/metadata/name")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("{} is missing metadata.name", gvk.kind))?
                .to_string();

            let (ar, caps) = discovery::pinned_kind(&self.client, &gvk)
                .await
                .with_context(|| format!("unknown resource kind {}", gvk.kind))?;

            let namespace = match caps.scope {
                Scope::Namespaced => Some(
                    doc.pointer("/metadata/namespace")
                        .and_then(Value::as_str)
                        .unwrap_or(DEFAULT_NAMESPACE)
                        .to_string(),
                ),
                Scope::Cluster => None,
            };

            let api: Api<DynamicObject> = match &namespace {
                Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
                None => Api::all_with(self.client.clone(), &ar),
            };

            metrics::increment_counter!("kubeview_k8s_requests_total", "operation" => "apply", "kind" => gvk.kind.clone());

            let object: DynamicObject = serde_json::from_value(doc)?;
            api.patch(&name, &params, &Patch::Apply(&object))
                .await
                .with_context(|| format!("failed to apply {} {}", gvk.kind, name))?;

            info!(kind = %gvk.kind, name = %name, "Applied resource");
            applied.push(AppliedResource {
                kind: gvk.kind,
                name,
                namespace,
            });
        }

        Ok(applied)
    }

    /// Node readiness and control plane component status
    #[instrument(skip(self))]
    pub async fn cluster_health(&self) -> Result<ClusterHealth> {
        let api_server = self.health_check().await.unwrap_or(false);
        if !api_server {
            return Ok(health::summarize(false, &[], &[]));
        }

        let nodes = self.list_resources(ResourceKind::Nodes, None).await?;

        // ComponentStatus is deprecated and missing on newer clusters
        let statuses: Api<ComponentStatus> = Api::all(self.client.clone());
        let components = match statuses.list(&ListParams::default()).await {
            Ok(list) => list
                .items
                .into_iter()
                .filter_map(|c| serde_json::to_value(c).ok())
                .collect(),
            Err(e) => {
                debug!(error = %e, "Component status not available");
                Vec::new()
            }
        };

        Ok(health::summarize(api_server, &nodes, &components))
    }

    /// CPU, memory and pod usage per node
    #[instrument(skip(self))]
    pub async fn node_usage(&self) -> Result<Vec<NodeUsage>> {
        let metrics_api: Api<DynamicObject> =
            Api::all_with(self.client.clone(), &node_metrics_resource());
        let metrics_params = ListParams::default();

        let (nodes, pods, node_metrics) = tokio::join!(
            self.list_resources(ResourceKind::Nodes, None),
            self.list_resources(ResourceKind::Pods, None),
            metrics_api.list(&metrics_params),
        );

        let node_metrics: Vec<Value> = match node_metrics {
            Ok(list) => list
                .items
                .into_iter()
                .filter_map(|m| serde_json::to_value(m).ok())
                .collect(),
            Err(e) => {
                warn!(error = %e, "metrics.k8s.io not available, CPU and memory usage unknown");
                Vec::new()
            }
        };

        Ok(usage::compute_node_usage(
            &nodes?,
            &pods?,
            &usage::metrics_by_node(&node_metrics),
        ))
    }
}

/// Split a YAML stream into JSON documents, skipping empty ones
pub fn split_manifest(manifest: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(manifest) {
        let value = Value::deserialize(document).context("invalid YAML document")?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

fn document_gvk(doc: &Value) -> Result<GroupVersionKind> {
    let api_version = doc
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("document is missing apiVersion"))?;
    let kind = doc
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("document is missing kind"))?;

    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    };

    Ok(GroupVersionKind::gvk(group, version, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: dev
  cluster:
    server: https://127.0.0.1:6443
contexts:
- name: dev
  context:
    cluster: dev
    user: dev
current-context: dev
users:
- name: dev
  user:
    token: abc
"#;

    #[test]
    fn test_parse_kubeconfig() {
        assert!(parse_kubeconfig(KUBECONFIG).is_ok());
        assert!(parse_kubeconfig("apiVersion: v1\nkind: Config\n").is_err());
        assert!(parse_kubeconfig(": not yaml :").is_err());
    }

    #[test]
    fn test_split_manifest() {
        let manifest = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: a
---
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: b
"#;
        let docs = split_manifest(manifest).unwrap();
        assert_eq!(docs.len(), 2);

        let gvk = document_gvk(&docs[1]).unwrap();
        assert_eq!(gvk.group, "apps");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "Deployment");

        let core = document_gvk(&docs[0]).unwrap();
        assert_eq!(core.group, "");
    }

    #[test]
    fn test_api_resource_mapping() {
        let ar = api_resource(ResourceKind::HorizontalPodAutoscalers);
        assert_eq!(ar.group, "autoscaling");
        assert_eq!(ar.plural, "horizontalpodautoscalers");
        assert_eq!(api_resource(ResourceKind::Pods).api_version, "v1");
    }
}
