use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Resource collections the dashboard can list, graph and delete.
///
/// Names follow the Kubernetes plural resource names used in URLs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ResourceKind {
    Pods,
    Deployments,
    ReplicaSets,
    Services,
    Ingresses,
    ConfigMaps,
    Secrets,
    Nodes,
    Namespaces,
    PersistentVolumes,
    PersistentVolumeClaims,
    StorageClasses,
    Roles,
    RoleBindings,
    ClusterRoles,
    ClusterRoleBindings,
    HorizontalPodAutoscalers,
}

impl ResourceKind {
    /// Lowercase singular form, used as the graph node kind
    pub fn singular(&self) -> &'static str {
        match self {
            ResourceKind::Pods => "pod",
            ResourceKind::Deployments => "deployment",
            ResourceKind::ReplicaSets => "replicaset",
            ResourceKind::Services => "service",
            ResourceKind::Ingresses => "ingress",
            ResourceKind::ConfigMaps => "configmap",
            ResourceKind::Secrets => "secret",
            ResourceKind::Nodes => "node",
            ResourceKind::Namespaces => "namespace",
            ResourceKind::PersistentVolumes => "persistentvolume",
            ResourceKind::PersistentVolumeClaims => "persistentvolumeclaim",
            ResourceKind::StorageClasses => "storageclass",
            ResourceKind::Roles => "role",
            ResourceKind::RoleBindings => "rolebinding",
            ResourceKind::ClusterRoles => "clusterrole",
            ResourceKind::ClusterRoleBindings => "clusterrolebinding",
            ResourceKind::HorizontalPodAutoscalers => "horizontalpodautoscaler",
        }
    }

    /// Whether objects of this kind live inside a namespace
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            ResourceKind::Nodes
                | ResourceKind::Namespaces
                | ResourceKind::PersistentVolumes
                | ResourceKind::StorageClasses
                | ResourceKind::ClusterRoles
                | ResourceKind::ClusterRoleBindings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_plural_names() {
        assert_eq!("pods".parse::<ResourceKind>().unwrap(), ResourceKind::Pods);
        assert_eq!(
            "HorizontalPodAutoscalers".parse::<ResourceKind>().unwrap(),
            ResourceKind::HorizontalPodAutoscalers
        );
        assert_eq!(
            "rolebindings".parse::<ResourceKind>().unwrap(),
            ResourceKind::RoleBindings
        );
        assert!("widgets".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in ResourceKind::iter() {
            assert_eq!(kind.to_string().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_scope() {
        assert!(ResourceKind::Pods.is_namespaced());
        assert!(ResourceKind::RoleBindings.is_namespaced());
        assert!(!ResourceKind::Nodes.is_namespaced());
        assert!(!ResourceKind::StorageClasses.is_namespaced());
    }
}
