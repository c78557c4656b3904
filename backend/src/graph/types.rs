//! Graph data structures for resource relationships

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

/// A node in the relationship graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GraphNode {
    /// Unique within one build
    pub id: String,
    pub name: String,
    /// Lowercase singular kind (`pod`, `container`, `replicaset`, ...)
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Relationship carried by an edge
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Relation {
    /// Pod contains a container
    Contains,
    /// Owner reference, owner to owned
    Owns,
    /// Deployment to replicaset, replicaset to pod
    Manages,
    /// Service to its endpoints
    Exposes,
    /// Endpoints (or service) to a selected pod
    Selects,
    /// Pod scheduled on a cluster node
    RunsOn,
}

impl Relation {
    /// Ownership-style relations are drawn dashed by the dashboard
    pub fn is_dashed(&self) -> bool {
        matches!(self, Relation::Owns | Relation::Manages)
    }
}

/// A directed edge between two node ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relation: Relation,
    /// Drawn dashed (ownership-style relations)
    #[serde(default)]
    pub dashed: bool,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, relation: Relation) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation,
            dashed: relation.is_dashed(),
        }
    }
}

/// Nodes and edges produced by one build pass
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ResourceGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from parts (e.g. a graph posted by a client).
    /// Node ids must be unique.
    pub fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Result<Self, String> {
        let mut graph = Self::new();
        for node in nodes {
            let id = node.id.clone();
            if !graph.add_node_if_absent(node) {
                return Err(format!("Duplicate node ID: {}", id));
            }
        }
        graph.edges = edges;
        Ok(graph)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Add a node unless one with the same id already exists.
    /// Returns true when the node was inserted.
    pub fn add_node_if_absent(&mut self, node: GraphNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Insert a node, replacing any existing node with the same id in place
    pub fn upsert_node(&mut self, node: GraphNode) {
        match self.index.get(&node.id) {
            Some(&i) => self.nodes[i] = node,
            None => {
                self.index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    pub fn add_edge(&mut self, source: &str, target: &str, relation: Relation) {
        self.edges.push(GraphEdge::new(source, target, relation));
    }

    pub fn edges_with(&self, relation: Relation) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.relation == relation)
    }

    pub fn nodes_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a GraphNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Check node id uniqueness and edge referential integrity
    pub fn validate(&self) -> Result<(), String> {
        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(format!("Duplicate node ID: {}", node.id));
            }
        }

        for edge in &self.edges {
            if !ids.contains(edge.source.as_str()) {
                return Err(format!("Edge source not found: {}", edge.source));
            }
            if !ids.contains(edge.target.as_str()) {
                return Err(format!("Edge target not found: {}", edge.target));
            }
        }

        Ok(())
    }
}
