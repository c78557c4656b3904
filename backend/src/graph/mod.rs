//! Resource relationship graph
//!
//! Turns fetched resource lists into node/edge graphs and lays them out
//! with a force-directed simulation.

pub mod builder;
pub mod layout;
pub mod selector;
pub mod types;

pub use builder::{build_cluster_overview, build_graph, GraphBuilder};
pub use layout::{layout_graph, ForceLayout, LayoutConfig, NodePosition, Viewport};
pub use selector::LabelSelector;
pub use types::{GraphEdge, GraphNode, Relation, ResourceGraph};
