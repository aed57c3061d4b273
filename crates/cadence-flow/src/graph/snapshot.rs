use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use cadence_core::types::NodeId;

use super::edge::Edge;
use super::node::Node;

/// Owned, point-in-time copy of a cadence graph.
///
/// Nodes are in insertion order; edges are grouped by source in node order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Source → target map. With manual branches the first edge of a
    /// source wins.
    pub fn edge_map(&self) -> HashMap<&NodeId, &NodeId> {
        let mut map = HashMap::new();
        for edge in &self.edges {
            map.entry(&edge.source).or_insert(&edge.target);
        }
        map
    }
}
