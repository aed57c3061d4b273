use serde::{Deserialize, Serialize};

use cadence_core::types::{EdgeId, NodeId};

/// A directed link from one step to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Edge id, derived from the endpoints.
    pub id: EdgeId,
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
}

impl Edge {
    /// Create an edge from `source` to `target`.
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: EdgeId::between(&source, &target),
            source,
            target,
        }
    }

    /// Whether this edge has `node` at either end.
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}
