use std::collections::HashMap;

use serde::Serialize;

use cadence_core::types::{NodeId, NodePayload, NodeStatus, Position, StepKind};

use crate::graph::GraphSnapshot;

/// Everything a renderer needs to draw one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub kind: StepKind,
    pub payload: NodePayload,
    pub position: Position,
    pub status: NodeStatus,
}

/// Join a snapshot with the simulator's status map.
pub fn node_views(snapshot: &GraphSnapshot, statuses: &HashMap<NodeId, NodeStatus>) -> Vec<NodeView> {
    snapshot
        .nodes
        .iter()
        .map(|node| NodeView {
            id: node.id.clone(),
            kind: node.kind,
            payload: node.payload.clone(),
            position: node.position,
            status: statuses.get(&node.id).copied().unwrap_or_default(),
        })
        .collect()
}
