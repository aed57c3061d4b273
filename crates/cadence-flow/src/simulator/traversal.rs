use std::collections::HashSet;

use tracing::debug;

use cadence_core::types::NodeId;

use crate::graph::GraphSnapshot;

/// Find the node a run starts from.
///
/// The first node (in snapshot order) that is an edge source but never an
/// edge target. Without such a node, or without edges, the first node.
pub fn find_start(snapshot: &GraphSnapshot) -> Option<&NodeId> {
    let targets: HashSet<&NodeId> = snapshot.edges.iter().map(|e| &e.target).collect();
    let sources: HashSet<&NodeId> = snapshot.edges.iter().map(|e| &e.source).collect();

    snapshot
        .nodes
        .iter()
        .map(|n| &n.id)
        .find(|id| sources.contains(id) && !targets.contains(id))
        .or_else(|| {
            debug!("No unique chain head, falling back to first node");
            snapshot.nodes.first().map(|n| &n.id)
        })
}

/// Compute the linear order a run visits nodes in.
///
/// Follows the first outgoing edge of each node from the start node.
/// Nodes off that path are left out; a revisited node ends the walk.
pub fn traversal_order(snapshot: &GraphSnapshot) -> Vec<NodeId> {
    let Some(start) = find_start(snapshot) else {
        return Vec::new();
    };
    let edge_map = snapshot.edge_map();

    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(start);

    while let Some(id) = current {
        if !visited.insert(id) {
            debug!(node_id = %id, "Cycle detected, ending traversal");
            break;
        }
        order.push(id.clone());
        current = edge_map.get(id).copied();
    }

    let skipped = snapshot.nodes.len().saturating_sub(order.len());
    if skipped > 0 {
        debug!(skipped, "Nodes unreachable from start excluded from run");
    }
    order
}
