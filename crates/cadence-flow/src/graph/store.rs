use std::collections::HashMap;

use tracing::debug;

use cadence_core::error::{CadenceError, Result};
use cadence_core::traits::GraphEditor;
use cadence_core::types::{EdgeId, NodeId, PayloadPatch, Position, StepKind};

use super::edge::Edge;
use super::node::Node;
use super::snapshot::GraphSnapshot;

/// Vertical gap used when appending a step below the end of the chain.
const NODE_SPACING: f64 = 120.0;

/// Authoritative node and edge collections of one cadence.
///
/// Edges are kept in an adjacency map keyed by source id. `insert_after`
/// and `delete_node` keep the graph a single chain; `connect` may add
/// arbitrary edges, so readers must tolerate branches.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    outgoing: HashMap<NodeId, Vec<Edge>>,
    next_id: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing nodes and edges.
    ///
    /// Edges referencing unknown nodes are rejected with `NodeNotFound`.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut store = Self {
            nodes,
            ..Self::default()
        };
        for edge in edges {
            store.connect(&edge.source, &edge.target)?;
        }
        Ok(store)
    }

    /// The five-step "Welcome Sequence" sample chain.
    pub fn sample() -> Self {
        let nodes = vec![
            Node::email("n1", "Initial Email")
                .with_subtitle("Introduce yourself")
                .at(250.0, 40.0),
            Node::wait("n2", "Wait 3 days").at(270.0, 160.0),
            Node::email("n3", "Follow-up")
                .with_subtitle("Check in on previous email")
                .at(250.0, 270.0),
            Node::wait("n4", "Wait 5 days").at(270.0, 390.0),
            Node::email("n5", "Final Email")
                .with_subtitle("Last chance to connect")
                .at(250.0, 500.0),
        ];
        let edges = vec![
            Edge::new("n1", "n2"),
            Edge::new("n2", "n3"),
            Edge::new("n3", "n4"),
            Edge::new("n4", "n5"),
        ];
        let mut store = Self::new();
        store.nodes = nodes;
        for edge in edges {
            store.outgoing.entry(edge.source.clone()).or_default().push(edge);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| CadenceError::NodeNotFound(id.clone()))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Edges grouped by source, in node order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.nodes
            .iter()
            .filter_map(|n| self.outgoing.get(&n.id))
            .flatten()
    }

    /// First target reachable from `id` over one edge.
    pub fn successor(&self, id: &NodeId) -> Option<&NodeId> {
        self.outgoing
            .get(id)
            .and_then(|edges| edges.first())
            .map(|e| &e.target)
    }

    /// First node (in node order) with an edge into `id`.
    pub fn predecessor(&self, id: &NodeId) -> Option<&NodeId> {
        self.edges().find(|e| &e.target == id).map(|e| &e.source)
    }

    /// Insert a new step of `kind` after `source`, splicing it between
    /// `source` and its current successor if there is one.
    pub fn insert_after(&mut self, source: &NodeId, kind: StepKind) -> Result<NodeId> {
        let source_pos = self
            .node(source)
            .map(|n| n.position)
            .ok_or_else(|| CadenceError::NodeNotFound(source.clone()))?;
        let successor = self.successor(source).cloned();

        let position = successor
            .as_ref()
            .and_then(|t| self.node(t))
            .map(|t| source_pos.midpoint(&t.position))
            .unwrap_or_else(|| source_pos.offset(0.0, NODE_SPACING));

        let id = self.allocate_id();
        let mut node = Node::new(id.clone(), kind);
        node.position = position;
        self.nodes.push(node);

        match successor {
            Some(target) => {
                // Same slot as the old edge, so the first branch stays first.
                self.replace_edge(source, &target, Edge::new(source.clone(), id.clone()));
                self.push_edge(Edge::new(id.clone(), target.clone()));
                debug!(node_id = %id, %kind, source = %source, target = %target, "Spliced step into chain");
            }
            None => {
                self.push_edge(Edge::new(source.clone(), id.clone()));
                debug!(node_id = %id, %kind, source = %source, "Appended step to chain");
            }
        }

        Ok(id)
    }

    /// Remove a step and reconnect its predecessor to its successor.
    ///
    /// Unknown ids are ignored.
    pub fn delete_node(&mut self, id: &NodeId) {
        if !self.contains(id) {
            debug!(node_id = %id, "Delete of unknown step ignored");
            return;
        }

        let predecessor = self.predecessor(id).cloned();
        let successor = self.successor(id).cloned();

        self.nodes.retain(|n| &n.id != id);
        self.outgoing.remove(id);
        for edges in self.outgoing.values_mut() {
            edges.retain(|e| &e.target != id);
        }
        self.outgoing.retain(|_, edges| !edges.is_empty());

        if let (Some(a), Some(b)) = (predecessor, successor) {
            if a != b && self.find_edge(&a, &b).is_none() {
                self.push_edge(Edge::new(a.clone(), b.clone()));
            }
            debug!(node_id = %id, predecessor = %a, successor = %b, "Deleted step, chain reconnected");
        } else {
            debug!(node_id = %id, "Deleted end step");
        }
    }

    /// Merge `patch` into the payload of `id`.
    pub fn update_node_payload(&mut self, id: &NodeId, patch: PayloadPatch) -> Result<()> {
        let node = self.node_mut(id)?;
        if patch.is_empty() {
            return Ok(());
        }
        node.payload.merge(patch);
        debug!(node_id = %id, "Updated step payload");
        Ok(())
    }

    /// Move a step on the canvas.
    pub fn move_node(&mut self, id: &NodeId, position: Position) -> Result<()> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    /// Add an edge between two existing steps, or return the existing one.
    ///
    /// The one-in/one-out chain rule is not enforced here, so manual
    /// connections may create branches. Self-loops are not added.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Result<EdgeId> {
        for id in [source, target] {
            if !self.contains(id) {
                return Err(CadenceError::NodeNotFound(id.clone()));
            }
        }

        let edge_id = EdgeId::between(source, target);
        if source == target {
            debug!(node_id = %source, "Self-loop connection ignored");
            return Ok(edge_id);
        }
        if self.find_edge(source, target).is_none() {
            self.push_edge(Edge::new(source.clone(), target.clone()));
            debug!(edge_id = %edge_id, "Connected steps");
        }
        Ok(edge_id)
    }

    /// Remove an edge by id. Returns whether it existed.
    ///
    /// Ids containing '-' can make two edges share an id; only the first
    /// in edge order is removed.
    pub fn disconnect(&mut self, edge_id: &EdgeId) -> bool {
        let Some(source) = self
            .edges()
            .find(|e| &e.id == edge_id)
            .map(|e| e.source.clone())
        else {
            return false;
        };
        if let Some(edges) = self.outgoing.get_mut(&source) {
            if let Some(index) = edges.iter().position(|e| &e.id == edge_id) {
                edges.remove(index);
            }
            if edges.is_empty() {
                self.outgoing.remove(&source);
            }
        }
        debug!(edge_id = %edge_id, "Disconnected steps");
        true
    }

    /// Consistent owned copy for rendering and simulation.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges().cloned().collect(),
        }
    }

    fn find_edge(&self, source: &NodeId, target: &NodeId) -> Option<&Edge> {
        self.outgoing
            .get(source)
            .and_then(|edges| edges.iter().find(|e| &e.target == target))
    }

    fn push_edge(&mut self, edge: Edge) {
        self.outgoing.entry(edge.source.clone()).or_default().push(edge);
    }

    fn replace_edge(&mut self, source: &NodeId, target: &NodeId, edge: Edge) {
        let slot = self
            .outgoing
            .get_mut(source)
            .and_then(|edges| edges.iter_mut().find(|e| &e.target == target));
        match slot {
            Some(slot) => *slot = edge,
            None => self.push_edge(edge),
        }
    }

    /// Next free `n{counter}` id. The counter belongs to this store only.
    fn allocate_id(&mut self) -> NodeId {
        loop {
            self.next_id += 1;
            let id = NodeId(format!("n{}", self.next_id));
            if !self.contains(&id) {
                return id;
            }
        }
    }
}

impl GraphEditor for GraphStore {
    fn add_node_after(&mut self, source: &NodeId, kind: StepKind) -> Result<NodeId> {
        self.insert_after(source, kind)
    }

    fn delete_node(&mut self, id: &NodeId) {
        GraphStore::delete_node(self, id)
    }

    fn edit_payload(&mut self, id: &NodeId, patch: PayloadPatch) -> Result<()> {
        self.update_node_payload(id, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn chain_abc() -> GraphStore {
        GraphStore::from_parts(
            vec![
                Node::email("a", "A"),
                Node::wait("b", "B"),
                Node::email("c", "C"),
            ],
            vec![Edge::new("a", "b"), Edge::new("b", "c")],
        )
        .unwrap()
    }

    fn pairs(store: &GraphStore) -> Vec<(String, String)> {
        store
            .edges()
            .map(|e| (e.source.0.clone(), e.target.0.clone()))
            .collect()
    }

    #[test]
    fn test_insert_splices_between_source_and_successor() {
        let mut store = chain_abc();
        let n = store.insert_after(&id("a"), StepKind::Email).unwrap();

        assert!(store.find_edge(&id("a"), &n).is_some());
        assert!(store.find_edge(&n, &id("b")).is_some());
        assert!(store.find_edge(&id("a"), &id("b")).is_none());
        assert_eq!(store.edges().count(), 3);
        assert_eq!(store.node(&n).unwrap().payload.title, "New Email");
    }

    #[test]
    fn test_insert_after_tail_appends_single_edge() {
        let mut store = chain_abc();
        let n = store.insert_after(&id("c"), StepKind::Wait).unwrap();

        let touching: Vec<_> = store.edges().filter(|e| e.touches(&n)).collect();
        assert_eq!(touching.len(), 1);
        assert_eq!(touching[0].source, id("c"));
        assert_eq!(touching[0].target, n);
        assert_eq!(store.node(&n).unwrap().payload.title, "Wait 1 day");
    }

    #[test]
    fn test_insert_positions() {
        let mut store = GraphStore::from_parts(
            vec![
                Node::email("a", "A").at(0.0, 0.0),
                Node::email("b", "B").at(100.0, 200.0),
            ],
            vec![Edge::new("a", "b")],
        )
        .unwrap();

        let mid = store.insert_after(&id("a"), StepKind::Wait).unwrap();
        assert_eq!(store.node(&mid).unwrap().position, Position::new(50.0, 100.0));

        let tail = store.insert_after(&id("b"), StepKind::Email).unwrap();
        assert_eq!(
            store.node(&tail).unwrap().position,
            Position::new(100.0, 200.0 + NODE_SPACING)
        );
    }

    #[test]
    fn test_insert_after_unknown_source() {
        let mut store = chain_abc();
        let before = store.snapshot();
        let err = store.insert_after(&id("zz"), StepKind::Email).unwrap_err();
        assert!(matches!(err, CadenceError::NodeNotFound(ref n) if n == &id("zz")));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_delete_middle_reconnects() {
        let mut store = chain_abc();
        store.delete_node(&id("b"));

        assert!(!store.contains(&id("b")));
        assert!(store.edges().all(|e| !e.touches(&id("b"))));
        assert_eq!(pairs(&store), vec![("a".into(), "c".into())]);
    }

    #[test]
    fn test_delete_endpoints() {
        let mut store = chain_abc();
        store.delete_node(&id("a"));
        assert_eq!(pairs(&store), vec![("b".into(), "c".into())]);

        store.delete_node(&id("c"));
        assert!(pairs(&store).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_unknown_is_idempotent() {
        let mut store = chain_abc();
        let before = store.snapshot();
        store.delete_node(&id("missing"));
        store.delete_node(&id("b"));
        let after_first = store.snapshot();
        store.delete_node(&id("b"));
        assert_eq!(store.snapshot(), after_first);
        assert_ne!(before, after_first);
    }

    #[test]
    fn test_update_payload_merges_and_refreshes_subtitle() {
        let mut store = GraphStore::sample();
        store
            .update_node_payload(
                &id("n1"),
                PayloadPatch::default().to("lead@acme.io").subject("Hello there"),
            )
            .unwrap();

        let payload = &store.node(&id("n1")).unwrap().payload;
        assert_eq!(payload.title, "Initial Email");
        assert_eq!(payload.to.as_deref(), Some("lead@acme.io"));
        assert_eq!(payload.subtitle.as_deref(), Some("Hello there"));
        assert_eq!(payload.body, None);
    }

    #[test]
    fn test_update_payload_unknown_node() {
        let mut store = chain_abc();
        let err = store
            .update_node_payload(&id("nope"), PayloadPatch::default().title("x"))
            .unwrap_err();
        assert!(matches!(err, CadenceError::NodeNotFound(_)));
    }

    #[test]
    fn test_empty_patch_leaves_snapshot_identical() {
        let mut store = GraphStore::sample();
        let before = store.snapshot();
        store
            .update_node_payload(&id("n3"), PayloadPatch::default())
            .unwrap();
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_connect_allows_branches_and_is_idempotent() {
        let mut store = chain_abc();
        let e1 = store.connect(&id("a"), &id("c")).unwrap();
        let e2 = store.connect(&id("a"), &id("c")).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(store.edges().filter(|e| e.source == id("a")).count(), 2);

        assert!(store.connect(&id("a"), &id("ghost")).is_err());

        store.connect(&id("b"), &id("b")).unwrap();
        assert!(store.find_edge(&id("b"), &id("b")).is_none());
    }

    #[test]
    fn test_disconnect() {
        let mut store = chain_abc();
        let edge_id = EdgeId::between(&id("a"), &id("b"));
        assert!(store.disconnect(&edge_id));
        assert!(!store.disconnect(&edge_id));
        assert_eq!(pairs(&store), vec![("b".into(), "c".into())]);
    }

    #[test]
    fn test_move_node() {
        let mut store = chain_abc();
        store.move_node(&id("b"), Position::new(5.0, 6.0)).unwrap();
        assert_eq!(store.node(&id("b")).unwrap().position, Position::new(5.0, 6.0));
        assert!(store.move_node(&id("q"), Position::default()).is_err());
    }

    #[test]
    fn test_ids_do_not_collide_with_existing() {
        let mut store = GraphStore::sample();
        let n = store.insert_after(&id("n5"), StepKind::Email).unwrap();
        assert_eq!(n, id("n6"));

        let mut other = GraphStore::sample();
        let m = other.insert_after(&id("n1"), StepKind::Wait).unwrap();
        assert_eq!(m, id("n6"));
    }

    #[test]
    fn test_editor_trait_dispatch() {
        let mut store = chain_abc();
        let editor: &mut dyn GraphEditor = &mut store;
        let n = editor.add_node_after(&id("b"), StepKind::Email).unwrap();
        editor
            .edit_payload(&n, PayloadPatch::default().subject("Bump"))
            .unwrap();
        editor.delete_node(&id("b"));

        assert_eq!(store.predecessor(&n), Some(&id("a")));
        assert_eq!(store.successor(&n), Some(&id("c")));
        assert_eq!(
            store.node(&n).unwrap().payload.subtitle.as_deref(),
            Some("Bump")
        );
    }

    #[test]
    fn test_insert_after_branched_source_keeps_first_branch() {
        let mut store = GraphStore::from_parts(
            vec![Node::email("a", "A"), Node::wait("b", "B"), Node::email("c", "C")],
            vec![Edge::new("a", "b")],
        )
        .unwrap();
        store.connect(&id("a"), &id("c")).unwrap();

        let new = store.insert_after(&id("a"), StepKind::Email).unwrap();
        assert_eq!(store.successor(&id("a")), Some(&new));
        assert_eq!(store.successor(&new), Some(&id("b")));
        assert_eq!(
            crate::simulator::traversal_order(&store.snapshot()),
            vec![id("a"), new, id("b")]
        );
    }

    #[test]
    fn test_disconnect_ambiguous_id_removes_one_edge() {
        let mut store = GraphStore::from_parts(
            vec![
                Node::email("a-b", "AB"),
                Node::email("c", "C"),
                Node::email("a", "A"),
                Node::email("b-c", "BC"),
            ],
            vec![Edge::new("a-b", "c"), Edge::new("a", "b-c")],
        )
        .unwrap();

        let edge_id = EdgeId::between(&id("a"), &id("b-c"));
        assert!(store.disconnect(&edge_id));
        assert_eq!(store.edges().count(), 1);
        assert!(store.disconnect(&edge_id));
        assert_eq!(store.edges().count(), 0);
        assert!(!store.disconnect(&edge_id));
    }
}
