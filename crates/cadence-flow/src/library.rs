use tracing::info;

use cadence_core::error::{CadenceError, Result};
use cadence_core::types::StepKind;

use crate::graph::{Edge, GraphStore, Node};

/// A named cadence owning its own graph.
#[derive(Debug, Clone)]
pub struct Cadence {
    pub id: String,
    pub name: String,
    pub graph: GraphStore,
}

impl Cadence {
    pub fn new(id: impl Into<String>, name: impl Into<String>, graph: GraphStore) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            graph,
        }
    }

    /// Number of steps in the cadence.
    pub fn steps(&self) -> usize {
        self.graph.len()
    }

    fn matches(&self, key: &str) -> bool {
        self.id == key || self.name.eq_ignore_ascii_case(key)
    }
}

/// The cadence list with an active selection.
#[derive(Debug, Clone)]
pub struct CadenceLibrary {
    cadences: Vec<Cadence>,
    active: usize,
    next_id: u64,
}

impl CadenceLibrary {
    /// Library with a single fresh cadence.
    pub fn new() -> Self {
        let mut library = Self {
            cadences: Vec::new(),
            active: 0,
            next_id: 0,
        };
        library.create("Untitled Cadence");
        library
    }

    /// Library seeded with the sample cadences.
    pub fn with_samples() -> Self {
        let cadences = vec![
            Cadence::new("1", "Welcome Sequence", GraphStore::sample()),
            Cadence::new("2", "Cold Outreach", alternating_chain(5)),
            Cadence::new("3", "Follow-up Series", alternating_chain(4)),
            Cadence::new("4", "Re-engagement", alternating_chain(2)),
        ];
        Self {
            next_id: cadences.len() as u64,
            cadences,
            active: 0,
        }
    }

    pub fn list(&self) -> &[Cadence] {
        &self.cadences
    }

    pub fn active(&self) -> &Cadence {
        &self.cadences[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Cadence {
        &mut self.cadences[self.active]
    }

    /// Find a cadence by id or case-insensitive name.
    pub fn find(&self, key: &str) -> Option<&Cadence> {
        self.cadences.iter().find(|c| c.matches(key))
    }

    /// Make the cadence named by `key` active.
    pub fn select(&mut self, key: &str) -> Result<&Cadence> {
        let index = self
            .cadences
            .iter()
            .position(|c| c.matches(key))
            .ok_or_else(|| CadenceError::CadenceNotFound(key.to_string()))?;
        self.active = index;
        info!(cadence = %self.cadences[index].name, "Active cadence changed");
        Ok(&self.cadences[index])
    }

    /// Add a cadence holding a single email step and make it active.
    pub fn create(&mut self, name: impl Into<String>) -> &Cadence {
        self.next_id += 1;
        let graph = GraphStore::from_parts(
            vec![Node::email("n1", "Initial Email").at(250.0, 40.0)],
            Vec::new(),
        )
        .unwrap_or_default();
        self.cadences
            .push(Cadence::new(self.next_id.to_string(), name, graph));
        self.active = self.cadences.len() - 1;
        info!(cadence = %self.cadences[self.active].name, "Cadence created");
        &self.cadences[self.active]
    }
}

impl Default for CadenceLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Email, wait, email, ... chain of `steps` nodes laid out top to bottom.
fn alternating_chain(steps: usize) -> GraphStore {
    let mut nodes = Vec::with_capacity(steps);
    let mut edges = Vec::with_capacity(steps.saturating_sub(1));
    let mut emails = 0;

    for i in 0..steps {
        let id = format!("n{}", i + 1);
        let y = 40.0 + 115.0 * i as f64;
        let node = if i % 2 == 0 {
            emails += 1;
            let title = if emails == 1 {
                "Initial Email".to_string()
            } else {
                format!("Email {emails}")
            };
            Node::email(&id, &title).at(250.0, y)
        } else {
            Node::new(id.as_str(), StepKind::Wait)
                .with_title("Wait 2 days")
                .at(270.0, y)
        };
        if i > 0 {
            edges.push(Edge::new(format!("n{i}"), id.clone()));
        }
        nodes.push(node);
    }

    GraphStore::from_parts(nodes, edges).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::traversal_order;

    #[test]
    fn test_samples() {
        let library = CadenceLibrary::with_samples();
        let names: Vec<_> = library.list().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Welcome Sequence", "Cold Outreach", "Follow-up Series", "Re-engagement"]
        );
        assert_eq!(library.active().name, "Welcome Sequence");
        assert_eq!(library.active().steps(), 5);
        assert_eq!(library.find("cold outreach").unwrap().steps(), 5);
        assert_eq!(library.find("4").unwrap().steps(), 2);
    }

    #[test]
    fn test_alternating_chain_is_linear() {
        let graph = alternating_chain(4);
        let order = traversal_order(&graph.snapshot());
        assert_eq!(order.len(), 4);
        let kinds: Vec<_> = order
            .iter()
            .map(|id| graph.node(id).unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![StepKind::Email, StepKind::Wait, StepKind::Email, StepKind::Wait]
        );
    }

    #[test]
    fn test_select_and_create() {
        let mut library = CadenceLibrary::with_samples();
        assert_eq!(library.select("Follow-up Series").unwrap().id, "3");
        assert_eq!(library.active().name, "Follow-up Series");
        assert!(matches!(
            library.select("nope"),
            Err(CadenceError::CadenceNotFound(_))
        ));
        assert_eq!(library.active().name, "Follow-up Series");

        let created = library.create("Q3 Launch");
        assert_eq!(created.id, "5");
        assert_eq!(created.steps(), 1);
        assert_eq!(library.active().name, "Q3 Launch");
    }

    #[test]
    fn test_cadences_allocate_ids_independently() {
        let mut library = CadenceLibrary::with_samples();
        let tail = cadence_core::types::NodeId::from("n2");
        let a = library
            .active_mut()
            .graph
            .insert_after(&tail, StepKind::Email)
            .unwrap();

        library.select("Re-engagement").unwrap();
        let b = library
            .active_mut()
            .graph
            .insert_after(&tail, StepKind::Email)
            .unwrap();

        assert_eq!(a.as_str(), "n6");
        assert_eq!(b.as_str(), "n3");
    }
}
