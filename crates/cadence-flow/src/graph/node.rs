use serde::{Deserialize, Serialize};

use cadence_core::types::{NodeId, NodePayload, Position, StepKind};

/// A step in a cadence graph.
///
/// Execution status is not stored here; it lives in the simulator's
/// status map and is joined in at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the owning store.
    pub id: NodeId,
    /// Email or wait.
    pub kind: StepKind,
    /// Display and email content.
    pub payload: NodePayload,
    /// Layout position.
    #[serde(default)]
    pub position: Position,
}

impl Node {
    /// Create a node with the default payload for its kind.
    pub fn new(id: impl Into<NodeId>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
            payload: NodePayload::titled(kind.default_title()),
            position: Position::default(),
        }
    }

    /// Create an email step.
    pub fn email(id: &str, title: &str) -> Self {
        Self::new(NodeId::from(id), StepKind::Email).with_title(title)
    }

    /// Create a wait step.
    pub fn wait(id: &str, title: &str) -> Self {
        Self::new(NodeId::from(id), StepKind::Wait).with_title(title)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.payload.title = title.into();
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.payload.subtitle = Some(subtitle.into());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }
}
