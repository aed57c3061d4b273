use crate::error::Result;
use crate::types::{NodeId, PayloadPatch, StepKind};

/// Editing capability handed to a rendering layer.
///
/// Rendered nodes call back through this trait for their "add", "delete"
/// and "edit" actions. The core never holds references into rendering.
pub trait GraphEditor {
    /// Insert a new step of `kind` directly after `source`.
    fn add_node_after(&mut self, source: &NodeId, kind: StepKind) -> Result<NodeId>;

    /// Remove a step, reconnecting its neighbours. Missing ids are ignored.
    fn delete_node(&mut self, id: &NodeId);

    /// Merge `patch` into the payload of `id`.
    fn edit_payload(&mut self, id: &NodeId, patch: PayloadPatch) -> Result<()>;
}
