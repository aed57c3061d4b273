pub mod graph;
pub mod library;
pub mod simulator;
pub mod view;

pub use graph::{Edge, GraphSnapshot, GraphStore, Node};
pub use library::{Cadence, CadenceLibrary};
pub use simulator::{RunHandle, RunOutcome, Simulator};
pub use view::{node_views, NodeView};
