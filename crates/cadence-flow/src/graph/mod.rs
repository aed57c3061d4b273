//! Cadence graph: the authoritative chain of email and wait steps.
//!
//! A cadence is a directed graph of `Node`s connected by `Edge`s that is
//! kept as one linear chain by the `GraphStore` mutations. The simulator
//! and the rendering layer only ever see owned `GraphSnapshot`s.

pub mod edge;
pub mod node;
pub mod snapshot;
pub mod store;

pub use edge::Edge;
pub use node::Node;
pub use snapshot::GraphSnapshot;
pub use store::GraphStore;
