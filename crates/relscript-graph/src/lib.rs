//! RelScript graph data model.
//!
//! Every piece of program state is a named [`Node`] owned by a [`Graph`]
//! arena. Nodes carry properties, inheritance (IS) edges, containment
//! (CONTAINS) edges, abilities, and typed relation instances. The graph
//! maintains two derived indexes — a type index and a relation
//! reverse-index — in lockstep with the forward structures.

mod graph;
mod node;
mod value;

pub use graph::Graph;
pub use node::{Node, NodeId, RelationInstance};
pub use value::Value;
