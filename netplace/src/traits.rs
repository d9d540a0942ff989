//! Seams between the graph model and the algorithms that walk it.

use std::hash::Hash;

use petgraph::prelude::*;

use crate::net::{Net, NodeId};

/// A dependency graph to be scheduled.
pub trait Graph {
    /// A graph node.
    type Node: Copy + Eq + Hash;

    /// Returns every node of the graph, in a stable order.
    fn node_list(&self) -> Vec<Self::Node>;
    /// Returns the nodes `node` depends on (its fan-in).
    fn node_inputs(&self, node: Self::Node) -> Vec<Self::Node>;
    /// Returns a printable identity for diagnostics.
    fn node_id(&self, node: Self::Node) -> NodeId;
}

impl Graph for Net {
    type Node = NodeIndex;

    fn node_list(&self) -> Vec<NodeIndex> {
        self.nodes().collect()
    }

    fn node_inputs(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.dependencies(node)
    }

    fn node_id(&self, node: NodeIndex) -> NodeId {
        self.node(node).id()
    }
}
