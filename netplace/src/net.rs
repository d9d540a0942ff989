//! The gate network: an arena of nodes and wires with explicit membership.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexSet;
use itertools::Itertools;
use petgraph::prelude::*;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;

use crate::gate::Gate;

/// A node identity, issued by an [`IdAllocator`] and never reused within one net.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The monotonic source of node identities.
///
/// One allocator must be shared by everything that creates nodes for a given net (the loader and the technology
/// mapper), since identities double as equality and hash keys.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    /// Start issuing identities at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Resume allocation after identities `0..next` have been handed out elsewhere.
    #[must_use]
    pub const fn starting_at(next: u32) -> Self {
        Self { next }
    }

    /// Issue the next identity.
    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// The identity the next call to [`fresh`](Self::fresh) will return.
    #[must_use]
    pub const fn peek(&self) -> u32 {
        self.next
    }
}

/// What a node is.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum NodeKind {
    /// The network's primary inputs, one per port.
    Input { arity: u32 },
    /// The network's primary outputs, one per port.
    Output { arity: u32 },
    /// A constant.
    Value(bool),
    /// A logic gate.
    Component(Gate),
}

/// A node in the arena.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
}

impl Node {
    /// The node's identity.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// The node's variant.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The gate kind, for `Component` nodes.
    #[must_use]
    pub const fn gate(&self) -> Option<Gate> {
        match self.kind {
            NodeKind::Component(gate) => Some(gate),
            _ => None,
        }
    }

    /// Returns true if a wire entering this node on `port` makes its source a dependency.
    #[must_use]
    pub const fn reads_port(&self, port: u32) -> bool {
        match self.kind {
            NodeKind::Input { .. } | NodeKind::Value(_) => false,
            NodeKind::Output { .. } => true,
            NodeKind::Component(gate) => gate.is_input_port(port),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NodeKind::Input { arity } => write!(f, "{} = input({})", self.id, arity),
            NodeKind::Output { arity } => write!(f, "{} = output({})", self.id, arity),
            NodeKind::Value(value) => write!(f, "{} = value({})", self.id, value),
            NodeKind::Component(gate) => write!(f, "{} = {}", self.id, gate),
        }
    }
}

/// A directed connection from a driver port to a consumer port.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Wire {
    /// Port on the driver.
    pub from_port: u32,
    /// Port on the consumer.
    pub to_port: u32,
    /// Bits carried.
    pub width: u32,
}

/// A gate network rooted at one input node and one output node.
///
/// Nodes and wires live in an arena; the net's membership is the set of nodes reachable from whatever was added to
/// it, captured at insertion time.
#[derive(Debug)]
pub struct Net {
    graph: StableGraph<Node, Wire>,
    ids: HashMap<NodeId, NodeIndex>,
    nodes: IndexSet<NodeIndex>,
    wires: IndexSet<EdgeIndex>,
    input: NodeIndex,
    output: NodeIndex,
}

impl Net {
    /// Create a net with fresh root input and output nodes.
    pub fn new(input_arity: u32, output_arity: u32, ids: &mut IdAllocator) -> Self {
        let mut net = Self {
            graph: StableGraph::default(),
            ids: HashMap::new(),
            nodes: IndexSet::new(),
            wires: IndexSet::new(),
            input: NodeIndex::end(),
            output: NodeIndex::end(),
        };

        net.input = net.create_node(NodeKind::Input { arity: input_arity }, ids);
        net.output = net.create_node(NodeKind::Output { arity: output_arity }, ids);
        net.nodes.insert(net.input);
        net.nodes.insert(net.output);
        net
    }

    /// Create a node in the arena. It becomes a member only once it is added with [`add_node_rec`](Self::add_node_rec).
    pub fn create_node(&mut self, kind: NodeKind, ids: &mut IdAllocator) -> NodeIndex {
        let id = ids.fresh();
        let node = self.graph.add_node(Node { id, kind });
        self.ids.insert(id, node);
        node
    }

    /// Create a gate node in the arena.
    pub fn create_gate(&mut self, gate: Gate, ids: &mut IdAllocator) -> NodeIndex {
        self.create_node(NodeKind::Component(gate), ids)
    }

    /// Connect `from[from_port]` to `to[to_port]` with a one-bit wire.
    pub fn connect(&mut self, from: NodeIndex, from_port: u32, to: NodeIndex, to_port: u32) -> EdgeIndex {
        self.connect_wide(from, from_port, to, to_port, 1)
    }

    /// Connect `from[from_port]` to `to[to_port]` with a wire `width` bits wide.
    pub fn connect_wide(&mut self, from: NodeIndex, from_port: u32, to: NodeIndex, to_port: u32, width: u32) -> EdgeIndex {
        let edge = self.graph.add_edge(from, to, Wire { from_port, to_port, width });
        if self.nodes.contains(&from) || self.nodes.contains(&to) {
            self.wires.insert(edge);
        }
        edge
    }

    /// Add `node` and everything transitively connected to it.
    pub fn add_node_rec(&mut self, node: NodeIndex) {
        let mut visit_list = vec![node];
        while let Some(node) = visit_list.pop() {
            if !self.nodes.insert(node) {
                continue;
            }

            for edge in self.graph.edges_directed(node, Outgoing).chain(self.graph.edges_directed(node, Incoming)) {
                self.wires.insert(edge.id());
                visit_list.push(edge.source());
                visit_list.push(edge.target());
            }
        }
    }

    /// Destroy a wire, detaching it from both of its endpoints at once.
    ///
    /// Returns `None` if the wire was already dead.
    pub fn kill_wire(&mut self, edge: EdgeIndex) -> Option<Wire> {
        self.wires.shift_remove(&edge);
        self.graph.remove_edge(edge)
    }

    /// Remove a node from the net and kill every wire incident to it.
    pub fn kill_node(&mut self, node: NodeIndex) {
        let incident = self.incident_wires(node);
        for edge in incident {
            self.kill_wire(edge);
        }

        self.nodes.shift_remove(&node);
        if let Some(dead) = self.graph.remove_node(node) {
            self.ids.remove(&dead.id);
        }
    }

    /// Kill the current root input and install `node` in its place.
    pub fn replace_input(&mut self, node: NodeIndex) {
        if node == self.input {
            return;
        }
        self.kill_node(self.input);
        self.input = node;
        self.add_node_rec(node);
    }

    /// Kill the current root output and install `node` in its place.
    pub fn replace_output(&mut self, node: NodeIndex) {
        if node == self.output {
            return;
        }
        self.kill_node(self.output);
        self.output = node;
        self.add_node_rec(node);
    }

    /// The root input node.
    #[must_use]
    pub const fn input(&self) -> NodeIndex {
        self.input
    }

    /// The root output node.
    #[must_use]
    pub const fn output(&self) -> NodeIndex {
        self.output
    }

    /// The underlying arena, including nodes that are not members.
    #[must_use]
    pub fn graph(&self) -> &StableGraph<Node, Wire> {
        &self.graph
    }

    /// The member nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes.iter().copied()
    }

    /// The live wires incident to member nodes.
    pub fn wires(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.wires.iter().copied()
    }

    /// Number of member nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of member wires.
    #[must_use]
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Returns true if `node` is a member of the net.
    #[must_use]
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.nodes.contains(&node)
    }

    /// The node behind a handle. Panics on a dead handle.
    #[must_use]
    pub fn node(&self, node: NodeIndex) -> &Node {
        &self.graph[node]
    }

    /// Look up a live node by identity.
    #[must_use]
    pub fn node_by_id(&self, id: NodeId) -> Option<NodeIndex> {
        self.ids.get(&id).copied()
    }

    /// Returns `(driver, consumer, wire)` for a live wire.
    #[must_use]
    pub fn wire(&self, edge: EdgeIndex) -> Option<(NodeIndex, NodeIndex, &Wire)> {
        let (from, to) = self.graph.edge_endpoints(edge)?;
        Some((from, to, &self.graph[edge]))
    }

    fn incident_wires(&self, node: NodeIndex) -> Vec<EdgeIndex> {
        self.graph
            .edges_directed(node, Outgoing)
            .chain(self.graph.edges_directed(node, Incoming))
            .map(|edge| edge.id())
            .unique()
            .collect()
    }

    // petgraph walks a node's adjacency newest-first; callers expect connection order.
    fn wires_directed(&self, node: NodeIndex, direction: Direction) -> Vec<EdgeIndex> {
        let mut edges = self.graph.edges_directed(node, direction).map(|edge| edge.id()).collect::<Vec<_>>();
        edges.reverse();
        edges
    }

    /// Every wire driving `node` on `port`, in connection order.
    #[must_use]
    pub fn input_drivers(&self, node: NodeIndex, port: u32) -> Vec<EdgeIndex> {
        self.wires_directed(node, Incoming)
            .into_iter()
            .filter(|edge| self.graph[*edge].to_port == port)
            .collect()
    }

    /// The first wire driving `node` on `port`.
    #[must_use]
    pub fn input_driver(&self, node: NodeIndex, port: u32) -> Option<EdgeIndex> {
        self.input_drivers(node, port).into_iter().next()
    }

    /// Every wire leaving `node` from `port`, in connection order.
    #[must_use]
    pub fn output_wires(&self, node: NodeIndex, port: u32) -> Vec<EdgeIndex> {
        self.wires_directed(node, Outgoing)
            .into_iter()
            .filter(|edge| self.graph[*edge].from_port == port)
            .collect()
    }

    /// The nodes `node` reads from, ordered by port.
    #[must_use]
    pub fn dependencies(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let consumer = &self.graph[node];
        self.wires_directed(node, Incoming)
            .into_iter()
            .filter_map(|edge| {
                let wire = self.graph[edge];
                let (from, _) = self.graph.edge_endpoints(edge)?;
                consumer.reads_port(wire.to_port).then(|| (wire.to_port, from))
            })
            .sorted_by_key(|(port, _)| *port)
            .map(|(_, from)| from)
            .collect()
    }

    /// The nodes that read from `node`, in connection order.
    #[must_use]
    pub fn consumers(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.wires_directed(node, Outgoing)
            .into_iter()
            .filter_map(|edge| {
                let (_, to) = self.graph.edge_endpoints(edge)?;
                self.graph[to].reads_port(self.graph[edge].to_port).then(|| to)
            })
            .collect()
    }

    /// Returns true if a live wire runs between `a` and `b` in either direction.
    #[must_use]
    pub fn adjacent(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.graph.find_edge(a, b).is_some() || self.graph.find_edge(b, a).is_some()
    }
}

impl fmt::Display for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nodes:")?;
        for node in self.nodes() {
            let drivers = self
                .wires_directed(node, Incoming)
                .into_iter()
                .filter_map(|edge| {
                    let (from, _) = self.graph.edge_endpoints(edge)?;
                    Some(format!("{}[{}]", self.graph[from].id, self.graph[edge].from_port))
                })
                .join(", ");
            writeln!(f, "  {}({})", self.graph[node], drivers)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nand_net() -> (Net, IdAllocator, NodeIndex) {
        let mut ids = IdAllocator::new();
        let mut net = Net::new(2, 1, &mut ids);
        let nand = net.create_gate(Gate::Nand, &mut ids);
        net.connect(net.input(), 0, nand, 0);
        net.connect(net.input(), 1, nand, 1);
        net.connect(nand, 2, net.output(), 0);
        net.add_node_rec(nand);
        (net, ids, nand)
    }

    #[test]
    fn ids_are_monotonic() {
        let mut ids = IdAllocator::starting_at(7);
        assert_eq!(ids.fresh(), NodeId(7));
        assert_eq!(ids.fresh(), NodeId(8));
        assert_eq!(ids.peek(), 9);
    }

    #[test]
    fn add_node_rec_collects_wires() {
        let (net, _, nand) = nand_net();

        assert_eq!(net.node_count(), 3);
        assert_eq!(net.wire_count(), 3);
        assert!(net.contains(nand));
        assert_eq!(net.dependencies(nand), vec![net.input(), net.input()]);
        assert_eq!(net.consumers(nand), vec![net.output()]);
        assert_eq!(net.dependencies(net.output()), vec![nand]);
        assert!(net.dependencies(net.input()).is_empty());
    }

    #[test]
    fn add_node_rec_follows_cycles() {
        let mut ids = IdAllocator::new();
        let mut net = Net::new(1, 1, &mut ids);
        let a = net.create_gate(Gate::Not, &mut ids);
        let b = net.create_gate(Gate::Not, &mut ids);
        let c = net.create_gate(Gate::Not, &mut ids);
        net.connect(a, 1, b, 0);
        net.connect(b, 1, c, 0);
        net.connect(c, 1, a, 0);
        net.connect(c, 1, net.output(), 0);
        net.add_node_rec(a);

        assert_eq!(net.node_count(), 5);
        assert_eq!(net.wire_count(), 4);
    }

    #[test]
    fn kill_node_detaches_both_ends() {
        let (mut net, _, nand) = nand_net();
        let nand_id = net.node(nand).id();

        net.kill_node(nand);

        assert!(!net.contains(nand));
        assert_eq!(net.node_by_id(nand_id), None);
        assert_eq!(net.wire_count(), 0);
        assert!(net.graph().edges_directed(net.input(), Outgoing).next().is_none());
        assert!(net.graph().edges_directed(net.output(), Incoming).next().is_none());
    }

    #[test]
    fn kill_wire_twice_is_noop() {
        let (mut net, _, nand) = nand_net();
        let edge = net.input_driver(nand, 0).expect("port 0 to be driven");

        assert!(net.kill_wire(edge).is_some());
        assert!(net.kill_wire(edge).is_none());
        assert_eq!(net.input_driver(nand, 0), None);
        assert_eq!(net.wire_count(), 2);
    }

    #[test]
    fn input_driver_returns_first_connected() {
        let (mut net, mut ids, nand) = nand_net();
        let zero = net.create_node(NodeKind::Value(false), &mut ids);
        let first = net.input_driver(nand, 0).expect("port 0 to be driven");
        net.connect(zero, 0, nand, 0);

        assert_eq!(net.input_drivers(nand, 0).len(), 2);
        assert_eq!(net.input_driver(nand, 0), Some(first));
    }

    #[test]
    fn replace_input_kills_old_root() {
        let (mut net, mut ids, nand) = nand_net();
        let old = net.input();
        let new = net.create_node(NodeKind::Input { arity: 2 }, &mut ids);
        net.connect(new, 0, nand, 0);

        net.replace_input(new);

        assert_eq!(net.input(), new);
        assert!(!net.contains(old));
        assert!(net.contains(new));
        assert_eq!(net.dependencies(nand), vec![new]);
        assert_eq!(net.wire_count(), 2);
    }

    #[test]
    fn display_lists_drivers() {
        let (net, _, _) = nand_net();
        let text = net.to_string();

        assert!(text.contains("2 = NAND(0[0], 0[1])"), "{}", text);
        assert!(text.contains("1 = output(1)(2[2])"), "{}", text);
    }
}
