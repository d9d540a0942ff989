//! Technology mapping onto a supported gate set.

use std::collections::HashMap;

use itertools::Itertools;
use petgraph::prelude::*;
use petgraph::visit::EdgeRef;
use tracing::{debug, info};

use crate::error::ExpandError;
use crate::gate::Gate;
use crate::net::{IdAllocator, Net};

/// The kinds a gate's rewrite rule builds its replacement from.
const fn rule_parts(gate: Gate) -> Option<&'static [Gate]> {
    match gate {
        Gate::Not => Some(&[Gate::Nand]),
        Gate::And => Some(&[Gate::Nand, Gate::Not]),
        Gate::Nand => Some(&[Gate::And, Gate::Not]),
        Gate::Nor => Some(&[Gate::Or, Gate::Not]),
        Gate::Or => Some(&[Gate::Not, Gate::Nand]),
        Gate::Xor => Some(&[Gate::Nand, Gate::Or, Gate::And]),
        Gate::HalfAdd => Some(&[Gate::Xor, Gate::And]),
        Gate::FullAdd => Some(&[Gate::HalfAdd, Gate::Or]),
        Gate::Xnor | Gate::Split8 | Gate::Make8 => None,
    }
}

/// One end of a wire.
#[derive(Clone, Copy, Debug)]
struct Pin {
    node: NodeIndex,
    port: u32,
    width: u32,
}

impl Pin {
    const fn output(node: NodeIndex, gate: Gate, index: u32) -> Self {
        Self { node, port: gate.output_port(index), width: 1 }
    }
}

/// Collects the nodes of one replacement subgraph.
struct Builder<'a> {
    net: &'a mut Net,
    ids: &'a mut IdAllocator,
    replacing: NodeIndex,
    added: Vec<NodeIndex>,
    driven: Vec<Option<Pin>>,
}

impl Builder<'_> {
    fn gate(&mut self, gate: Gate, inputs: &[Pin]) -> NodeIndex {
        let node = self.net.create_gate(gate, self.ids);
        for (port, pin) in inputs.iter().enumerate() {
            self.net.connect_wide(pin.node, pin.port, node, port as u32, pin.width);
        }
        self.added.push(node);
        node
    }

    fn drive(&mut self, node: NodeIndex, gate: Gate, index: u32, sinks: &[Pin]) {
        self.driven[index as usize] = Some(Pin::output(node, gate, index));
        let replacing = self.replacing;
        for sink in sinks.iter().filter(|sink| sink.node != replacing) {
            self.net.connect_wide(node, gate.output_port(index), sink.node, sink.port, sink.width);
        }
    }
}

/// Rewrites gates outside a supported set into networks of supported gates.
///
/// Each gate kind gets a rank: zero if supported, otherwise one more than the highest rank its rule builds from.
/// Kinds whose rules never bottom out in the supported set (including NOT and NAND when both are missing, as their
/// rules refer to each other) have no rank and cannot be expanded. Because a rewrite only ever introduces kinds of
/// strictly lower rank, repeated rewriting terminates.
#[derive(Debug)]
pub struct Expander {
    supported: Vec<Gate>,
    rank: HashMap<Gate, u32>,
}

impl Expander {
    /// Rank every gate kind against `supported`.
    #[must_use]
    pub fn new(supported: &[Gate]) -> Self {
        let mut rank = supported.iter().map(|gate| (*gate, 0)).collect::<HashMap<_, _>>();

        let mut did_something = true;
        while did_something {
            did_something = false;
            let unranked = Gate::ALL.iter().copied().filter(|gate| !rank.contains_key(gate)).collect::<Vec<_>>();
            for gate in unranked {
                let parts = match rule_parts(gate) {
                    Some(parts) => parts,
                    None => continue,
                };
                let ranks = parts.iter().map(|part| rank.get(part).copied()).collect::<Option<Vec<_>>>();
                if let Some(max) = ranks.and_then(|ranks| ranks.into_iter().max()) {
                    rank.insert(gate, max + 1);
                    did_something = true;
                }
            }
        }

        Self { supported: supported.iter().copied().unique().collect(), rank }
    }

    /// Returns true if the device runs `gate` natively.
    #[must_use]
    pub fn is_supported(&self, gate: Gate) -> bool {
        self.supported.contains(&gate)
    }

    /// Returns the gate's distance from the supported set, or `None` if it cannot be expanded.
    #[must_use]
    pub fn rank(&self, gate: Gate) -> Option<u32> {
        self.rank.get(&gate).copied()
    }

    /// Find the first unsupported gate (of kind `target`, if given) and replace it.
    ///
    /// Returns `false` if no gate needed replacing.
    ///
    /// # Errors
    ///
    /// Fails if the selected gate has no applicable rule or an undriven input.
    pub fn rewrite_step(&self, net: &mut Net, target: Option<Gate>, ids: &mut IdAllocator) -> Result<bool, ExpandError> {
        let found = net.nodes().find_map(|node| {
            let gate = net.node(node).gate()?;
            let wanted = !self.is_supported(gate) && target.map_or(true, |target| target == gate);
            wanted.then(|| (node, gate))
        });
        let (node, gate) = match found {
            Some(found) => found,
            None => return Ok(false),
        };
        let id = net.node(node).id();

        if self.rank(gate).is_none() {
            return Err(ExpandError::NoRule { node: id, kind: gate, supported: self.supported.clone() });
        }

        let mut inputs = Vec::new();
        for port in 0..gate.input_count() {
            let (from, _, wire) = net
                .input_driver(node, port)
                .and_then(|edge| net.wire(edge))
                .ok_or(ExpandError::UnboundInput { node: id, kind: gate, port })?;
            inputs.push(Pin { node: from, port: wire.from_port, width: wire.width });
        }

        let outputs = (0..gate.output_count())
            .map(|index| {
                net.output_wires(node, gate.output_port(index))
                    .into_iter()
                    .filter_map(|edge| net.wire(edge).map(|(_, to, wire)| Pin { node: to, port: wire.to_port, width: wire.width }))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let mut b = Builder {
            net: &mut *net,
            ids: &mut *ids,
            replacing: node,
            added: Vec::new(),
            driven: vec![None; gate.output_count() as usize],
        };

        match gate {
            Gate::Not => {
                // NOT(a) => NAND(a, a)
                let nand = b.gate(Gate::Nand, &[inputs[0], inputs[0]]);
                b.drive(nand, Gate::Nand, 0, &outputs[0]);
            },
            Gate::And => {
                // AND(a, b) => NOT(NAND(a, b))
                let nand = b.gate(Gate::Nand, &[inputs[0], inputs[1]]);
                let not = b.gate(Gate::Not, &[Pin::output(nand, Gate::Nand, 0)]);
                b.drive(not, Gate::Not, 0, &outputs[0]);
            },
            Gate::Nand => {
                // NAND(a, b) => NOT(AND(a, b))
                let and = b.gate(Gate::And, &[inputs[0], inputs[1]]);
                let not = b.gate(Gate::Not, &[Pin::output(and, Gate::And, 0)]);
                b.drive(not, Gate::Not, 0, &outputs[0]);
            },
            Gate::Nor => {
                // NOR(a, b) => NOT(OR(a, b))
                let or = b.gate(Gate::Or, &[inputs[0], inputs[1]]);
                let not = b.gate(Gate::Not, &[Pin::output(or, Gate::Or, 0)]);
                b.drive(not, Gate::Not, 0, &outputs[0]);
            },
            Gate::Or => {
                // OR(a, b) => NAND(NOT(a), NOT(b))
                let not0 = b.gate(Gate::Not, &[inputs[0]]);
                let not1 = b.gate(Gate::Not, &[inputs[1]]);
                let nand = b.gate(Gate::Nand, &[Pin::output(not0, Gate::Not, 0), Pin::output(not1, Gate::Not, 0)]);
                b.drive(nand, Gate::Nand, 0, &outputs[0]);
            },
            Gate::Xor => {
                // XOR(a, b) => AND(NAND(a, b), OR(a, b))
                let nand = b.gate(Gate::Nand, &[inputs[0], inputs[1]]);
                let or = b.gate(Gate::Or, &[inputs[0], inputs[1]]);
                let and = b.gate(Gate::And, &[Pin::output(nand, Gate::Nand, 0), Pin::output(or, Gate::Or, 0)]);
                b.drive(and, Gate::And, 0, &outputs[0]);
            },
            Gate::HalfAdd => {
                let xor = b.gate(Gate::Xor, &[inputs[0], inputs[1]]);
                b.drive(xor, Gate::Xor, 0, &outputs[0]);
                let and = b.gate(Gate::And, &[inputs[0], inputs[1]]);
                b.drive(and, Gate::And, 0, &outputs[1]);
            },
            Gate::FullAdd => {
                let ha0 = b.gate(Gate::HalfAdd, &[inputs[0], inputs[1]]);
                let ha1 = b.gate(Gate::HalfAdd, &[inputs[2], Pin::output(ha0, Gate::HalfAdd, 0)]);
                b.drive(ha1, Gate::HalfAdd, 0, &outputs[0]);
                let or = b.gate(Gate::Or, &[Pin::output(ha0, Gate::HalfAdd, 1), Pin::output(ha1, Gate::HalfAdd, 1)]);
                b.drive(or, Gate::Or, 0, &outputs[1]);
            },
            Gate::Xnor | Gate::Split8 | Gate::Make8 => {
                return Err(ExpandError::NoRule { node: id, kind: gate, supported: self.supported.clone() });
            },
        }

        let Builder { added, driven, .. } = b;

        // A gate reading its own output now reads the replacement node driving that output.
        let feedback = net
            .graph()
            .edges_directed(node, Outgoing)
            .filter(|edge| added.contains(&edge.target()))
            .map(|edge| (edge.target(), *edge.weight()))
            .collect::<Vec<_>>();
        for (to, wire) in feedback {
            let source = wire.from_port.checked_sub(gate.input_count()).and_then(|index| driven.get(index as usize).copied().flatten());
            if let Some(source) = source {
                net.connect_wide(source.node, source.port, to, wire.to_port, wire.width);
            }
        }
        debug!(
            "{}: {} => {}",
            id,
            gate,
            added.iter().map(|node| net.node(*node).to_string()).join(", ")
        );

        net.kill_node(node);
        for node in added {
            net.add_node_rec(node);
        }

        Ok(true)
    }

    /// Rewrite until no unsupported gate (of kind `target`, if given) remains.
    ///
    /// Returns the number of rewrites performed.
    ///
    /// # Errors
    ///
    /// Stops at the first gate that cannot be rewritten.
    pub fn expand(&self, net: &mut Net, target: Option<Gate>, ids: &mut IdAllocator) -> Result<usize, ExpandError> {
        let mut count = 0;
        while self.rewrite_step(net, target, ids)? {
            count += 1;
        }
        info!("expanded {} gates; {} nodes and {} wires remain", count, net.node_count(), net.wire_count());
        Ok(count)
    }
}

impl Net {
    /// Expand every gate outside `supported` into supported gates.
    ///
    /// # Errors
    ///
    /// See [`Expander::expand`].
    pub fn expand(&mut self, target: Option<Gate>, supported: &[Gate], ids: &mut IdAllocator) -> Result<usize, ExpandError> {
        Expander::new(supported).expand(self, target, ids)
    }

    /// Returns true if every gate in the net is in `supported`.
    #[must_use]
    pub fn is_mapped_to(&self, supported: &[Gate]) -> bool {
        self.nodes().filter_map(|node| self.node(node).gate()).all(|gate| supported.contains(&gate))
    }
}
