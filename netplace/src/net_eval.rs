//! Evaluating a network for concrete input values.

use std::collections::HashMap;

use petgraph::prelude::*;

use crate::error::{EvalError, Result};
use crate::gate::Gate;
use crate::layers::compute_layers;
use crate::net::{Net, NodeKind};

/// Compute a gate's outputs from its input values. Boolean gates look at bit 0 only.
#[must_use]
pub fn gate_outputs(gate: Gate, inputs: &[u64]) -> Vec<u64> {
    let bit = |port: usize| inputs.get(port).copied().unwrap_or(0) & 1;
    match gate {
        Gate::Nand => vec![!(bit(0) & bit(1)) & 1],
        Gate::Not => vec![!bit(0) & 1],
        Gate::And => vec![bit(0) & bit(1)],
        Gate::Or => vec![bit(0) | bit(1)],
        Gate::Nor => vec![!(bit(0) | bit(1)) & 1],
        Gate::Xor => vec![bit(0) ^ bit(1)],
        Gate::Xnor => vec![!(bit(0) ^ bit(1)) & 1],
        Gate::HalfAdd => vec![bit(0) ^ bit(1), bit(0) & bit(1)],
        Gate::FullAdd => {
            let (a, b, c) = (bit(0), bit(1), bit(2));
            vec![a ^ b ^ c, (a & b) | (c & (a ^ b))]
        },
        Gate::Split8 => {
            let word = inputs.first().copied().unwrap_or(0);
            (0..8).map(|i| (word >> i) & 1).collect()
        },
        Gate::Make8 => vec![(0..8).fold(0, |word, i| word | (bit(i) << i))],
    }
}

impl Net {
    /// Evaluate the network for one assignment of its input ports.
    ///
    /// Every port carries a bit vector. Undriven ports read as zero.
    ///
    /// # Errors
    ///
    /// Fails if the net has a dependency cycle or `inputs` does not match the input node's arity.
    pub fn evaluate(&self, inputs: &[u64]) -> Result<Vec<u64>> {
        if let NodeKind::Input { arity } = self.node(self.input()).kind() {
            if inputs.len() != arity as usize {
                return Err(EvalError::InputCount { expected: arity as usize, found: inputs.len() }.into());
            }
        }

        let layers = compute_layers(self)?;
        let mut values: HashMap<(NodeIndex, u32), u64> = HashMap::new();
        let mut outputs = Vec::new();

        let read = |values: &HashMap<(NodeIndex, u32), u64>, node: NodeIndex, port: u32| -> u64 {
            self.input_driver(node, port)
                .and_then(|edge| self.wire(edge))
                .map_or(0, |(from, _, wire)| match self.node(from).kind() {
                    NodeKind::Value(value) => u64::from(value),
                    _ => values.get(&(from, wire.from_port)).copied().unwrap_or(0),
                })
        };

        for node in layers.into_iter().flatten() {
            match self.node(node).kind() {
                NodeKind::Input { .. } => {
                    for (port, value) in inputs.iter().enumerate() {
                        values.insert((node, port as u32), *value);
                    }
                },
                NodeKind::Value(_) => {},
                NodeKind::Component(gate) => {
                    let args = (0..gate.input_count()).map(|port| read(&values, node, port)).collect::<Vec<_>>();
                    for (index, value) in gate_outputs(gate, &args).into_iter().enumerate() {
                        values.insert((node, gate.output_port(index as u32)), value);
                    }
                },
                NodeKind::Output { arity } => {
                    if node == self.output() {
                        outputs = (0..arity).map(|port| read(&values, node, port)).collect();
                    }
                },
            }
        }

        Ok(outputs)
    }

    /// Evaluate a purely boolean network.
    ///
    /// # Errors
    ///
    /// See [`evaluate`](Self::evaluate).
    pub fn evaluate_bits(&self, inputs: &[bool]) -> Result<Vec<bool>> {
        let words = inputs.iter().map(|bit| u64::from(*bit)).collect::<Vec<_>>();
        Ok(self.evaluate(&words)?.into_iter().map(|word| word & 1 == 1).collect())
    }
}
