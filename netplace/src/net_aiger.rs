use std::collections::HashMap;
use std::io::Read;

use aiger::Literal;
use petgraph::prelude::*;

use crate::error::LoadError;
use crate::gate::Gate;
use crate::net::{IdAllocator, Net, NodeKind};

/// Resolves AIGER literals to driver ports, creating constants and inverters on demand.
struct Literals {
    drivers: HashMap<usize, (NodeIndex, u32)>,
    inverters: HashMap<usize, NodeIndex>,
    constants: [Option<NodeIndex>; 2],
    created: Vec<NodeIndex>,
}

impl Literals {
    fn constant(&mut self, net: &mut Net, ids: &mut IdAllocator, value: bool) -> (NodeIndex, u32) {
        let slot = &mut self.constants[usize::from(value)];
        let node = match slot {
            Some(node) => *node,
            None => {
                let node = net.create_node(NodeKind::Value(value), ids);
                self.created.push(node);
                *slot = Some(node);
                node
            },
        };
        (node, 0)
    }

    fn resolve(&mut self, net: &mut Net, ids: &mut IdAllocator, literal: Literal) -> Result<(NodeIndex, u32), LoadError> {
        let variable = literal.variable();
        if variable == 0 {
            return Ok(self.constant(net, ids, literal.is_inverted()));
        }

        let driver = *self
            .drivers
            .get(&variable)
            .ok_or_else(|| LoadError::Aiger(format!("literal {} has no driver", variable * 2)))?;
        if !literal.is_inverted() {
            return Ok(driver);
        }

        let not = match self.inverters.get(&variable) {
            Some(not) => *not,
            None => {
                let not = net.create_gate(Gate::Not, ids);
                net.connect(driver.0, driver.1, not, 0);
                self.inverters.insert(variable, not);
                self.created.push(not);
                not
            },
        };
        Ok((not, Gate::Not.output_port(0)))
    }
}

impl Net {
    /// Build a net from an AIGER file.
    ///
    /// Primary inputs become the ports of the input node and primary outputs the ports of the output node. Each AND
    /// gate becomes an `And` component; each inverted literal gets one shared `Not` component per variable.
    ///
    /// # Errors
    ///
    /// Fails if the file does not parse, a literal is never defined, or the file has latches.
    pub fn from_aiger<R: Read>(reader: R) -> Result<(Self, IdAllocator), LoadError> {
        let reader = aiger::Reader::from_reader(reader).map_err(|error| LoadError::Aiger(format!("{:?}", error)))?;

        let mut inputs = vec![];
        let mut outputs = vec![];
        let mut and_gates = vec![];

        for record in reader.records() {
            match record.map_err(|error| LoadError::Aiger(format!("{:?}", error)))? {
                aiger::Aiger::Input(l) => inputs.push(l.variable()),
                aiger::Aiger::Latch { output: _, input: _ } => return Err(LoadError::Unsupported("latches")),
                aiger::Aiger::Output(l) => outputs.push(l),
                aiger::Aiger::AndGate { output, inputs } => and_gates.push((output.variable(), inputs)),
                aiger::Aiger::Symbol { .. } => {},
            }
        }

        let mut ids = IdAllocator::new();
        let mut net = Self::new(inputs.len() as u32, outputs.len() as u32, &mut ids);
        let mut literals = Literals {
            drivers: HashMap::new(),
            inverters: HashMap::new(),
            constants: [None, None],
            created: Vec::new(),
        };

        for (port, variable) in inputs.iter().enumerate() {
            literals.drivers.insert(*variable, (net.input(), port as u32));
        }

        // Every gate exists before any is wired, since AIGER does not order gates by dependency.
        let mut gates = Vec::with_capacity(and_gates.len());
        for (variable, _) in &and_gates {
            let and = net.create_gate(Gate::And, &mut ids);
            literals.drivers.insert(*variable, (and, Gate::And.output_port(0)));
            gates.push(and);
        }

        for (and, (_, gate_inputs)) in gates.iter().zip(&and_gates) {
            for (port, literal) in gate_inputs.iter().enumerate() {
                let (driver, driver_port) = literals.resolve(&mut net, &mut ids, *literal)?;
                net.connect(driver, driver_port, *and, port as u32);
            }
        }

        for (port, literal) in outputs.iter().enumerate() {
            let (driver, driver_port) = literals.resolve(&mut net, &mut ids, *literal)?;
            net.connect(driver, driver_port, net.output(), port as u32);
        }

        for node in gates.into_iter().chain(literals.created) {
            net.add_node_rec(node);
        }

        Ok((net, ids))
    }
}
