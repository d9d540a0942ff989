use petgraph::prelude::*;

use crate::error::CheckError;
use crate::net::Net;

impl Net {
    /// Check that every gate's bound inputs match its declared arity.
    ///
    /// # Errors
    ///
    /// Reports the first gate with the wrong number of input wires, more than one driver on an input port, or a wire
    /// driving one of its output ports.
    pub fn check(&self) -> Result<(), CheckError> {
        for node in self.nodes() {
            let gate = match self.node(node).gate() {
                Some(gate) => gate,
                None => continue,
            };
            let id = self.node(node).id();

            let mut found = 0;
            for edge in self.graph().edges_directed(node, Incoming) {
                let port = edge.weight().to_port;
                if !gate.is_input_port(port) {
                    return Err(CheckError::PortOutOfRange { node: id, kind: gate, port });
                }
                found += 1;
            }

            if found != gate.input_count() {
                return Err(CheckError::ArityMismatch { node: id, kind: gate, expected: gate.input_count(), found });
            }

            for port in 0..gate.input_count() {
                let drivers = self.input_drivers(node, port).len();
                if drivers > 1 {
                    return Err(CheckError::MultipleDrivers { node: id, kind: gate, port, drivers });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CheckError;
    use crate::gate::Gate;
    use crate::net::{IdAllocator, Net, NodeKind};

    #[test]
    fn well_formed_net_passes() {
        let mut ids = IdAllocator::new();
        let mut net = Net::new(2, 2, &mut ids);
        let ha = net.create_gate(Gate::HalfAdd, &mut ids);
        net.connect(net.input(), 0, ha, 0);
        net.connect(net.input(), 1, ha, 1);
        net.connect(ha, 2, net.output(), 0);
        net.connect(ha, 3, net.output(), 1);
        net.add_node_rec(ha);

        assert_eq!(net.check(), Ok(()));
        net.expand(None, &[Gate::Nand], &mut ids).expect("HALF_ADD to expand");
        assert_eq!(net.check(), Ok(()));
    }

    #[test]
    fn missing_input() {
        let mut ids = IdAllocator::new();
        let mut net = Net::new(1, 1, &mut ids);
        let nand = net.create_gate(Gate::Nand, &mut ids);
        net.connect(net.input(), 0, nand, 0);
        net.connect(nand, 2, net.output(), 0);
        net.add_node_rec(nand);

        assert_eq!(
            net.check(),
            Err(CheckError::ArityMismatch { node: net.node(nand).id(), kind: Gate::Nand, expected: 2, found: 1 })
        );
    }

    #[test]
    fn two_drivers_on_one_port() {
        let mut ids = IdAllocator::new();
        let mut net = Net::new(2, 1, &mut ids);
        let one = net.create_node(NodeKind::Value(true), &mut ids);
        let and = net.create_gate(Gate::And, &mut ids);
        net.connect(net.input(), 0, and, 0);
        net.connect(one, 0, and, 0);
        net.connect(and, 2, net.output(), 0);
        net.add_node_rec(and);

        assert_eq!(
            net.check(),
            Err(CheckError::MultipleDrivers { node: net.node(and).id(), kind: Gate::And, port: 0, drivers: 2 })
        );
    }

    #[test]
    fn driven_output_port() {
        let mut ids = IdAllocator::new();
        let mut net = Net::new(2, 1, &mut ids);
        let not = net.create_gate(Gate::Not, &mut ids);
        net.connect(net.input(), 0, not, 0);
        net.connect(net.input(), 1, not, 1);
        net.add_node_rec(not);

        assert_eq!(net.check(), Err(CheckError::PortOutOfRange { node: net.node(not).id(), kind: Gate::Not, port: 1 }));
    }
}
