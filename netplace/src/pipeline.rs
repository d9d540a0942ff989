//! The end-to-end compilation flow.

use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LoadError, Result};
use crate::gate::Gate;
use crate::layers::compute_layers;
use crate::layout::Layout;
use crate::net::{IdAllocator, Net};
use crate::place::{default_units, place};

/// What the target device can execute.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Gate kinds the device runs natively.
    pub supported: Vec<Gate>,
    /// Parallel compute units per layer; the widest layer when absent.
    pub units: Option<usize>,
    /// Nodes one unit can execute per layer.
    pub capacity: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { supported: vec![Gate::Nand], units: None, capacity: 4 }
    }
}

impl CompileOptions {
    /// Read a device description from JSON. Absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or unknown gate names.
    pub fn from_json_reader<R: Read>(reader: R) -> std::result::Result<Self, LoadError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Summary figures for a compiled net.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Gates rewritten by the technology mapper.
    pub rewrites: usize,
    /// Member nodes after mapping.
    pub nodes: usize,
    /// Member wires after mapping.
    pub wires: usize,
    /// Layers in the schedule.
    pub layers: usize,
    /// Compute units per layer.
    pub units: usize,
}

/// Map, check, schedule, place and classify a net.
///
/// `ids` must be the allocator that issued the net's identities.
///
/// # Errors
///
/// Stops at the first stage that fails. The net may have been partially rewritten by then.
pub fn compile(net: &mut Net, ids: &mut IdAllocator, options: &CompileOptions) -> Result<(Layout, Stats)> {
    let rewrites = net.expand(None, &options.supported, ids)?;
    net.check()?;

    let layers = compute_layers(&*net)?;
    let units = options.units.unwrap_or_else(|| default_units(&layers));
    let placement = place(net, &layers, units, options.capacity)?;
    let layout = Layout::classify(net, placement);

    let stats = Stats { rewrites, nodes: net.node_count(), wires: net.wire_count(), layers: layers.len(), units };
    info!("{:?}", stats);

    Ok((layout, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, PlaceError};
    use crate::layers::layer_index;
    use crate::net::{NodeId, NodeKind};
    use crate::net_expand::Expander;
    use itertools::Itertools;
    use std::collections::{BTreeSet, HashMap};

    /// Two inputs and a constant zero into one full adder, its sum on the only output.
    fn full_adder_net(ids: &mut IdAllocator) -> Net {
        let mut net = Net::new(2, 1, ids);
        let zero = net.create_node(NodeKind::Value(false), ids);
        let fa = net.create_gate(Gate::FullAdd, ids);
        net.connect(net.input(), 0, fa, 0);
        net.connect(net.input(), 1, fa, 1);
        net.connect(zero, 0, fa, 2);
        net.connect(fa, Gate::FullAdd.output_port(0), net.output(), 0);
        net.add_node_rec(fa);
        net
    }

    fn rederive_globals(net: &Net, layout: &Layout) -> BTreeSet<NodeId> {
        let unit_of = layout.placement().unit_of();
        let mut globals = BTreeSet::new();
        for layer in 0..layout.placement().layers() {
            for (unit, cell) in layout.placement().row(layer).iter().enumerate() {
                for id in cell.nodes() {
                    let node = net.node_by_id(*id).expect("placed node to exist");
                    for dep in net.dependencies(node) {
                        let dep = net.node(dep).id();
                        if unit_of[&dep] != unit {
                            globals.insert(dep);
                        }
                    }
                }
            }
        }
        globals
    }

    #[test]
    fn full_adder_end_to_end() {
        let mut ids = IdAllocator::new();
        let mut net = full_adder_net(&mut ids);
        let before = (0..4)
            .map(|row| net.evaluate_bits(&[row & 1 == 1, row & 2 == 2]).expect("evaluation to succeed"))
            .collect::<Vec<_>>();

        let (layout, stats) = compile(&mut net, &mut ids, &CompileOptions::default()).expect("compilation to succeed");

        assert!(net.is_mapped_to(&[Gate::Nand]));
        assert_eq!(net.check(), Ok(()));
        assert!(stats.rewrites > 0);

        let layers = compute_layers(&net).expect("mapped net to stay acyclic");
        let index = layer_index(&layers);
        for node in net.nodes() {
            let deps = net.dependencies(node);
            match deps.iter().map(|dep| index[dep]).max() {
                Some(max) => assert!(index[&node] > max),
                None => assert_eq!(index[&node], 0),
            }
        }

        // Layer 1 reads only the input and the constant, and holds more gates than one unit can take.
        assert!(!layout.globals().is_empty());
        assert_eq!(rederive_globals(&net, &layout), *layout.globals());
        assert_eq!(layout.configs().len(), layout.placement().units());
        assert_eq!(layout.local_count() + layout.globals().len(), net.node_count());

        let after = (0..4)
            .map(|row| net.evaluate_bits(&[row & 1 == 1, row & 2 == 2]).expect("evaluation to succeed"))
            .collect::<Vec<_>>();
        assert_eq!(after, before);
    }

    /// Map onto NAND one rewrite at a time, recording which gate each new node replaced.
    fn expand_with_lineage(net: &mut Net, ids: &mut IdAllocator) -> HashMap<NodeId, NodeId> {
        let expander = Expander::new(&[Gate::Nand]);
        let mut parent = HashMap::new();
        loop {
            let next = net.nodes().find(|node| net.node(*node).gate().map_or(false, |gate| !expander.is_supported(gate)));
            let replaced = match next {
                Some(node) => net.node(node).id(),
                None => break,
            };
            let first = ids.peek();
            assert_eq!(expander.rewrite_step(net, None, ids), Ok(true));
            for id in first..ids.peek() {
                parent.insert(NodeId(id), replaced);
            }
        }
        parent
    }

    #[test]
    fn full_adder_crossing_signals_are_global() {
        let mut ids = IdAllocator::new();
        let mut net = full_adder_net(&mut ids);
        let full_add = net.nodes().find(|node| net.node(*node).gate() == Some(Gate::FullAdd)).expect("a FULL_ADD");
        let full_add = net.node(full_add).id();

        let parent = expand_with_lineage(&mut net, &mut ids);
        // The FULL_ADD rule builds the first HALF_ADD, the second HALF_ADD and the carry OR, in that order.
        let parts = parent.iter().filter(|(_, replaced)| **replaced == full_add).map(|(id, _)| *id).sorted().collect::<Vec<_>>();
        assert_eq!(parts.len(), 3);
        let origin = |mut id: NodeId| -> Option<NodeId> {
            while !parts.contains(&id) {
                id = *parent.get(&id)?;
            }
            Some(id)
        };

        let (layout, stats) = compile(&mut net, &mut ids, &CompileOptions::default()).expect("compilation to succeed");
        assert_eq!(stats.rewrites, 0);
        let unit_of = layout.placement().unit_of();

        let mut crossings = BTreeSet::new();
        for node in net.nodes() {
            let producer = net.node(node).id();
            for consumer in net.consumers(node) {
                let consumer = net.node(consumer).id();
                if let (Some(from), Some(to)) = (origin(producer), origin(consumer)) {
                    if from != to {
                        crossings.insert((from, to));
                        if unit_of[&producer] != unit_of[&consumer] {
                            assert!(layout.is_global(producer), "{} crosses units without being global", producer);
                        }
                    }
                }
            }
        }

        // First sum into the second HALF_ADD, and both carries into the OR.
        let expected: BTreeSet<_> = [(parts[0], parts[1]), (parts[0], parts[2]), (parts[1], parts[2])].iter().copied().collect();
        assert_eq!(crossings, expected);
        assert_eq!(rederive_globals(&net, &layout), *layout.globals());
    }

    #[test]
    fn fixed_unit_count_overflows() {
        let mut ids = IdAllocator::new();
        let mut net = full_adder_net(&mut ids);
        let options = CompileOptions { supported: vec![Gate::Nand], units: Some(1), capacity: 2 };

        let error = compile(&mut net, &mut ids, &options).expect_err("one small unit not to fit");

        assert!(matches!(error, Error::Place(PlaceError::LayerOverflow { units: 1, capacity: 2, .. })));
    }

    #[test]
    fn options_from_json() {
        let text = r#"{ "supported": ["NAND", "NOT"], "capacity": 8 }"#;
        let options = CompileOptions::from_json_reader(text.as_bytes()).expect("options to parse");

        assert_eq!(options, CompileOptions { supported: vec![Gate::Nand, Gate::Not], units: None, capacity: 8 });
    }
}
