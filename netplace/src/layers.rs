//! ASAP scheduling of a dependency graph into layers.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::error::LayerError;
use crate::traits::Graph;

/// Schedule every node as soon as all of its dependencies sit in strictly earlier layers.
///
/// Layer 0 is exactly the set of nodes without dependencies. Within a layer, nodes keep the order
/// [`Graph::node_list`] gave them.
///
/// # Errors
///
/// Returns [`LayerError::Cycle`] if a pass places nothing while nodes remain.
pub fn compute_layers<G: Graph>(graph: &G) -> Result<Vec<Vec<G::Node>>, LayerError> {
    let mut layer_of = HashMap::new();
    let mut layers = Vec::new();
    let mut remaining = graph.node_list();

    while !remaining.is_empty() {
        let (layer, rest): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|node| graph.node_inputs(*node).iter().all(|dep| layer_of.contains_key(dep)));

        if layer.is_empty() {
            let mut stuck = rest.iter().map(|node| graph.node_id(*node)).collect::<Vec<_>>();
            stuck.sort_unstable();
            return Err(LayerError::Cycle(stuck));
        }

        for node in &layer {
            layer_of.insert(*node, layers.len());
        }
        debug!("layer {}: {} nodes", layers.len(), layer.len());

        layers.push(layer);
        remaining = rest;
    }

    Ok(layers)
}

/// Map every scheduled node to its layer index.
#[must_use]
pub fn layer_index<N: Copy + Eq + Hash>(layers: &[Vec<N>]) -> HashMap<N, usize> {
    layers
        .iter()
        .enumerate()
        .flat_map(|(index, layer)| layer.iter().map(move |node| (*node, index)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Gate;
    use crate::net::{IdAllocator, Net, NodeKind};

    #[test]
    fn chain_layers() {
        let mut ids = IdAllocator::new();
        let mut net = Net::new(1, 1, &mut ids);
        let not0 = net.create_gate(Gate::Not, &mut ids);
        let not1 = net.create_gate(Gate::Not, &mut ids);
        let zero = net.create_node(NodeKind::Value(false), &mut ids);
        let nand = net.create_gate(Gate::Nand, &mut ids);
        net.connect(net.input(), 0, not0, 0);
        net.connect(not0, 1, not1, 0);
        net.connect(not1, 1, nand, 0);
        net.connect(zero, 0, nand, 1);
        net.connect(nand, 2, net.output(), 0);
        net.add_node_rec(not0);

        let layers = compute_layers(&net).expect("acyclic net to layer");

        assert_eq!(layers.len(), 5);
        assert_eq!(layers[0].len(), 2);
        assert!(layers[0].contains(&net.input()));
        assert!(layers[0].contains(&zero));
        assert_eq!(layers[1], vec![not0]);
        assert_eq!(layers[2], vec![not1]);
        assert_eq!(layers[3], vec![nand]);
        assert_eq!(layers[4], vec![net.output()]);
    }

    #[test]
    fn layers_respect_dependencies() {
        let mut ids = IdAllocator::new();
        let mut net = Net::new(2, 2, &mut ids);
        let xor = net.create_gate(Gate::Xor, &mut ids);
        let and = net.create_gate(Gate::And, &mut ids);
        let or = net.create_gate(Gate::Or, &mut ids);
        net.connect(net.input(), 0, xor, 0);
        net.connect(net.input(), 1, xor, 1);
        net.connect(xor, 2, and, 0);
        net.connect(net.input(), 0, and, 1);
        net.connect(and, 2, or, 0);
        net.connect(xor, 2, or, 1);
        net.connect(or, 2, net.output(), 0);
        net.connect(xor, 2, net.output(), 1);
        net.add_node_rec(xor);

        let layers = compute_layers(&net).expect("acyclic net to layer");
        let index = layer_index(&layers);

        for node in net.nodes() {
            let deps = net.dependencies(node);
            if deps.is_empty() {
                assert_eq!(index[&node], 0);
            } else {
                let max = deps.iter().map(|dep| index[dep]).max().expect("non-empty deps");
                assert!(index[&node] > max);
            }
        }
        assert_eq!(index[&net.output()], 4);
    }

    #[test]
    fn cycle_is_detected() {
        let mut ids = IdAllocator::new();
        let mut net = Net::new(1, 1, &mut ids);
        let a = net.create_gate(Gate::Nand, &mut ids);
        let b = net.create_gate(Gate::Not, &mut ids);
        net.connect(net.input(), 0, a, 0);
        net.connect(b, 1, a, 1);
        net.connect(a, 2, b, 0);
        net.connect(b, 1, net.output(), 0);
        net.add_node_rec(a);

        let error = compute_layers(&net).expect_err("cycle to be rejected");
        let ids = [net.node(a).id(), net.node(b).id(), net.node(net.output()).id()];
        let mut ids = ids.to_vec();
        ids.sort_unstable();

        assert_eq!(error, LayerError::Cycle(ids));
    }
}
