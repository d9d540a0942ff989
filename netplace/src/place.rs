//! Greedy packing of layered nodes into capacity-bounded compute units.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use itertools::Itertools;
use petgraph::prelude::*;
use tracing::{info, trace};

use crate::error::PlaceError;
use crate::net::{Net, NodeId};

/// The nodes one unit executes in one layer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Cell {
    nodes: Vec<NodeId>,
}

impl Cell {
    /// The nodes in placement order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of nodes in the cell.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the unit is idle in this layer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.nodes.iter().join(", "))
    }
}

/// A unit × layer matrix of cells.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Placement {
    units: usize,
    capacity: usize,
    rows: Vec<Vec<Cell>>,
}

impl Placement {
    /// The matrix width: how many compute units each layer has.
    #[must_use]
    pub const fn units(&self) -> usize {
        self.units
    }

    /// The matrix height.
    #[must_use]
    pub fn layers(&self) -> usize {
        self.rows.len()
    }

    /// Nodes each cell can hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// The cell of `unit` in `layer`.
    #[must_use]
    pub fn cell(&self, unit: usize, layer: usize) -> &Cell {
        &self.rows[layer][unit]
    }

    /// The cells of one layer, indexed by unit.
    #[must_use]
    pub fn row(&self, layer: usize) -> &[Cell] {
        &self.rows[layer]
    }

    /// Every node a unit executes, across all layers.
    pub fn unit_nodes(&self, unit: usize) -> impl Iterator<Item = NodeId> + '_ {
        self.rows.iter().flat_map(move |row| row[unit].nodes.iter().copied())
    }

    /// Map every placed node to its unit.
    #[must_use]
    pub fn unit_of(&self) -> HashMap<NodeId, usize> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().enumerate().flat_map(|(unit, cell)| cell.nodes.iter().map(move |id| (*id, unit))))
            .collect()
    }
}

/// The unit count to use when the target does not impose one: the widest layer.
#[must_use]
pub fn default_units(layers: &[Vec<NodeIndex>]) -> usize {
    layers.iter().map(Vec::len).max().unwrap_or(0)
}

/// Assign every node of every layer to a unit.
///
/// A node goes to the first unit (by index) that already hosts one of its dependencies, or another reader of one of
/// them, and still has room in this layer; failing that, to the first unit with room. Placement never backtracks.
///
/// # Errors
///
/// Fails if there are no units, the capacity is zero, or a layer holds more nodes than `units * capacity`.
pub fn place(net: &Net, layers: &[Vec<NodeIndex>], units: usize, capacity: usize) -> Result<Placement, PlaceError> {
    if units == 0 || capacity == 0 {
        return Err(PlaceError::NoCapacity { units, capacity });
    }

    let mut placement = Placement { units, capacity, rows: Vec::with_capacity(layers.len()) };
    let mut unit_of: HashMap<NodeIndex, usize> = HashMap::new();

    for (layer, nodes) in layers.iter().enumerate() {
        let overflow = PlaceError::LayerOverflow { layer, nodes: nodes.len(), units, capacity };
        if nodes.len() > units * capacity {
            return Err(overflow);
        }

        let mut row = vec![Cell::default(); units];

        for node in nodes {
            let affine = net
                .dependencies(*node)
                .into_iter()
                .flat_map(|dep| std::iter::once(dep).chain(net.consumers(dep)))
                .filter_map(|near| unit_of.get(&near).copied())
                .collect::<BTreeSet<_>>();

            let unit = affine
                .iter()
                .copied()
                .find(|unit| row[*unit].len() < capacity)
                .or_else(|| (0..units).find(|unit| row[*unit].len() < capacity));

            let unit = match unit {
                Some(unit) => unit,
                None => return Err(overflow),
            };

            let id = net.node(*node).id();
            trace!("layer {}: node {} -> unit {} (affine: {:?})", layer, id, unit, affine);
            row[unit].nodes.push(id);
            unit_of.insert(*node, unit);
        }

        placement.rows.push(row);
    }

    info!("placed {} nodes into {} layers of {} units", unit_of.len(), placement.layers(), units);
    Ok(placement)
}
