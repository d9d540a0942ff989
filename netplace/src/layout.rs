//! Classifying placed signals as local to a unit or global.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use itertools::Itertools;
use tracing::info;

use crate::net::{Net, NodeId};
use crate::place::Placement;

/// The signals one unit keeps to itself.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UnitConfig {
    /// Nodes whose output never leaves this unit.
    pub locals: BTreeSet<NodeId>,
}

/// A placed network with every signal classified as local to a unit or global.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    configs: Vec<UnitConfig>,
    placement: Placement,
    globals: BTreeSet<NodeId>,
}

impl Layout {
    /// Classify each placed node's output signal.
    ///
    /// A signal is local when every node reading it runs on the producer's unit (or nothing reads it), and global
    /// otherwise.
    #[must_use]
    pub fn classify(net: &Net, placement: Placement) -> Self {
        let unit_of = placement.unit_of();
        let mut configs = vec![UnitConfig::default(); placement.units()];
        let mut globals = BTreeSet::new();

        for (unit, config) in configs.iter_mut().enumerate() {
            for id in placement.unit_nodes(unit) {
                if usages(net, id, &unit_of).any(|used_on| used_on != unit) {
                    globals.insert(id);
                } else {
                    config.locals.insert(id);
                }
            }
        }

        info!("{} global signals across {} units", globals.len(), placement.units());
        Self { configs, placement, globals }
    }

    /// One entry per unit.
    #[must_use]
    pub fn configs(&self) -> &[UnitConfig] {
        &self.configs
    }

    /// The placement the signals were classified against.
    #[must_use]
    pub const fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Signals read on a unit other than the one producing them.
    #[must_use]
    pub const fn globals(&self) -> &BTreeSet<NodeId> {
        &self.globals
    }

    /// Number of local signals across all units.
    #[must_use]
    pub fn local_count(&self) -> usize {
        self.configs.iter().map(|config| config.locals.len()).sum()
    }

    /// Returns true if `id` is read off its own unit.
    #[must_use]
    pub fn is_global(&self, id: NodeId) -> bool {
        self.globals.contains(&id)
    }
}

/// The units of every placed node that reads `id`.
fn usages<'a>(net: &'a Net, id: NodeId, unit_of: &'a HashMap<NodeId, usize>) -> impl Iterator<Item = usize> + 'a {
    net.node_by_id(id)
        .map(|node| net.consumers(node))
        .unwrap_or_default()
        .into_iter()
        .filter_map(move |consumer| unit_of.get(&net.node(consumer).id()).copied())
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LAYOUT")?;
        writeln!(f, "globals: {}", self.globals.iter().join(", "))?;
        for (unit, config) in self.configs.iter().enumerate() {
            writeln!(f, "unit {}:", unit)?;
            writeln!(f, "  local {}", config.locals.iter().join(", "))?;
            for layer in 0..self.placement.layers() {
                let cell = self.placement.cell(unit, layer);
                if !cell.is_empty() {
                    writeln!(f, "  layer {}: {}", layer, cell)?;
                }
            }
        }
        Ok(())
    }
}
