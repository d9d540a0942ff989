use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use petgraph::prelude::*;
use serde::Deserialize;

use crate::error::LoadError;
use crate::gate::Gate;
use crate::net::{IdAllocator, Net, NodeKind};

#[derive(Debug, Deserialize)]
struct NetlistDesc {
    nodes: BTreeMap<String, NodeDesc>,
    wires: Vec<WireDesc>,
}

#[derive(Debug, Deserialize)]
struct NodeDesc {
    #[serde(rename = "type")]
    kind: String,
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireDesc {
    from: (String, u32),
    to: (String, u32),
    #[serde(default = "default_width")]
    width: u32,
}

const fn default_width() -> u32 {
    1
}

enum Role {
    Input,
    Output,
    Gate(Gate),
}

fn role(kind: &str) -> Result<Role, LoadError> {
    let gate = match kind {
        "Input" => return Ok(Role::Input),
        "Output" => return Ok(Role::Output),
        "Nand" => Gate::Nand,
        "Not" => Gate::Not,
        "And" => Gate::And,
        "Or" => Gate::Or,
        "Nor" => Gate::Nor,
        "Xor" => Gate::Xor,
        "Xnor" => Gate::Xnor,
        "Splitter8" => Gate::Split8,
        "Maker8" => Gate::Make8,
        _ => return Err(LoadError::UnknownType(kind.to_string())),
    };
    Ok(Role::Gate(gate))
}

fn find_root<'a>(roles: &[(&'a str, Role, Option<u32>)], wanted: fn(&Role) -> bool, what: &'static str) -> Result<&'a str, LoadError> {
    let mut found = roles.iter().filter(|(_, role, _)| wanted(role)).map(|(name, _, _)| *name);
    let name = found.next().ok_or(LoadError::MissingRoot(what))?;
    match found.next() {
        Some(_) => Err(LoadError::DuplicateRoot(what)),
        None => Ok(name),
    }
}

impl Net {
    /// Build a net from a JSON netlist.
    ///
    /// The netlist maps node names to `{ "type": ..., "width": ... }` and lists wires as
    /// `{ "from": [name, port], "to": [name, port], "width": ... }`. Exactly one `Input` and one `Output` node must
    /// exist; their `width` is their port count, and defaults to the number of ports the wires use. Names are
    /// resolved in sorted order, so identities are deterministic.
    ///
    /// Returns the net and the allocator to continue issuing identities from.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, missing fields, unknown node types, dangling names, or a missing or duplicated root.
    pub fn from_json(text: &str) -> Result<(Self, IdAllocator), LoadError> {
        Self::from_desc(serde_json::from_str(text)?)
    }

    /// Like [`from_json`](Self::from_json), reading from `reader`.
    ///
    /// # Errors
    ///
    /// See [`from_json`](Self::from_json).
    pub fn from_json_reader<R: Read>(reader: R) -> Result<(Self, IdAllocator), LoadError> {
        Self::from_desc(serde_json::from_reader(reader)?)
    }

    fn from_desc(desc: NetlistDesc) -> Result<(Self, IdAllocator), LoadError> {
        let mut roles = Vec::with_capacity(desc.nodes.len());
        for (name, node) in &desc.nodes {
            roles.push((name.as_str(), role(&node.kind)?, node.width));
        }

        let input_name = find_root(&roles, |role| matches!(role, Role::Input), "Input")?;
        let output_name = find_root(&roles, |role| matches!(role, Role::Output), "Output")?;

        let arity = |name: &str| -> u32 {
            desc.nodes[name].width.unwrap_or_else(|| {
                desc.wires
                    .iter()
                    .flat_map(|wire| {
                        let from = (wire.from.0 == name).then(|| wire.from.1.saturating_add(1));
                        let to = (wire.to.0 == name).then(|| wire.to.1.saturating_add(1));
                        from.into_iter().chain(to)
                    })
                    .max()
                    .unwrap_or(0)
            })
        };

        let mut ids = IdAllocator::new();
        let mut net = Self::new(arity(input_name), arity(output_name), &mut ids);

        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        nodes.insert(input_name, net.input());
        nodes.insert(output_name, net.output());
        let mut gates = Vec::new();
        for (name, role, _) in &roles {
            if let Role::Gate(gate) = role {
                let node = net.create_node(NodeKind::Component(*gate), &mut ids);
                nodes.insert(*name, node);
                gates.push(node);
            }
        }

        let lookup = |name: &str| nodes.get(name).copied().ok_or_else(|| LoadError::UnknownNode(name.to_string()));
        for wire in &desc.wires {
            let from = lookup(&wire.from.0)?;
            let to = lookup(&wire.to.0)?;
            net.connect_wide(from, wire.from.1, to, wire.to.1, wire.width);
        }

        for node in gates {
            net.add_node_rec(node);
        }

        Ok((net, ids))
    }
}
