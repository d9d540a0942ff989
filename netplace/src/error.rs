//! Error types for every pipeline stage.

use thiserror::Error;

use crate::gate::Gate;
use crate::net::NodeId;

/// Technology mapping failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    /// The gate kind has no rewrite rule that reaches the supported set.
    #[error("don't know how to expand {kind} (node {node}) to {supported:?}")]
    NoRule { node: NodeId, kind: Gate, supported: Vec<Gate> },

    /// A gate being rewritten has nothing driving one of its inputs.
    #[error("node {node} ({kind}) has no driver on input port {port}")]
    UnboundInput { node: NodeId, kind: Gate, port: u32 },
}

/// Structural inconsistencies found by the validator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckError {
    /// A gate has the wrong number of input wires.
    #[error("node {node} ({kind}) has {found} bound inputs, expected {expected}")]
    ArityMismatch { node: NodeId, kind: Gate, expected: u32, found: u32 },

    /// More than one wire drives one input port.
    #[error("node {node} ({kind}) input port {port} has {drivers} drivers")]
    MultipleDrivers { node: NodeId, kind: Gate, port: u32, drivers: usize },

    /// A wire enters a gate on one of its output ports.
    #[error("node {node} ({kind}) is driven on port {port}, which is not an input")]
    PortOutOfRange { node: NodeId, kind: Gate, port: u32 },
}

/// Scheduling failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayerError {
    /// Nodes that could not be scheduled, sorted by identity.
    #[error("recursive dependency detected in {0:?}")]
    Cycle(Vec<NodeId>),
}

/// Placement failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaceError {
    /// A layer holds more nodes than all units together can take.
    #[error("layer {layer} has {nodes} nodes but only {units} units of capacity {capacity}")]
    LayerOverflow { layer: usize, nodes: usize, units: usize, capacity: usize },

    /// There is nowhere to place anything.
    #[error("placement needs at least one unit of non-zero capacity ({units} units of capacity {capacity})")]
    NoCapacity { units: usize, capacity: usize },
}

/// Netlist loading failures.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The JSON did not parse or lacks a field.
    #[error("malformed netlist: {0}")]
    Json(#[from] serde_json::Error),

    /// The AIGER file did not parse or refers to an undefined literal.
    #[error("AIGER parse error: {0}")]
    Aiger(String),

    /// A node type outside the gate catalog.
    #[error("unsupported node type `{0}`")]
    UnknownType(String),

    /// A wire names a node that does not exist.
    #[error("wire references unknown node `{0}`")]
    UnknownNode(String),

    /// The root input or output node is missing.
    #[error("netlist has no {0} node")]
    MissingRoot(&'static str),

    /// The root input or output node appears twice.
    #[error("netlist has more than one {0} node")]
    DuplicateRoot(&'static str),

    /// The netlist uses something the net model cannot express.
    #[error("unsupported netlist feature: {0}")]
    Unsupported(&'static str),

    /// Reading the netlist failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Evaluation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    /// The assignment does not match the input node's arity.
    #[error("expected {expected} input values, got {found}")]
    InputCount { expected: usize, found: usize },
}

/// Any failure of the compilation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`ExpandError`].
    #[error(transparent)]
    Expand(#[from] ExpandError),

    /// See [`CheckError`].
    #[error(transparent)]
    Check(#[from] CheckError),

    /// See [`LayerError`].
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// See [`PlaceError`].
    #[error(transparent)]
    Place(#[from] PlaceError),

    /// See [`LoadError`].
    #[error(transparent)]
    Load(#[from] LoadError),

    /// See [`EvalError`].
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
