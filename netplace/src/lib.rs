//! Compiling boolean gate networks for fixed-capability parallel devices.
//!
//! A device of this kind executes a circuit as a sequence of layers. Every layer is split across a fixed number of
//! compute units, each of which can run a bounded number of gates, and each unit only understands a fixed set of gate
//! kinds. Getting an arbitrary gate network onto such a device takes four passes:
//!
//! - Technology mapping: gates the device cannot run are rewritten into equivalent networks of gates it can, until
//!   nothing unsupported remains. Each rule replaces a gate with strictly simpler ones, so this always terminates.
//! - Layering: gates are scheduled as soon as possible, so that every gate sits in a later layer than everything it
//!   reads from.
//! - Placement: each layer's gates are packed greedily into units, preferring a unit that already computes one of
//!   the gate's inputs.
//! - Locality: every signal whose readers all run on its producer's unit stays local to that unit; everything else
//!   has to cross units, and is global.
//!
//! The result is a [`Layout`], which a device backend encodes into its own configuration format.
//!
//! Nodes and wires live in an arena owned by a [`Net`]. Node identities come from an [`IdAllocator`] that is passed
//! explicitly to everything that creates nodes.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod error;
pub mod gate;
pub mod layers;
pub mod layout;
pub mod net;
mod net_aiger;
mod net_check;
pub mod net_eval;
pub mod net_expand;
mod net_json;
pub mod pipeline;
pub mod place;
pub mod traits;

pub use error::{Error, Result};
pub use gate::Gate;
pub use layout::Layout;
pub use net::{IdAllocator, Net, NodeId, NodeKind};
pub use pipeline::{compile, CompileOptions};
