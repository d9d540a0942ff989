//! The gate catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A gate kind from the fixed catalog of boolean operators.
///
/// Ports are numbered per node: inputs occupy `0..input_count()`, and outputs continue directly after them, so a
/// `FullAdd` has inputs 0, 1, 2, its sum on port 3 and its carry on port 4.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gate {
    /// `!(a & b)`
    Nand,
    /// `!a`
    Not,
    /// `a & b`
    And,
    /// `a | b`
    Or,
    /// `!(a | b)`
    Nor,
    /// `a ^ b`
    Xor,
    /// `!(a ^ b)`
    Xnor,
    /// Sum and carry of two bits.
    HalfAdd,
    /// Sum and carry of three bits.
    FullAdd,
    /// One byte in, its eight bits out.
    Split8,
    /// Eight bits in, one byte out.
    Make8,
}

impl Gate {
    /// Every gate kind, in catalog order.
    pub const ALL: [Self; 11] = [
        Self::Nand,
        Self::Not,
        Self::And,
        Self::Or,
        Self::Nor,
        Self::Xor,
        Self::Xnor,
        Self::HalfAdd,
        Self::FullAdd,
        Self::Split8,
        Self::Make8,
    ];

    /// Number of input ports.
    #[must_use]
    pub const fn input_count(self) -> u32 {
        match self {
            Self::Not | Self::Split8 => 1,
            Self::Nand | Self::And | Self::Or | Self::Nor | Self::Xor | Self::Xnor | Self::HalfAdd => 2,
            Self::FullAdd => 3,
            Self::Make8 => 8,
        }
    }

    /// Number of output ports.
    #[must_use]
    pub const fn output_count(self) -> u32 {
        match self {
            Self::HalfAdd | Self::FullAdd => 2,
            Self::Split8 => 8,
            _ => 1,
        }
    }

    /// The node-relative port number of output `index`.
    #[must_use]
    pub const fn output_port(self, index: u32) -> u32 {
        self.input_count() + index
    }

    /// Returns true if `port` is one of this gate's input ports.
    #[must_use]
    pub const fn is_input_port(self, port: u32) -> bool {
        port < self.input_count()
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nand => "NAND",
            Self::Not => "NOT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Nor => "NOR",
            Self::Xor => "XOR",
            Self::Xnor => "XNOR",
            Self::HalfAdd => "HALF_ADD",
            Self::FullAdd => "FULL_ADD",
            Self::Split8 => "SPLIT8",
            Self::Make8 => "MAKE8",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::Gate;

    #[test]
    fn arities() {
        let expected = [(2, 1), (1, 1), (2, 1), (2, 1), (2, 1), (2, 1), (2, 1), (2, 2), (3, 2), (1, 8), (8, 1)];
        for (gate, (inputs, outputs)) in Gate::ALL.iter().zip(expected.iter()) {
            assert_eq!(gate.input_count(), *inputs, "{} input count", gate);
            assert_eq!(gate.output_count(), *outputs, "{} output count", gate);
        }
    }

    #[test]
    fn output_ports_follow_inputs() {
        assert_eq!(Gate::FullAdd.output_port(0), 3);
        assert_eq!(Gate::FullAdd.output_port(1), 4);
        assert!(Gate::Nand.is_input_port(1));
        assert!(!Gate::Nand.is_input_port(2));
    }

    #[test]
    fn supported_set_deserializes() {
        let gates: Vec<Gate> = serde_json::from_str(r#"["NAND", "HALF_ADD"]"#).expect("gate names to parse");
        assert_eq!(gates, vec![Gate::Nand, Gate::HalfAdd]);
    }
}
