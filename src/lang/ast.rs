//! AST node types shared by the sequence and rewrite languages
//! (`spec.md` §3, §4.1).

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// A sized binary literal, e.g. `3'b010` → `width = 3, bits = "010"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Const {
    pub width: u32,
    pub bits: String,
}

impl Const {
    pub fn value(&self) -> u64 {
        u64::from_str_radix(&self.bits, 2).unwrap_or(0)
    }
}

/// A dotted hierarchical variable reference with a part-select,
/// e.g. `TOP.inst1.sig[1:0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub msb: u32,
    pub lsb: u32,
}

impl Variable {
    pub fn width(&self) -> u32 {
        self.msb - self.lsb + 1
    }
}

/// Comparison kind, encoded into a 2-bit selector per `spec.md` §3:
/// `EQ→11, GT→10, LT→01, PASS→00`. The enum discriminants are the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Comparison {
    Pass = 0b00,
    Lt = 0b01,
    Gt = 0b10,
    Eq = 0b11,
}

impl Comparison {
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "==" => Some(Comparison::Eq),
            ">" => Some(Comparison::Gt),
            "<" => Some(Comparison::Lt),
            _ => None,
        }
    }
}

/// One cycle's observation constraint: empty (a pass cycle) or a
/// `(Variable, Comparison, Const)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Pass,
    Compare {
        var: Variable,
        op: Comparison,
        constant: Const,
    },
}

/// A named, ordered list of patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub name: String,
    pub patterns: Vec<Pattern>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceList {
    pub sequences: Vec<Sequence>,
}
