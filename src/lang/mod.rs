//! The two small description languages compiled by this crate
//! (`spec.md` §3, §4.1): sequences of observation patterns, and
//! trigger-gated signal/clock rewrites built on POS expressions.

pub mod ast;
pub mod pos;
pub mod rewrite;
pub mod sequence;

pub use ast::{Comparison, Const, Pattern, Sequence, SequenceList, Variable};
pub use pos::{Atom, PosExpr};
pub use rewrite::{ClockNode, ControlNode, ControlNodeList, SignalNode};
