//! The minimal in-crate Verilog-like AST, parser, and emitter used by the
//! RTL transformer (`spec.md` §4.3, §9 design note).

pub mod ast;
pub mod emit;
pub mod parse;

pub use ast::{Assign, Decl, Expr, Instance, Item, Module, PortDirection};
pub use emit::emit_module;
pub use parse::{parse_module, parse_modules};
