//! Renders a `Module` back to Verilog-like text (`spec.md` §4.3, §8: the
//! parse→emit round-trip property for unmodified files).

use super::ast::{Decl, Expr, Item, Module};

fn emit_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::PartSelect(inner, msb, lsb) => format!("{}[{}:{}]", emit_expr(inner), msb, lsb),
        Expr::Concat(items) => {
            let inner: Vec<String> = items.iter().map(emit_expr).collect();
            format!("{{{}}}", inner.join(", "))
        }
        Expr::Other(text) => text.clone(),
    }
}

fn emit_decl(decl: &Decl) -> String {
    let (keyword, name, msb, lsb) = match decl {
        Decl::Input { name, msb, lsb } => ("input", name, *msb, *lsb),
        Decl::Output { name, msb, lsb } => ("output", name, *msb, *lsb),
        Decl::OutputReg { name, msb, lsb } => ("output reg", name, *msb, *lsb),
        Decl::Reg { name, msb, lsb } => ("reg", name, *msb, *lsb),
        Decl::Wire { name, msb, lsb } => ("wire", name, *msb, *lsb),
    };
    if msb == 0 && lsb == 0 {
        format!("{keyword} {name};")
    } else {
        format!("{keyword} [{msb}:{lsb}] {name};")
    }
}

fn emit_item(item: &Item) -> String {
    match item {
        Item::Decl(decl, _) => emit_decl(decl),
        Item::Assign(assign) => format!("assign {} = {};", emit_expr(&assign.lhs), emit_expr(&assign.rhs)),
        Item::Instance(inst) => {
            let conns: Vec<String> = inst
                .connections
                .iter()
                .map(|(port, expr)| format!(".{}({})", port, emit_expr(expr)))
                .collect();
            format!("{} {} ( {} );", inst.module, inst.name, conns.join(", "))
        }
        Item::Raw(text) => format!("{text};"),
    }
}

pub fn emit_module(module: &Module) -> String {
    let mut out = String::new();
    out.push_str(&format!("module {}({});\n", module.name, module.ports.join(", ")));
    for item in &module.items {
        out.push_str(&emit_item(item));
        out.push('\n');
    }
    out.push_str("endmodule\n");
    out
}
