//! RTL transformer (`spec.md` §4.3 C3): Stage 1 rewrites each module's own
//! observed/controlled declarations to route through an external SRU hop;
//! Stage 2 weaves the resulting observe/control ports up the instance tree.
//!
//! Grounded in `ASAPInsertion.VerilogGenerator`, generalized to build
//! replacement AST nodes rather than mutate shared nodes in place
//! (`spec.md` §9 design note).

use std::collections::HashMap;

use tracing::{info, warn};

use crate::hierarchy::InstanceNode;
use crate::pragma::{FilePragmas, PragmaControlType};
use crate::rtl::{Assign, Decl, Expr, Item, Module};

/// A signal tapped *out* to the SRU: the raw, pre-override value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverTap {
    pub name: String,
    pub msb: u32,
    pub lsb: u32,
    pub kind: PragmaControlType,
}

/// A signal driven *in* from the SRU: where its override lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTap {
    pub name: String,
    pub msb: u32,
    pub lsb: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage1Result {
    pub module: Module,
    pub drivers: Vec<DriverTap>,
    pub loads: Vec<LoadTap>,
    /// `(observe_port name source, msb, lsb)` in declaration order.
    pub observe_taps: Vec<(String, u32, u32)>,
}

fn counterpart(name: &str) -> String {
    format!("{name}_controlled")
}

/// Stage 1: for every declaration whose source line carries pragmas, apply
/// the declared-kind rewrite mapping of `spec.md` §4.3.
pub fn rewrite_module(module: &Module, pragmas: &FilePragmas) -> Stage1Result {
    let mut rhs_renames: HashMap<String, String> = HashMap::new();
    let mut lhs_renames: HashMap<String, String> = HashMap::new();
    let mut decl_replacements: HashMap<String, Decl> = HashMap::new();
    let mut extra_decls: Vec<Decl> = Vec::new();
    let mut drivers = Vec::new();
    let mut loads = Vec::new();
    let mut observed: Vec<(String, u32, u32)> = Vec::new();

    for (decl, line) in module.decls() {
        let Some(pragma) = pragmas.get(&line) else {
            continue;
        };
        if pragma.observe.is_some() {
            observed.push((decl.name().to_string(), decl.msb(), decl.lsb()));
        }
        let Some((kind, _range)) = pragma.control else {
            continue;
        };
        let name = decl.name().to_string();
        let tag = counterpart(&name);
        let (msb, lsb) = (decl.msb(), decl.lsb());

        match decl {
            Decl::Input { .. } => {
                rhs_renames.insert(name.clone(), tag.clone());
                extra_decls.push(Decl::Wire { name: tag.clone(), msb, lsb });
                drivers.push(DriverTap { name, msb, lsb, kind });
                loads.push(LoadTap { name: tag, msb, lsb });
            }
            Decl::Output { .. } => {
                lhs_renames.insert(name.clone(), tag.clone());
                extra_decls.push(Decl::Wire { name: tag.clone(), msb, lsb });
                drivers.push(DriverTap { name: tag, msb, lsb, kind });
                loads.push(LoadTap { name, msb, lsb });
            }
            Decl::OutputReg { .. } => {
                lhs_renames.insert(name.clone(), tag.clone());
                extra_decls.push(Decl::Reg { name: tag.clone(), msb, lsb });
                decl_replacements.insert(name.clone(), Decl::Output { name: name.clone(), msb, lsb });
                drivers.push(DriverTap { name: tag, msb, lsb, kind });
                loads.push(LoadTap { name, msb, lsb });
            }
            Decl::Reg { .. } => {
                lhs_renames.insert(name.clone(), tag.clone());
                extra_decls.push(Decl::Reg { name: tag.clone(), msb, lsb });
                decl_replacements.insert(name.clone(), Decl::Wire { name: name.clone(), msb, lsb });
                drivers.push(DriverTap { name: tag, msb, lsb, kind });
                loads.push(LoadTap { name, msb, lsb });
            }
            Decl::Wire { .. } => {
                lhs_renames.insert(name.clone(), tag.clone());
                extra_decls.push(Decl::Wire { name: tag.clone(), msb, lsb });
                drivers.push(DriverTap { name: tag, msb, lsb, kind });
                loads.push(LoadTap { name, msb, lsb });
            }
        }
    }

    if observed.is_empty() && drivers.is_empty() {
        warn!(module = %module.name, "no observed or controlled signals found");
    }

    // Resolve observe taps last, now that the full driver list is known:
    // tap the counterpart if it is the one carrying the raw driver value,
    // else tap the signal itself.
    let observe_taps: Vec<(String, u32, u32)> = observed
        .into_iter()
        .map(|(name, msb, lsb)| {
            let tag = counterpart(&name);
            if drivers.iter().any(|d| d.name == tag) {
                (tag, msb, lsb)
            } else {
                (name, msb, lsb)
            }
        })
        .collect();

    let mut items: Vec<Item> = Vec::with_capacity(module.items.len() + extra_decls.len());
    for item in &module.items {
        match item {
            Item::Decl(decl, line) => {
                let decl = decl_replacements.get(decl.name()).cloned().unwrap_or_else(|| decl.clone());
                items.push(Item::Decl(decl, *line));
            }
            Item::Assign(assign) => {
                let mut lhs = assign.lhs.clone();
                let mut rhs = assign.rhs.clone();
                if let Some(target) = lhs.ident_name() {
                    if let Some(new_name) = lhs_renames.get(target) {
                        lhs.rename(target, new_name);
                    }
                }
                if let Some(source) = rhs.ident_name() {
                    if let Some(new_name) = rhs_renames.get(source) {
                        rhs.rename(source, new_name);
                    }
                }
                items.push(Item::Assign(Assign {
                    lhs,
                    rhs,
                    source_line: assign.source_line,
                }));
            }
            other => items.push(other.clone()),
        }
    }
    for decl in extra_decls {
        items.push(Item::Decl(decl, 0));
    }

    // Splice the `_int` wires and their tap/pack/unpack assignments
    // (`spec.md` §4.3 Stage 1, the bullets after the rename table): one
    // concatenated bus per direction, each signal packed in driver/load/
    // observe-tap order at a contiguous offset.
    splice_int_bus(&mut items, "observe_port_int", &observe_taps, |(name, msb, lsb)| (name.clone(), *msb, *lsb), Pack::Into);
    splice_int_bus(
        &mut items,
        "control_port_out_int",
        &drivers,
        |d| (d.name.clone(), d.msb, d.lsb),
        Pack::Into,
    );
    splice_int_bus(
        &mut items,
        "control_port_in_int",
        &loads,
        |l| (l.name.clone(), l.msb, l.lsb),
        Pack::From,
    );

    info!(
        module = %module.name,
        drivers = drivers.len(),
        loads = loads.len(),
        observed = observe_taps.len(),
        "stage 1 rewrite complete"
    );

    Stage1Result {
        module: Module {
            name: module.name.clone(),
            ports: module.ports.clone(),
            items,
        },
        drivers,
        loads,
        observe_taps,
    }
}

/// Whether a bus's per-entry assignments drive the bus from the named
/// signals (`Into`, used for `observe_port_int`/`control_port_out_int`) or
/// drive the named signals from the bus (`From`, used for
/// `control_port_in_int`, which flows the other way).
enum Pack {
    Into,
    From,
}

/// Declares `bus_name` as a wire sized to the total width of `entries` and
/// appends one pack/unpack assignment per entry, at a contiguous offset in
/// source order. No-op if `entries` is empty.
fn splice_int_bus<T>(items: &mut Vec<Item>, bus_name: &str, entries: &[T], field: impl Fn(&T) -> (String, u32, u32), direction: Pack) {
    let total: u32 = entries.iter().map(|e| { let (_, msb, lsb) = field(e); msb - lsb + 1 }).sum();
    if total == 0 {
        return;
    }
    items.push(Item::Decl(Decl::Wire { name: bus_name.to_string(), msb: total - 1, lsb: 0 }, 0));
    let mut cursor = 0u32;
    for entry in entries {
        let (name, msb, lsb) = field(entry);
        let width = msb - lsb + 1;
        let bus_slice = Expr::PartSelect(Box::new(Expr::Ident(bus_name.to_string())), cursor + width - 1, cursor);
        let (lhs, rhs) = match direction {
            Pack::Into => (bus_slice, Expr::Ident(name)),
            Pack::From => (Expr::Ident(name), bus_slice),
        };
        items.push(Item::Assign(Assign { lhs, rhs, source_line: 0 }));
        cursor += width;
    }
}

/// Per-module accumulated port widths after weaving (`spec.md` §4.3 Stage 2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WovenWidths {
    pub observe: u32,
    pub control_in: u32,
    pub control_out: u32,
}

/// Stage 2: traverses the instance tree bottom-up, widening each module's
/// observe/control ports to carry its own Stage-1 taps plus the sum of its
/// children's widths. Each module body is only rewritten once, memoized by
/// module name, even if instantiated many times.
pub fn weave_hierarchy(
    root: &InstanceNode,
    stage1: &HashMap<String, Stage1Result>,
) -> HashMap<String, WovenWidths> {
    let mut memo = HashMap::new();
    weave_node(root, stage1, &mut memo);
    memo
}

fn weave_node(
    node: &InstanceNode,
    stage1: &HashMap<String, Stage1Result>,
    memo: &mut HashMap<String, WovenWidths>,
) -> WovenWidths {
    if let Some(widths) = memo.get(&node.module) {
        return *widths;
    }

    let mut child_total = WovenWidths::default();
    for child in &node.children {
        let w = weave_node(child, stage1, memo);
        child_total.observe += w.observe;
        child_total.control_in += w.control_in;
        child_total.control_out += w.control_out;
    }

    let own = stage1.get(&node.module);
    let own_observe: u32 = own.map_or(0, |r| r.observe_taps.iter().map(|(_, msb, lsb)| msb - lsb + 1).sum());
    let own_control_in: u32 = own.map_or(0, |r| r.loads.iter().map(|l| l.msb - l.lsb + 1).sum());
    let own_control_out: u32 = own.map_or(0, |r| r.drivers.iter().map(|d| d.msb - d.lsb + 1).sum());

    let widths = WovenWidths {
        observe: own_observe + child_total.observe,
        control_in: own_control_in + child_total.control_in,
        control_out: own_control_out + child_total.control_out,
    };

    info!(module = %node.module, ?widths, "stage 2 weave complete");
    memo.insert(node.module.clone(), widths);
    widths
}

fn decl_wire(module: &mut Module, name: &str, width: u32) {
    if width == 0 {
        return;
    }
    module.items.push(Item::Decl(Decl::Wire { name: name.to_string(), msb: width - 1, lsb: 0 }, 0));
}

fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string())
}

/// Joins an `_int`/`_inst` pair by concatenation, or aliases whichever half
/// is non-empty (`spec.md` §4.3 Stage 2: "join the halves by concatenation
/// (or plain aliasing if only one half is non-empty)"). `int` first.
fn concat_halves(int_name: &str, int_width: u32, inst_name: &str, inst_width: u32) -> Expr {
    match (int_width > 0, inst_width > 0) {
        (true, true) => Expr::Concat(vec![ident(int_name), ident(inst_name)]),
        (true, false) => ident(int_name),
        (false, true) => ident(inst_name),
        (false, false) => unreachable!("concat_halves is only called when the total width is > 0"),
    }
}

/// Stage 2: hooks each child instance's port arguments to slices of this
/// module's `observe_port_inst`/`control_port_in_inst`/`control_port_out_inst`
/// buses, then declares (or widens) this module's own `observe_port`,
/// `control_port_in`, `control_port_out` I/O to `totals` and joins the
/// `_int` (this module's own Stage-1 taps) and `_inst` (children's) halves
/// by concatenation (`spec.md` §4.3 Stage 2).
pub fn apply_woven_ports(module: &mut Module, totals: WovenWidths, own: &Stage1Result, widths_by_module: &HashMap<String, WovenWidths>) {
    let int_observe: u32 = own.observe_taps.iter().map(|(_, msb, lsb)| msb - lsb + 1).sum();
    let int_control_out: u32 = own.drivers.iter().map(|d| d.msb - d.lsb + 1).sum();
    let int_control_in: u32 = own.loads.iter().map(|l| l.msb - l.lsb + 1).sum();

    let mut observe_cursor = 0u32;
    let mut control_in_cursor = 0u32;
    let mut control_out_cursor = 0u32;

    for item in module.items.iter_mut() {
        let Item::Instance(inst) = item else { continue };
        let child = widths_by_module.get(&inst.module).copied().unwrap_or_default();
        if child.observe > 0 {
            inst.connections.push((
                "observe_port".to_string(),
                Expr::PartSelect(Box::new(ident("observe_port_inst")), observe_cursor + child.observe - 1, observe_cursor),
            ));
            observe_cursor += child.observe;
        }
        if child.control_in > 0 {
            inst.connections.push((
                "control_port_in".to_string(),
                Expr::PartSelect(Box::new(ident("control_port_in_inst")), control_in_cursor + child.control_in - 1, control_in_cursor),
            ));
            control_in_cursor += child.control_in;
        }
        if child.control_out > 0 {
            inst.connections.push((
                "control_port_out".to_string(),
                Expr::PartSelect(Box::new(ident("control_port_out_inst")), control_out_cursor + child.control_out - 1, control_out_cursor),
            ));
            control_out_cursor += child.control_out;
        }
    }

    let (inst_observe, inst_control_in, inst_control_out) = (observe_cursor, control_in_cursor, control_out_cursor);

    if totals.observe > 0 {
        decl_wire(module, "observe_port_inst", inst_observe);
        module.ports.push("observe_port".to_string());
        module.items.push(Item::Decl(Decl::Output { name: "observe_port".to_string(), msb: totals.observe - 1, lsb: 0 }, 0));
        module.items.push(Item::Assign(Assign {
            lhs: ident("observe_port"),
            rhs: concat_halves("observe_port_int", int_observe, "observe_port_inst", inst_observe),
            source_line: 0,
        }));
    }

    if totals.control_out > 0 {
        decl_wire(module, "control_port_out_inst", inst_control_out);
        module.ports.push("control_port_out".to_string());
        module.items.push(Item::Decl(Decl::Output { name: "control_port_out".to_string(), msb: totals.control_out - 1, lsb: 0 }, 0));
        module.items.push(Item::Assign(Assign {
            lhs: ident("control_port_out"),
            rhs: concat_halves("control_port_out_int", int_control_out, "control_port_out_inst", inst_control_out),
            source_line: 0,
        }));
    }

    if totals.control_in > 0 {
        decl_wire(module, "control_port_in_inst", inst_control_in);
        module.ports.push("control_port_in".to_string());
        module.items.push(Item::Decl(Decl::Input { name: "control_port_in".to_string(), msb: totals.control_in - 1, lsb: 0 }, 0));
        // Input direction: split the port into its `_int`/`_inst` halves
        // rather than concatenating into it.
        if int_control_in > 0 {
            let rhs = if inst_control_in > 0 {
                Expr::PartSelect(Box::new(ident("control_port_in")), int_control_in - 1, 0)
            } else {
                ident("control_port_in")
            };
            module.items.push(Item::Assign(Assign { lhs: ident("control_port_in_int"), rhs, source_line: 0 }));
        }
        if inst_control_in > 0 {
            let rhs = if int_control_in > 0 {
                Expr::PartSelect(Box::new(ident("control_port_in")), totals.control_in - 1, int_control_in)
            } else {
                ident("control_port_in")
            };
            module.items.push(Item::Assign(Assign { lhs: ident("control_port_in_inst"), rhs, source_line: 0 }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtl::parse_module;

    fn pragmas(entries: &[(usize, crate::pragma::Pragma)]) -> FilePragmas {
        entries.iter().cloned().collect()
    }

    #[test]
    fn input_wire_renames_rhs_uses_only() {
        let src = "module M(a, y);\ninput [3:0] a;\noutput [3:0] y;\nassign y = a;\nendmodule\n";
        let module = parse_module(src).unwrap();
        let ps = pragmas(&[(
            2,
            crate::pragma::Pragma {
                observe: None,
                control: Some((PragmaControlType::Signal, [3, 0])),
            },
        )]);
        let result = rewrite_module(&module, &ps);
        assert_eq!(result.drivers.len(), 1);
        assert_eq!(result.drivers[0].name, "a");
        assert_eq!(result.loads[0].name, "a_controlled");

        let assign = result
            .module
            .items
            .iter()
            .find_map(|i| match i {
                Item::Assign(a) => Some(a),
                _ => None,
            })
            .unwrap();
        assert_eq!(assign.rhs, Expr::Ident("a_controlled".to_string()));
        assert_eq!(assign.lhs, Expr::Ident("y".to_string()));
    }

    #[test]
    fn internal_wire_renames_lhs_drivers_only() {
        let src = "module M(a, y);\ninput [3:0] a;\nwire [3:0] s;\noutput [3:0] y;\nassign s = a;\nassign y = s;\nendmodule\n";
        let module = parse_module(src).unwrap();
        let ps = pragmas(&[(
            3,
            crate::pragma::Pragma {
                observe: None,
                control: Some((PragmaControlType::Signal, [3, 0])),
            },
        )]);
        let result = rewrite_module(&module, &ps);
        assert_eq!(result.drivers[0].name, "s_controlled");
        assert_eq!(result.loads[0].name, "s");

        let assigns: Vec<_> = result
            .module
            .items
            .iter()
            .filter_map(|i| match i {
                Item::Assign(a) => Some(a),
                _ => None,
            })
            .collect();
        assert_eq!(assigns[0].lhs, Expr::Ident("s_controlled".to_string()));
        assert_eq!(assigns[1].rhs, Expr::Ident("s".to_string()));
    }

    #[test]
    fn observed_and_controlled_signal_taps_the_counterpart() {
        let src = "module M(a);\nwire [3:0] a;\nassign a = a;\nendmodule\n";
        let module = parse_module(src).unwrap();
        let ps = pragmas(&[(
            2,
            crate::pragma::Pragma {
                observe: Some([3, 0]),
                control: Some((PragmaControlType::Signal, [3, 0])),
            },
        )]);
        let result = rewrite_module(&module, &ps);
        assert_eq!(result.observe_taps, vec![("a_controlled".to_string(), 3, 0)]);
    }

    #[test]
    fn weave_hierarchy_sums_child_widths_once_per_module() {
        let leaf = InstanceNode {
            name: "u0".to_string(),
            module: "Leaf".to_string(),
            children: vec![],
        };
        let leaf2 = InstanceNode {
            name: "u1".to_string(),
            module: "Leaf".to_string(),
            children: vec![],
        };
        let top = InstanceNode {
            name: "TOP".to_string(),
            module: "Top".to_string(),
            children: vec![leaf, leaf2],
        };

        let mut stage1 = HashMap::new();
        stage1.insert(
            "Leaf".to_string(),
            Stage1Result {
                module: Module {
                    name: "Leaf".to_string(),
                    ports: vec![],
                    items: vec![],
                },
                drivers: vec![],
                loads: vec![],
                observe_taps: vec![("a".to_string(), 3, 0)],
            },
        );

        let widths = weave_hierarchy(&top, &stage1);
        assert_eq!(widths["Leaf"].observe, 4);
        assert_eq!(widths["Top"].observe, 8);
    }

    #[test]
    fn stage1_splices_int_buses_with_tap_and_pack_unpack_assigns() {
        let src = "module M(a);\ninput [3:0] a;\nendmodule\n";
        let module = parse_module(src).unwrap();
        let ps = pragmas(&[(
            2,
            crate::pragma::Pragma {
                observe: Some([3, 0]),
                control: Some((PragmaControlType::Signal, [3, 0])),
            },
        )]);
        let result = rewrite_module(&module, &ps);

        let decl_names: Vec<&str> = result.module.decls().map(|(d, _)| d.name()).collect();
        assert!(decl_names.contains(&"observe_port_int"));
        assert!(decl_names.contains(&"control_port_out_int"));
        assert!(decl_names.contains(&"control_port_in_int"));

        let assigns: Vec<&Assign> = result
            .module
            .items
            .iter()
            .filter_map(|i| match i {
                Item::Assign(a) => Some(a),
                _ => None,
            })
            .collect();
        // observe taps the raw port `a` (no counterpart is in the driver list).
        assert!(assigns.iter().any(|a| a.lhs
            == Expr::PartSelect(Box::new(Expr::Ident("observe_port_int".to_string())), 3, 0)
            && a.rhs == Expr::Ident("a".to_string())));
        // driver pack: control_port_out_int <- a (the raw port).
        assert!(assigns.iter().any(|a| a.lhs
            == Expr::PartSelect(Box::new(Expr::Ident("control_port_out_int".to_string())), 3, 0)
            && a.rhs == Expr::Ident("a".to_string())));
        // load unpack: a_controlled <- control_port_in_int.
        assert!(assigns.iter().any(|a| a.lhs == Expr::Ident("a_controlled".to_string())
            && a.rhs == Expr::PartSelect(Box::new(Expr::Ident("control_port_in_int".to_string())), 3, 0)));
    }

    #[test]
    fn stage1_skips_int_buses_when_nothing_is_observed_or_controlled() {
        let src = "module M(a);\ninput [3:0] a;\nendmodule\n";
        let module = parse_module(src).unwrap();
        let result = rewrite_module(&module, &FilePragmas::new());
        let decl_names: Vec<&str> = result.module.decls().map(|(d, _)| d.name()).collect();
        assert!(!decl_names.contains(&"observe_port_int"));
        assert!(!decl_names.contains(&"control_port_out_int"));
        assert!(!decl_names.contains(&"control_port_in_int"));
    }

    #[test]
    fn stage2_hooks_single_child_instance_and_aliases_the_int_half_away() {
        // Top has no observed/controlled signals of its own, so its woven
        // port must alias straight through to the child's `_inst` slice
        // with no concatenation and no undefined `observe_port_int` net.
        let src = "module Top(clk);\ninput clk;\nLeaf u0 ( .a(clk) );\nendmodule\n";
        let mut module = parse_module(src).unwrap();
        let own = Stage1Result {
            module: module.clone(),
            drivers: vec![],
            loads: vec![],
            observe_taps: vec![],
        };
        let mut widths_by_module = HashMap::new();
        widths_by_module.insert(
            "Leaf".to_string(),
            WovenWidths {
                observe: 4,
                control_in: 2,
                control_out: 1,
            },
        );
        let totals = WovenWidths {
            observe: 4,
            control_in: 2,
            control_out: 1,
        };
        apply_woven_ports(&mut module, totals, &own, &widths_by_module);

        let inst = module.instances().next().unwrap();
        assert_eq!(
            inst.connections.iter().find(|(p, _)| p == "observe_port").unwrap().1,
            Expr::PartSelect(Box::new(Expr::Ident("observe_port_inst".to_string())), 3, 0)
        );
        assert_eq!(
            inst.connections.iter().find(|(p, _)| p == "control_port_in").unwrap().1,
            Expr::PartSelect(Box::new(Expr::Ident("control_port_in_inst".to_string())), 1, 0)
        );
        assert_eq!(
            inst.connections.iter().find(|(p, _)| p == "control_port_out").unwrap().1,
            Expr::PartSelect(Box::new(Expr::Ident("control_port_out_inst".to_string())), 0, 0)
        );

        let assigns: Vec<&Assign> = module
            .items
            .iter()
            .filter_map(|i| match i {
                Item::Assign(a) => Some(a),
                _ => None,
            })
            .collect();
        // No int half exists, so each port aliases straight to its `_inst` bus.
        assert!(assigns
            .iter()
            .any(|a| a.lhs == Expr::Ident("observe_port".to_string()) && a.rhs == Expr::Ident("observe_port_inst".to_string())));
        assert!(module.ports.contains(&"observe_port".to_string()));
    }

    #[test]
    fn stage2_concatenates_int_and_inst_halves_when_both_are_present() {
        let src = "module Top(clk);\ninput clk;\nLeaf u0 ( .a(clk) );\nendmodule\n";
        let mut module = parse_module(src).unwrap();
        let own = Stage1Result {
            module: module.clone(),
            drivers: vec![],
            loads: vec![],
            observe_taps: vec![("clk".to_string(), 0, 0)],
        };
        let mut widths_by_module = HashMap::new();
        widths_by_module.insert(
            "Leaf".to_string(),
            WovenWidths {
                observe: 4,
                control_in: 0,
                control_out: 0,
            },
        );
        let totals = WovenWidths {
            observe: 5,
            control_in: 0,
            control_out: 0,
        };
        apply_woven_ports(&mut module, totals, &own, &widths_by_module);

        let assign = module
            .items
            .iter()
            .find_map(|i| match i {
                Item::Assign(a) if a.lhs == Expr::Ident("observe_port".to_string()) => Some(a),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            assign.rhs,
            Expr::Concat(vec![Expr::Ident("observe_port_int".to_string()), Expr::Ident("observe_port_inst".to_string())])
        );
    }
}
