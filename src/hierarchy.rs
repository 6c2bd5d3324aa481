//! Instance tree construction and signal catalogue assignment
//! (`spec.md` §4.2, §9 design note).
//!
//! Grounded in `ASAPInsertion.InstantiationTree`, generalized from mutable
//! dict nodes keyed by `(instance_name, module_name)` tuples to an owned
//! tree of `InstanceNode`, with module definitions living once in a
//! registry keyed by name.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::catalogue::{ControlType, SignalCatalogue, TypeCatalogue};
use crate::error::{AsapError, Result};
use crate::pragma::{FilePragmas, PragmaControlType};
use crate::rtl::{Decl, Module};

/// A module-name-keyed registry of parsed module ASTs.
pub type ModuleRegistry = HashMap<String, Module>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceNode {
    pub name: String,
    pub module: String,
    pub children: Vec<InstanceNode>,
}

/// Builds the instance tree rooted at `("TOP", top_module)`
/// (`spec.md` §4.2). Fails with `AsapError::Hierarchy` on a missing module
/// or an instantiation cycle.
pub fn build_instance_tree(registry: &ModuleRegistry, top_module: &str) -> Result<InstanceNode> {
    let mut stack = HashSet::new();
    let root = build_node("TOP", top_module, registry, &mut stack)?;
    Ok(root)
}

fn build_node(
    instance_name: &str,
    module_name: &str,
    registry: &ModuleRegistry,
    stack: &mut HashSet<String>,
) -> Result<InstanceNode> {
    if !stack.insert(module_name.to_string()) {
        return Err(AsapError::Hierarchy {
            reason: format!("instantiation cycle detected at module `{module_name}`"),
        });
    }
    let module = registry.get(module_name).ok_or_else(|| AsapError::Hierarchy {
        reason: format!("module `{module_name}` is not defined in any parsed file"),
    })?;

    let mut children = Vec::new();
    for inst in module.instances() {
        let child = build_node(&inst.name, &inst.module, registry, stack)?;
        children.push(child);
    }

    stack.remove(module_name);
    debug!(module = %module_name, children = children.len(), "built instance node");
    Ok(InstanceNode {
        name: instance_name.to_string(),
        module: module_name.to_string(),
        children,
    })
}

/// The per-instance declarations this module's pragmas name as observed or
/// controlled, in source order.
struct ModulePragmaDecls<'a> {
    observed: Vec<&'a Decl>,
    controlled: Vec<(&'a Decl, ControlType)>,
}

fn declared_signals<'a>(module: &'a Module, pragmas: &FilePragmas) -> ModulePragmaDecls<'a> {
    let mut observed = Vec::new();
    let mut controlled = Vec::new();
    for (decl, line) in module.decls() {
        if let Some(pragma) = pragmas.get(&line) {
            if pragma.observe.is_some() {
                observed.push(decl);
            }
            if let Some((kind, _)) = pragma.control {
                let control_type = match kind {
                    PragmaControlType::Signal => ControlType::Signal,
                    PragmaControlType::Clock => ControlType::Clock,
                };
                controlled.push((decl, control_type));
            }
        }
    }
    ModulePragmaDecls { observed, controlled }
}

/// Depth-first, post-order signal catalogue assignment (`spec.md` §4.2):
/// a child's bit window is a contiguous range assigned before this
/// instance's own declarations are appended.
pub fn build_catalogues(
    root: &InstanceNode,
    registry: &ModuleRegistry,
    pragmas_by_file: &HashMap<String, FilePragmas>,
    module_files: &HashMap<String, String>,
) -> Result<(SignalCatalogue, SignalCatalogue, TypeCatalogue)> {
    let mut observe = SignalCatalogue::empty_branch();
    let mut control = SignalCatalogue::empty_branch();
    let mut control_types = TypeCatalogue::empty_branch();
    let mut observe_cursor = 0u32;
    let mut control_cursor = 0u32;
    walk(
        root,
        registry,
        pragmas_by_file,
        module_files,
        &mut vec![],
        &mut observe,
        &mut control,
        &mut control_types,
        &mut observe_cursor,
        &mut control_cursor,
    )?;
    Ok((observe, control, control_types))
}

#[allow(clippy::too_many_arguments)]
fn walk(
    node: &InstanceNode,
    registry: &ModuleRegistry,
    pragmas_by_file: &HashMap<String, FilePragmas>,
    module_files: &HashMap<String, String>,
    path: &mut Vec<String>,
    observe: &mut SignalCatalogue,
    control: &mut SignalCatalogue,
    control_types: &mut TypeCatalogue,
    observe_cursor: &mut u32,
    control_cursor: &mut u32,
) -> Result<()> {
    path.push(node.name.clone());

    for child in &node.children {
        walk(
            child,
            registry,
            pragmas_by_file,
            module_files,
            path,
            observe,
            control,
            control_types,
            observe_cursor,
            control_cursor,
        )?;
    }

    let module = registry.get(&node.module).ok_or_else(|| AsapError::Hierarchy {
        reason: format!("module `{}` is not defined in any parsed file", node.module),
    })?;
    let empty = FilePragmas::new();
    let pragmas = module_files
        .get(&node.module)
        .and_then(|file| pragmas_by_file.get(file))
        .unwrap_or(&empty);
    let decls = declared_signals(module, pragmas);

    for decl in decls.observed {
        let width = decl.width();
        let mut leaf_path = path.clone();
        leaf_path.push(decl.name().to_string());
        let path_refs: Vec<&str> = leaf_path.iter().map(String::as_str).collect();
        observe.insert(&path_refs, [*observe_cursor + width - 1, *observe_cursor]);
        *observe_cursor += width;
    }
    for (decl, control_type) in decls.controlled {
        let width = decl.width();
        let mut leaf_path = path.clone();
        leaf_path.push(decl.name().to_string());
        let path_refs: Vec<&str> = leaf_path.iter().map(String::as_str).collect();
        control.insert(&path_refs, [*control_cursor + width - 1, *control_cursor]);
        control_types.insert(&path_refs, control_type);
        *control_cursor += width;
    }

    path.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtl::parse_module;

    fn registry(modules: &[&str]) -> ModuleRegistry {
        modules
            .iter()
            .map(|src| {
                let m = parse_module(src).unwrap();
                (m.name.clone(), m)
            })
            .collect()
    }

    #[test]
    fn builds_tree_with_nested_instance() {
        let reg = registry(&[
            "module Leaf(a);\ninput a;\nendmodule\n",
            "module Top(clk);\ninput clk;\nLeaf u0 ( .a(clk) );\nendmodule\n",
        ]);
        let tree = build_instance_tree(&reg, "Top").unwrap();
        assert_eq!(tree.name, "TOP");
        assert_eq!(tree.module, "Top");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].module, "Leaf");
    }

    #[test]
    fn missing_module_is_a_hierarchy_error() {
        let reg = registry(&["module Top(clk);\ninput clk;\nMissing u0 ( .a(clk) );\nendmodule\n"]);
        assert!(build_instance_tree(&reg, "Top").is_err());
    }

    #[test]
    fn self_instantiation_cycle_is_a_hierarchy_error() {
        let reg = registry(&["module Top(clk);\ninput clk;\nTop u0 ( .a(clk) );\nendmodule\n"]);
        assert!(build_instance_tree(&reg, "Top").is_err());
    }

    #[test]
    fn catalogue_assigns_contiguous_child_then_parent_ranges() {
        let reg = registry(&[
            "module Leaf(a);\ninput [1:0] a;\nendmodule\n",
            "module Top(clk, b);\ninput clk;\ninput [1:0] b;\nLeaf u0 ( .a(clk) );\nendmodule\n",
        ]);
        let tree = build_instance_tree(&reg, "Top").unwrap();

        let mut pragmas_by_file = HashMap::new();
        let mut leaf_pragmas = FilePragmas::new();
        leaf_pragmas.insert(2, crate::pragma::Pragma {
            observe: Some([1, 0]),
            control: None,
        });
        pragmas_by_file.insert("leaf.v".to_string(), leaf_pragmas);

        let mut top_pragmas = FilePragmas::new();
        top_pragmas.insert(3, crate::pragma::Pragma {
            observe: Some([1, 0]),
            control: None,
        });
        pragmas_by_file.insert("top.v".to_string(), top_pragmas);

        let mut module_files = HashMap::new();
        module_files.insert("Leaf".to_string(), "leaf.v".to_string());
        module_files.insert("Top".to_string(), "top.v".to_string());

        let (observe, _control, _types) = build_catalogues(&tree, &reg, &pragmas_by_file, &module_files).unwrap();
        assert_eq!(observe.get(&["TOP", "u0", "a"]), Some(&[1, 0]));
        assert_eq!(observe.get(&["TOP", "b"]), Some(&[3, 2]));
    }
}
