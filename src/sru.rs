//! SRU (signal rewrite unit) compiler (`spec.md` §4.5 C5).
//!
//! Grounded in `ASAPCompiler.ASAPSruCompiler`: allocates one PLA per
//! distinct trigger expression (deduplicated via `PosExpr::identity_key`),
//! lowers each rewrite node against its PLA, and serializes the result in
//! "connection order" over the reordered controllability catalogue.

use std::collections::HashMap;

use crate::bits::BitWriter;
use crate::catalogue::{ControlType, SignalCatalogue, TypeCatalogue};
use crate::config::AsapConfig;
use crate::error::{AsapError, Result};
use crate::lang::pos::PosExpr;
use crate::lang::rewrite::{ControlNode, ControlNodeList};

#[derive(Debug, Clone, Copy)]
pub struct FieldWidths {
    pub pla_sel: u32,
    pub cntl_enb: u32,
    pub constant: u32,
    pub trig_sel: u32,
    pub minterm_sel: u32,
}

fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros()
    }
}

pub fn field_widths(config: &AsapConfig) -> FieldWidths {
    let p = config.sru_num_pla;
    let seg = config.sru_segment_size;
    let t = config.max_triggers;
    FieldWidths {
        pla_sel: ceil_log2(p),
        cntl_enb: 1,
        constant: 1,
        trig_sel: ceil_log2(t) * seg,
        minterm_sel: 1u32 << seg,
    }
}

/// One allocated PLA: its canonical trigger expression and the atom order
/// used to place TRIG_SEL/MINTERM_SEL subfields.
#[derive(Debug, Clone)]
pub struct Pla {
    pub expr: PosExpr,
    pub atoms: Vec<String>,
}

/// Allocates one PLA per distinct trigger expression, in first-seen order
/// across the node list (`spec.md` §4.5 "PLA allocation").
pub fn allocate_plas(nodes: &ControlNodeList, max_plas: usize) -> Result<Vec<Pla>> {
    let mut plas = Vec::new();
    let mut index_by_identity: HashMap<std::collections::BTreeSet<String>, usize> = HashMap::new();

    for node in &nodes.nodes {
        let trigger = match node {
            ControlNode::Signal(s) => &s.trigger,
            ControlNode::Clock(c) => &c.trigger,
        };
        let identity = trigger.identity_key();
        index_by_identity.entry(identity).or_insert_with(|| {
            let idx = plas.len();
            plas.push(Pla {
                expr: trigger.clone(),
                atoms: trigger.atoms_in_order(),
            });
            idx
        });
    }

    if plas.len() > max_plas {
        return Err(AsapError::TooManyPLAs {
            count: plas.len(),
            max: max_plas,
        });
    }

    Ok(plas)
}

fn trig_sel(pla: &Pla, trigger_index: &HashMap<String, usize>, widths: &FieldWidths, seg: u32) -> String {
    let mut writer = BitWriter::new();
    let subfield_width = if seg == 0 { 0 } else { widths.trig_sel / seg };
    for slot in (0..seg).rev() {
        let value = pla
            .atoms
            .get(slot as usize)
            .and_then(|name| trigger_index.get(name))
            .copied()
            .unwrap_or(0) as u64;
        writer.push_bits(value, subfield_width);
    }
    writer.as_digits().to_string()
}

fn minterm_sel(pla: &Pla, seg: u32) -> String {
    let rows = 1u32 << seg;
    let mut out = String::with_capacity(rows as usize);
    for row in 0..rows {
        let mut assignment: HashMap<&str, bool> = HashMap::new();
        for (k, name) in pla.atoms.iter().enumerate() {
            if (k as u32) < seg {
                assignment.insert(name.as_str(), (row >> k) & 1 != 0);
            }
        }
        out.push(if pla.expr.eval(&assignment) { '1' } else { '0' });
    }
    out
}

/// A controllability-catalogue leaf, stamped with its PLA assignment and
/// (for data signals) bypass constant, ready for "connection order"
/// serialization. `matched` is false for a pragma-declared leaf that no
/// rewrite-program node actually targets; such a leaf must serialize fully
/// zeroed rather than defaulting to enabled (`ASAPCompiler.py:948,1061,1079`).
#[derive(Debug, Clone)]
pub struct ReorderedLeaf {
    pub path: String,
    pub lsb: u32,
    pub width: u32,
    pub control_type: ControlType,
    pub pla_index: usize,
    pub matched: bool,
    pub constant_bits: Option<String>,
}

fn dotted(path: &[&str]) -> String {
    path.join(".")
}

/// Builds the reordered catalogue: one entry per controllability-catalogue
/// leaf, joined against the rewrite program's nodes by dotted name.
pub fn reorder_catalogue(
    control_catalogue: &SignalCatalogue,
    control_types: &TypeCatalogue,
    nodes: &ControlNodeList,
    pla_index_of_identity: &HashMap<std::collections::BTreeSet<String>, usize>,
) -> Vec<ReorderedLeaf> {
    let mut by_name: HashMap<String, &ControlNode> = HashMap::new();
    for node in &nodes.nodes {
        let name = match node {
            ControlNode::Signal(s) => &s.signal.name,
            ControlNode::Clock(c) => &c.signal.name,
        };
        by_name.insert(name.clone(), node);
    }

    let mut leaves = Vec::new();
    control_catalogue.for_each_leaf(&mut |path, range| {
        let name = dotted(path);
        let control_type = control_types.get(path).copied().unwrap_or(ControlType::Signal);
        let width = range[0] - range[1] + 1;
        let (matched, pla_index, constant_bits) = match by_name.get(&name) {
            Some(ControlNode::Signal(s)) => {
                let identity = s.trigger.identity_key();
                (true, pla_index_of_identity.get(&identity).copied().unwrap_or(0), Some(s.constant.bits.clone()))
            }
            Some(ControlNode::Clock(c)) => {
                let identity = c.trigger.identity_key();
                (true, pla_index_of_identity.get(&identity).copied().unwrap_or(0), None)
            }
            None => (false, 0, None),
        };
        leaves.push(ReorderedLeaf {
            path: name,
            lsb: range[1],
            width,
            control_type,
            pla_index,
            matched,
            constant_bits,
        });
    });
    leaves.sort_by_key(|l| l.lsb);
    leaves
}

pub struct SruConfig {
    pub plas: Vec<Pla>,
    pub leaves: Vec<ReorderedLeaf>,
    pub widths: FieldWidths,
}

/// Compiles a rewrite program against a controllability catalogue and the
/// SMU trigger-index map (`spec.md` §4.5).
pub fn compile(
    nodes: &ControlNodeList,
    control_catalogue: &SignalCatalogue,
    control_types: &TypeCatalogue,
    config: &AsapConfig,
) -> Result<SruConfig> {
    for node in &nodes.nodes {
        if let ControlNode::Clock(c) = node {
            let width = c.signal.msb - c.signal.lsb + 1;
            if width != 1 {
                return Err(AsapError::PatternRange {
                    signal: c.signal.name.clone(),
                    context: "clock rewrite node".to_string(),
                    reason: format!("clock controls must be 1 bit wide, got [{}:{}]", c.signal.msb, c.signal.lsb),
                });
            }
        }
    }

    let plas = allocate_plas(nodes, config.sru_num_pla as usize)?;

    let mut pla_index_of_identity = HashMap::new();
    for (i, pla) in plas.iter().enumerate() {
        pla_index_of_identity.insert(pla.expr.identity_key(), i);
    }

    let leaves = reorder_catalogue(control_catalogue, control_types, nodes, &pla_index_of_identity);
    let widths = field_widths(config);

    Ok(SruConfig { plas, leaves, widths })
}

/// Bit-exact bitstream serialization (`spec.md` §4.5 "Bitstream ordering").
pub fn serialize(config: &SruConfig, trigger_index: &HashMap<String, usize>, seg: u32) -> String {
    let mut writer = BitWriter::new();

    for pla in &config.plas {
        writer.push_str(&trig_sel(pla, trigger_index, &config.widths, seg));
    }
    for pla in &config.plas {
        writer.push_str(&minterm_sel(pla, seg));
    }

    let (clocks, signals): (Vec<_>, Vec<_>) = config
        .leaves
        .iter()
        .partition(|l| l.control_type == ControlType::Clock);

    // Unmatched leaves (declared by a pragma but targeted by no rewrite
    // node) stay fully zeroed: PLA_SEL=0, CNTL_ENB=0, and `width`-many zero
    // CONSTANT bits so the bitstream's total width stays in sync.
    for leaf in clocks.iter().chain(signals.iter()) {
        let sel = if leaf.matched { leaf.pla_index as u64 } else { 0 };
        for _ in 0..leaf.width {
            writer.push_bits(sel, config.widths.pla_sel);
        }
    }
    for leaf in clocks.iter().chain(signals.iter()) {
        let ones = if !leaf.matched {
            0
        } else if leaf.width >= 64 {
            u64::MAX
        } else {
            (1u64 << leaf.width) - 1
        };
        writer.push_bits(ones, leaf.width);
    }
    for leaf in &signals {
        match &leaf.constant_bits {
            Some(bits) if leaf.matched => writer.push_str(bits),
            _ => writer.push_str(&"0".repeat(leaf.width as usize)),
        }
    }

    writer.into_wire_string()
}
