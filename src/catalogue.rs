//! Tree-shaped catalogues: nested mappings whose leaves are `[msb, lsb]`
//! ranges (`spec.md` §3, design note §9).
//!
//! Grounded in the schema-tree style of the teacher's block/record
//! definitions: a tagged variant replaces the source's dynamic
//! "is it a list or a dict?" runtime check with exhaustive matching.

use std::collections::HashMap;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// `[msb, lsb]`, matching the wire/JSON shape of `spec.md` §6.
pub type BitRange = [u32; 2];

/// A node of a hierarchical catalogue: either a signal/instance-keyed
/// branch, or a leaf value. Serializes untagged, so on the wire a branch is
/// a nested JSON object and a leaf is whatever `L` serializes to (`spec.md`
/// §4.6/§6 interface JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Catalogue<L> {
    Branch(HashMap<String, Catalogue<L>>),
    Leaf(L),
}

impl<L> Catalogue<L> {
    pub fn empty_branch() -> Self {
        Catalogue::Branch(HashMap::new())
    }

    /// Looks up a dot-hierarchy path (already split into segments).
    pub fn get(&self, path: &[&str]) -> Option<&L> {
        let mut node = self;
        for segment in path {
            match node {
                Catalogue::Branch(map) => node = map.get(*segment)?,
                Catalogue::Leaf(_) => return None,
            }
        }
        match node {
            Catalogue::Leaf(v) => Some(v),
            Catalogue::Branch(_) => None,
        }
    }

    /// Inserts a leaf at `path`, creating intermediate branches as needed.
    /// Panics if a path segment already names a leaf (programmer error:
    /// catalogue construction must never revisit a signal name).
    pub fn insert(&mut self, path: &[&str], leaf: L) {
        assert!(!path.is_empty(), "cannot insert at an empty path");
        let mut node = self;
        for segment in &path[..path.len() - 1] {
            let map = match node {
                Catalogue::Branch(map) => map,
                Catalogue::Leaf(_) => panic!("path crosses an existing leaf"),
            };
            node = map
                .entry((*segment).to_string())
                .or_insert_with(Catalogue::empty_branch);
        }
        let map = match node {
            Catalogue::Branch(map) => map,
            Catalogue::Leaf(_) => panic!("path crosses an existing leaf"),
        };
        map.insert(path[path.len() - 1].to_string(), Catalogue::Leaf(leaf));
    }

    /// Visits every leaf with its full dot-hierarchy path.
    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&[&'a str], &'a L)) {
        fn walk<'a, L>(node: &'a Catalogue<L>, prefix: &mut Vec<&'a str>, f: &mut impl FnMut(&[&'a str], &'a L)) {
            match node {
                Catalogue::Leaf(v) => f(prefix, v),
                Catalogue::Branch(map) => {
                    for (key, child) in map {
                        prefix.push(key);
                        walk(child, prefix, f);
                        prefix.pop();
                    }
                }
            }
        }
        let mut prefix = Vec::new();
        walk(self, &mut prefix, f);
    }
}

impl Catalogue<BitRange> {
    /// Checks the contiguous, non-overlapping `[0, W-1]` band invariant of
    /// `spec.md` §8 for the ranges directly under this node's subtree.
    pub fn is_contiguous_band(&self) -> bool {
        let mut ranges = Vec::new();
        self.for_each_leaf(&mut |_path, range| ranges.push(*range));
        if ranges.is_empty() {
            return true;
        }
        ranges.sort_by_key(|r| r[1]);
        let mut expected_lsb = 0u32;
        for [msb, lsb] in ranges {
            if lsb != expected_lsb || msb < lsb {
                return false;
            }
            expected_lsb = msb + 1;
        }
        true
    }

    /// Width of the contiguous band covered by this subtree.
    pub fn width(&self) -> u32 {
        let mut max_msb = None;
        self.for_each_leaf(&mut |_path, range| {
            max_msb = Some(max_msb.map_or(range[0], |m: u32| m.max(range[0])));
        });
        max_msb.map_or(0, |m| m + 1)
    }
}

/// Labels a controllability-catalogue leaf as `signal` or `clock`
/// (`spec.md` §3: "control-type catalogue").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Signal = 0,
    Clock = 1,
}

impl ControlType {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlType::Signal => "signal",
            ControlType::Clock => "clock",
        }
    }
}

pub type SignalCatalogue = Catalogue<BitRange>;
pub type TypeCatalogue = Catalogue<ControlType>;

/// Resolves a dotted hierarchical variable name (e.g. `TOP.inst1.sig`) to
/// its `[msb, lsb]` entry in a signal catalogue.
pub fn resolve<'a>(catalogue: &'a SignalCatalogue, dotted_name: &str) -> Option<&'a BitRange> {
    let path: Vec<&str> = dotted_name.split('.').collect();
    catalogue.get(&path)
}
