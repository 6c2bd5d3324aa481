//! POS (product-of-sums) expression parsing and normalization
//! (`spec.md` §3, §4.1, §9).
//!
//! Identity is "equal as a multiset of term strings, and each term is an
//! unordered conjunction" (`spec.md` §9): two expressions sharing the same
//! terms up to atom reordering within a term must hash identically so the
//! SRU compiler's PLA-sharing step (`spec.md` §4.5 scenario 3) does not
//! accidentally allocate two PLAs for one logical trigger function.

use std::collections::BTreeSet;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alphanumeric1, char, multispace0},
    combinator::{opt, recognize},
    multi::separated_list1,
    sequence::{delimited, pair},
    IResult,
};

use crate::error::{AsapError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub name: String,
    pub complement: bool,
}

/// A parsed POS expression: an ordered list of terms (each an ordered list
/// of atoms), preserving source order so atom indices can be assigned
/// deterministically (first-seen, left-to-right).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosExpr {
    pub terms: Vec<Vec<Atom>>,
}

impl PosExpr {
    /// The canonical identity used for PLA deduplication: each term
    /// becomes a sorted, dot-joined string (so atom order within a term
    /// does not matter), and the whole expression becomes the set of those
    /// strings (so duplicate terms collapse and term order does not
    /// matter).
    pub fn identity_key(&self) -> BTreeSet<String> {
        self.terms
            .iter()
            .map(|term| {
                let mut rendered: Vec<String> = term
                    .iter()
                    .map(|a| {
                        if a.complement {
                            format!("{}'", a.name)
                        } else {
                            a.name.clone()
                        }
                    })
                    .collect();
                rendered.sort();
                rendered.join(".")
            })
            .collect()
    }

    /// Distinct atom names in first-seen, left-to-right order. This fixes
    /// the "expression-local atom index" `spec.md` §4.5 requires for
    /// TRIG_SEL/MINTERM_SEL without further specifying an order.
    pub fn atoms_in_order(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for term in &self.terms {
            for atom in term {
                if !seen.contains(&atom.name) {
                    seen.push(atom.name.clone());
                }
            }
        }
        seen
    }

    /// Evaluates the expression (OR of AND-terms) given an assignment of
    /// atom name to boolean value.
    pub fn eval(&self, assignment: &std::collections::HashMap<&str, bool>) -> bool {
        self.terms.iter().any(|term| {
            term.iter().all(|atom| {
                let value = assignment.get(atom.name.as_str()).copied().unwrap_or(false);
                value != atom.complement
            })
        })
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((nom::character::complete::alpha1, tag("_"))),
        nom::multi::many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn atom(input: &str) -> IResult<&str, Atom> {
    let (input, _) = multispace0(input)?;
    let (input, name) = identifier(input)?;
    let (input, complement) = opt(char('\''))(input)?;
    Ok((
        input,
        Atom {
            name: name.to_string(),
            complement: complement.is_some(),
        },
    ))
}

fn term(input: &str) -> IResult<&str, Vec<Atom>> {
    separated_list1(delimited(multispace0, char('.'), multispace0), atom)(input)
}

fn expr(input: &str) -> IResult<&str, Vec<Vec<Atom>>> {
    let (input, _) = multispace0(input)?;
    let (input, terms) = separated_list1(delimited(multispace0, char('+'), multispace0), term)(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, terms))
}

pub fn parse_pos_expr(input: &str) -> Result<PosExpr> {
    match expr(input) {
        Ok((rest, terms)) if rest.trim().is_empty() => Ok(PosExpr { terms }),
        Ok((rest, _)) => Err(AsapError::ParseSyntax {
            context: format!("POS expression `{input}`"),
            reason: format!("unexpected trailing input `{rest}`"),
        }),
        Err(e) => Err(AsapError::ParseSyntax {
            context: format!("POS expression `{input}`"),
            reason: e.to_string(),
        }),
    }
}
