//! The signal-rewrite description language (`spec.md` §3, §4.1, §6):
//! `signal { name = ...; trigger = (...); constant = ...; }` and
//! `clock { name = ...; trigger = (...); }` blocks.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{map_res, recognize},
    multi::many0,
    sequence::{delimited, pair},
    IResult,
};

use super::ast::{Const, Variable};
use super::pos::{parse_pos_expr, PosExpr};
use crate::error::{AsapError, Result};

/// A data-signal rewrite node: override `signal` with `constant` whenever
/// `trigger` is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalNode {
    pub signal: Variable,
    pub trigger: PosExpr,
    pub constant: Const,
}

/// A clock rewrite node: gate `signal` (single-bit, `spec.md` §3 invariant)
/// whenever `trigger` is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockNode {
    pub signal: Variable,
    pub trigger: PosExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlNode {
    Signal(SignalNode),
    Clock(ClockNode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlNodeList {
    pub nodes: Vec<ControlNode>,
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_"))))),
    )(input)
}

fn hier_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(identifier, many0(pair(char('.'), identifier))))(input)
}

fn uint(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse)(input)
}

fn variable(input: &str) -> IResult<&str, Variable> {
    let (input, name) = hier_name(input)?;
    let (input, _) = char('[')(input)?;
    let (input, msb) = uint(input)?;
    let (input, _) = char(':')(input)?;
    let (input, lsb) = uint(input)?;
    let (input, _) = char(']')(input)?;
    Ok((
        input,
        Variable {
            name: name.to_string(),
            msb,
            lsb,
        },
    ))
}

fn binary_digits(input: &str) -> IResult<&str, &str> {
    nom::bytes::complete::is_a("01")(input)
}

fn constant(input: &str) -> IResult<&str, Const> {
    let (input, width) = uint(input)?;
    let (input, _) = char('\'')(input)?;
    let (input, _) = alt((char('b'), char('B')))(input)?;
    let (input, bits) = binary_digits(input)?;
    Ok((
        input,
        Const {
            width,
            bits: bits.to_string(),
        },
    ))
}

/// `name = <var>` field.
fn name_field(input: &str) -> IResult<&str, Variable> {
    let (input, _) = ws(tag("name"))(input)?;
    let (input, _) = ws(char('='))(input)?;
    variable(input)
}

/// `trigger = (<POS expr text>)`, returned unparsed (the inner text) so the
/// caller can report POS-expression errors with the right context string.
fn trigger_field(input: &str) -> IResult<&str, &str> {
    let (input, _) = ws(tag("trigger"))(input)?;
    let (input, _) = ws(char('='))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, text) = nom::bytes::complete::take_until(")")(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, text))
}

fn constant_field(input: &str) -> IResult<&str, Const> {
    let (input, _) = ws(tag("constant"))(input)?;
    let (input, _) = ws(char('='))(input)?;
    constant(input)
}

fn signal_block(input: &str) -> IResult<&str, (Variable, &str, Const)> {
    let (input, _) = ws(tag("signal"))(input)?;
    let (input, _) = ws(char('{'))(input)?;
    let (input, name) = ws(name_field)(input)?;
    let (input, trigger) = ws(trigger_field)(input)?;
    let (input, constant) = ws(constant_field)(input)?;
    let (input, _) = ws(char('}'))(input)?;
    Ok((input, (name, trigger, constant)))
}

fn clock_block(input: &str) -> IResult<&str, (Variable, &str)> {
    let (input, _) = ws(tag("clock"))(input)?;
    let (input, _) = ws(char('{'))(input)?;
    let (input, name) = ws(name_field)(input)?;
    let (input, trigger) = ws(trigger_field)(input)?;
    let (input, _) = ws(char('}'))(input)?;
    Ok((input, (name, trigger)))
}

enum RawBlock<'a> {
    Signal(Variable, &'a str, Const),
    Clock(Variable, &'a str),
}

fn block(input: &str) -> IResult<&str, RawBlock<'_>> {
    alt((
        nom::combinator::map(signal_block, |(n, t, c)| RawBlock::Signal(n, t, c)),
        nom::combinator::map(clock_block, |(n, t)| RawBlock::Clock(n, t)),
    ))(input)
}

fn blocks(input: &str) -> IResult<&str, Vec<RawBlock<'_>>> {
    let (input, _) = multispace0(input)?;
    let (input, items) = many0(ws(block))(input)?;
    Ok((input, items))
}

pub fn parse(source: &str) -> Result<ControlNodeList> {
    let (rest, raw_blocks) = blocks(source).map_err(|e| AsapError::ParseSyntax {
        context: "rewrite program".to_string(),
        reason: e.to_string(),
    })?;
    if !rest.trim().is_empty() {
        return Err(AsapError::ParseSyntax {
            context: "rewrite program".to_string(),
            reason: format!("unexpected trailing input near `{}`", &rest[..rest.len().min(40)]),
        });
    }
    let mut nodes = Vec::with_capacity(raw_blocks.len());
    for raw in raw_blocks {
        let node = match raw {
            RawBlock::Signal(signal, trigger_text, constant) => {
                let trigger = parse_pos_expr(trigger_text)?;
                ControlNode::Signal(SignalNode {
                    signal,
                    trigger,
                    constant,
                })
            }
            RawBlock::Clock(signal, trigger_text) => {
                let trigger = parse_pos_expr(trigger_text)?;
                ControlNode::Clock(ClockNode { signal, trigger })
            }
        };
        nodes.push(node);
    }
    Ok(ControlNodeList { nodes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signal_block() {
        let src = "signal { name = TOP.A[1:0] trigger = (s0.s1') constant = 2'b01 }";
        let list = parse(src).unwrap();
        assert_eq!(list.nodes.len(), 1);
        match &list.nodes[0] {
            ControlNode::Signal(s) => {
                assert_eq!(s.signal.name, "TOP.A");
                assert_eq!(s.constant.bits, "01");
            }
            ControlNode::Clock(_) => panic!("expected signal node"),
        }
    }

    #[test]
    fn parses_clock_block_without_constant() {
        let src = "clock { name = TOP.clk[0:0] trigger = (s0) }";
        let list = parse(src).unwrap();
        match &list.nodes[0] {
            ControlNode::Clock(c) => assert_eq!(c.signal.name, "TOP.clk"),
            ControlNode::Signal(_) => panic!("expected clock node"),
        }
    }

    #[test]
    fn parses_multiple_blocks() {
        let src = "signal { name = A[0:0] trigger = (s0) constant = 1'b1 } \
                   clock { name = B[0:0] trigger = (s1) }";
        let list = parse(src).unwrap();
        assert_eq!(list.nodes.len(), 2);
    }

    #[test]
    fn clock_block_rejects_constant_field() {
        let src = "clock { name = B[0:0] trigger = (s1) constant = 1'b0 }";
        assert!(parse(src).is_err());
    }
}
