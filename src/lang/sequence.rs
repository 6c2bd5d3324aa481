//! The sequence description language (`spec.md` §4.1, §6): a file is a
//! list of brace-delimited, named, ordered pattern lists; a pattern is
//! either `()` (pass) or `(var op const)`.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{map_res, recognize, value},
    multi::{many0, many1},
    sequence::{delimited, pair, tuple},
    IResult,
};

use super::ast::{Comparison, Const, Pattern, Sequence, SequenceList, Variable};
use crate::error::{AsapError, Result};

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn hier_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(identifier, many0(pair(char('.'), identifier))))(input)
}

fn uint(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse)(input)
}

fn part_select(input: &str) -> IResult<&str, (u32, u32)> {
    delimited(char('['), separated_pair_u32, char(']'))(input)
}

fn separated_pair_u32(input: &str) -> IResult<&str, (u32, u32)> {
    let (input, msb) = uint(input)?;
    let (input, _) = char(':')(input)?;
    let (input, lsb) = uint(input)?;
    Ok((input, (msb, lsb)))
}

fn variable(input: &str) -> IResult<&str, Variable> {
    let (input, name) = hier_name(input)?;
    let (input, (msb, lsb)) = part_select(input)?;
    Ok((
        input,
        Variable {
            name: name.to_string(),
            msb,
            lsb,
        },
    ))
}

fn comparison(input: &str) -> IResult<&str, Comparison> {
    alt((
        value(Comparison::Eq, tag("==")),
        value(Comparison::Gt, tag(">")),
        value(Comparison::Lt, tag("<")),
    ))(input)
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

fn pass_pattern(input: &str) -> IResult<&str, Pattern> {
    value(Pattern::Pass, tuple((char('('), multispace0, char(')'))))(input)
}

fn compare_pattern(input: &str) -> IResult<&str, Pattern> {
    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, var) = variable(input)?;
    let (input, _) = multispace0(input)?;
    let (input, op) = comparison(input)?;
    let (input, _) = multispace0(input)?;
    let (input, constant) = constant(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, Pattern::Compare { var, op, constant }))
}

fn pattern(input: &str) -> IResult<&str, Pattern> {
    ws(alt((pass_pattern, compare_pattern)))(input)
}

fn sequence(input: &str) -> IResult<&str, Sequence> {
    let (input, name) = ws(identifier)(input)?;
    let (input, _) = ws(char('{'))(input)?;
    let (input, patterns) = many0(pattern)(input)?;
    let (input, _) = ws(char('}'))(input)?;
    Ok((
        input,
        Sequence {
            name: name.to_string(),
            patterns,
        },
    ))
}

fn sequence_list(input: &str) -> IResult<&str, SequenceList> {
    let (input, _) = multispace0(input)?;
    let (input, sequences) = many1(sequence)(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, SequenceList { sequences }))
}

pub fn parse(source: &str) -> Result<SequenceList> {
    match sequence_list(source) {
        Ok((rest, list)) if rest.trim().is_empty() => Ok(list),
        Ok((rest, _)) => Err(AsapError::ParseSyntax {
            context: "sequence program".to_string(),
            reason: format!("unexpected trailing input near `{}`", preview(rest)),
        }),
        Err(e) => Err(AsapError::ParseSyntax {
            context: "sequence program".to_string(),
            reason: e.to_string(),
        }),
    }
}

fn preview(s: &str) -> &str {
    let end = s.char_indices().nth(40).map(|(i, _)| i).unwrap_or(s.len());
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequence_parses_as_single_pass_pattern() {
        // The grammar's sequence header is a bare identifier directly
        // followed by `{` (`spec.md` §4.1); no `seq` keyword.
        let list = parse("s0 { () }").unwrap();
        assert_eq!(list.sequences.len(), 1);
        assert_eq!(list.sequences[0].name, "s0");
        assert_eq!(list.sequences[0].patterns, vec![Pattern::Pass]);
    }

    #[test]
    fn two_cycle_equality_sequence() {
        let src = "s0 { (TOP.A[1:0] == 2'b10) (TOP.A[3:2] == 2'b01) }";
        let list = parse(src).unwrap();
        let seq = &list.sequences[0];
        assert_eq!(seq.patterns.len(), 2);
        match &seq.patterns[0] {
            Pattern::Compare { var, op, constant } => {
                assert_eq!(var.name, "TOP.A");
                assert_eq!(*op, Comparison::Eq);
                assert_eq!(constant.bits, "10");
            }
            Pattern::Pass => panic!("expected compare pattern"),
        }
    }

    #[test]
    fn multiple_sequences_in_one_file() {
        let src = "s0 { () } s1 { (a.b[0:0] > 1'b1) }";
        let list = parse(src).unwrap();
        assert_eq!(list.sequences.len(), 2);
        assert_eq!(list.sequences[1].name, "s1");
    }

    #[test]
    fn malformed_pattern_fails() {
        assert!(parse("s0 { (TOP.A[1:0] === 2'b10) }").is_err());
    }
}
