//! Parses the minimal Verilog subset `rtl::ast` models: module header,
//! `input`/`output`/`output reg`/`reg`/`wire` declarations, continuous
//! assignments, and module instantiations.
//!
//! Grounded in the line-oriented combinator style of the other example
//! pack's RTL/LUT config parser (a `nom`-based reader for a similarly
//! small hardware description subset): statements are split on `;` and
//! each kind is recognized by its leading keyword, with an opaque `Raw`
//! fallback preserving anything else verbatim so unmodified constructs
//! round-trip exactly.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{map_res, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};

use super::ast::{Assign, Decl, Expr, Instance, Item, Module};
use crate::error::{AsapError, Result};

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn uint(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse)(input)
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// `[msb:lsb]`, or absent for an implicit 1-bit signal.
fn width(input: &str) -> IResult<&str, (u32, u32)> {
    let bracketed = delimited(
        char('['),
        |i| {
            let (i, msb) = uint(i)?;
            let (i, _) = char(':')(i)?;
            let (i, lsb) = uint(i)?;
            Ok((i, (msb, lsb)))
        },
        char(']'),
    );
    let (input, w) = opt(ws(bracketed))(input)?;
    Ok((input, w.unwrap_or((0, 0))))
}

/// Splits top-level comma-separated fields, respecting `()`/`{}` nesting.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | '}' => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        fields.push(current.trim().to_string());
    }
    fields
}

/// Parses a single `Expr`: a concatenation `{a, b}`, a part-select
/// `name[msb:lsb]`, a bare identifier, or an opaque fallback.
fn parse_expr(text: &str) -> Expr {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        let items = split_top_level(inner, ',').into_iter().map(|f| parse_expr(&f)).collect();
        return Expr::Concat(items);
    }
    if let Ok((rest, name)) = identifier(text) {
        if rest.trim().is_empty() {
            return Expr::Ident(name.to_string());
        }
        if let Ok((rest2, (msb, lsb))) = width(rest) {
            if rest2.trim().is_empty() {
                return Expr::PartSelect(Box::new(Expr::Ident(name.to_string())), msb, lsb);
            }
        }
    }
    Expr::Other(text.to_string())
}

fn decl_keyword(input: &str) -> IResult<&str, &str> {
    alt((
        tag("output reg"),
        tag("output"),
        tag("input"),
        tag("reg"),
        tag("wire"),
    ))(input)
}

fn make_decl(keyword: &str, name: &str, msb: u32, lsb: u32) -> Decl {
    let name = name.to_string();
    match keyword {
        "output reg" => Decl::OutputReg { name, msb, lsb },
        "output" => Decl::Output { name, msb, lsb },
        "input" => Decl::Input { name, msb, lsb },
        "reg" => Decl::Reg { name, msb, lsb },
        "wire" => Decl::Wire { name, msb, lsb },
        _ => unreachable!("decl_keyword only matches the five arms above"),
    }
}

fn parse_decl_statement(stmt: &str, line: usize, out: &mut Vec<Item>) -> Result<bool> {
    let Ok((rest, keyword)) = ws(decl_keyword)(stmt) else {
        return Ok(false);
    };
    let (rest, (msb, lsb)) = width(rest).map_err(|e| AsapError::ParseSyntax {
        context: format!("declaration at line {line}"),
        reason: e.to_string(),
    })?;
    for name in split_top_level(rest, ',') {
        if name.is_empty() {
            continue;
        }
        out.push(Item::Decl(make_decl(keyword, &name, msb, lsb), line));
    }
    Ok(true)
}

fn parse_assign_statement(stmt: &str, line: usize) -> Option<Assign> {
    let rest = ws(tag::<_, _, nom::error::Error<&str>>("assign"))(stmt).ok()?.0;
    let eq_pos = rest.find('=')?;
    let lhs = parse_expr(&rest[..eq_pos]);
    let rhs = parse_expr(&rest[eq_pos + 1..]);
    Some(Assign {
        lhs,
        rhs,
        source_line: line,
    })
}

/// An instance statement: `<module> <name> ( .port(expr), ... )`. The
/// module-name token must not itself be a reserved keyword the decl/assign
/// parsers already claim.
fn parse_instance_statement(stmt: &str, line: usize) -> Option<Instance> {
    let (rest, module) = identifier(stmt.trim_start()).ok()?;
    if matches!(module, "input" | "output" | "reg" | "wire" | "assign" | "module" | "endmodule") {
        return None;
    }
    let rest = multispace0::<_, nom::error::Error<&str>>(rest).ok()?.1;
    let (rest, name) = identifier(rest).ok()?;
    let rest = ws(char::<_, nom::error::Error<&str>>('('))(rest).ok()?.1;
    let inner = rest.strip_suffix(')')?;
    let mut connections = Vec::new();
    for field in split_top_level(inner, ',') {
        let field = field.trim();
        let field = field.strip_prefix('.')?;
        let open = field.find('(')?;
        let port = field[..open].trim().to_string();
        let expr_text = field[open + 1..].strip_suffix(')').unwrap_or(&field[open + 1..]);
        connections.push((port, parse_expr(expr_text)));
    }
    Some(Instance {
        module: module.to_string(),
        name: name.to_string(),
        connections,
        source_line: line,
    })
}

fn classify_statement(stmt: &str, line: usize, out: &mut Vec<Item>) -> Result<()> {
    let trimmed = stmt.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    if parse_decl_statement(trimmed, line, out)? {
        return Ok(());
    }
    if let Some(assign) = parse_assign_statement(trimmed, line) {
        out.push(Item::Assign(assign));
        return Ok(());
    }
    if let Some(instance) = parse_instance_statement(trimmed, line) {
        out.push(Item::Instance(instance));
        return Ok(());
    }
    out.push(Item::Raw(trimmed.to_string()));
    Ok(())
}

fn strip_line_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn module_header(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    let (input, _) = ws(tag("module"))(input)?;
    let (input, name) = ws(identifier)(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, ports_text) = is_not(")")(input)?;
    let (input, _) = char(')')(input)?;
    let (input, _) = ws(char(';'))(input)?;
    let ports = ports_text
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    Ok((input, (name, ports)))
}

/// Parses one `module ... endmodule` block.
pub fn parse_module(text: &str) -> Result<Module> {
    let header_end = text.find("endmodule").ok_or_else(|| AsapError::ParseSyntax {
        context: "RTL module".to_string(),
        reason: "missing `endmodule`".to_string(),
    })?;
    let body_text = &text[..header_end];

    let without_comments: String = body_text
        .lines()
        .map(|l| format!("{}\n", strip_line_comment(l)))
        .collect();

    let (after_header, (name, ports)) =
        module_header(&without_comments).map_err(|e| AsapError::ParseSyntax {
            context: "RTL module header".to_string(),
            reason: e.to_string(),
        })?;

    let header_lines = without_comments.len() - after_header.len();
    let header_line_count = without_comments[..header_lines].matches('\n').count();

    let mut items = Vec::new();
    let mut line = header_line_count + 1;
    let mut stmt_start_line = line;
    let mut buffer = String::new();
    for ch in after_header.chars() {
        if ch == '\n' {
            line += 1;
        }
        buffer.push(ch);
        if ch == ';' {
            classify_statement(&buffer, stmt_start_line, &mut items)?;
            buffer.clear();
            stmt_start_line = line;
        }
    }
    if !buffer.trim().is_empty() {
        classify_statement(&buffer, stmt_start_line, &mut items)?;
    }

    Ok(Module {
        name: name.to_string(),
        ports: ports.into_iter().map(str::to_string).collect(),
        items,
    })
}

/// Parses every `module ... endmodule` block found in `text`, in order.
pub fn parse_modules(text: &str) -> Result<Vec<Module>> {
    let mut modules = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("module") {
        let slice = &rest[start..];
        let module = parse_module(slice)?;
        let end = slice.find("endmodule").unwrap() + "endmodule".len();
        modules.push(module);
        rest = &slice[end..];
    }
    Ok(modules)
}
