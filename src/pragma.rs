//! Scans RTL source lines for `#pragma observe`/`#pragma control` directives
//! (`spec.md` §4.2 C2, §6).
//!
//! Grounded in `ASAPInsertion.PragmaExtractor`: a pragma line names an
//! `observe <msb>:<lsb>`, a `control <type> <msb>:<lsb>`, or both, in either
//! order, and the extractor records one entry per source line number.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::catalogue::BitRange;
use crate::error::{AsapError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PragmaControlType {
    Signal,
    Clock,
}

impl PragmaControlType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "signal" => Some(PragmaControlType::Signal),
            "clock" => Some(PragmaControlType::Clock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pragma {
    pub observe: Option<BitRange>,
    pub control: Option<(PragmaControlType, BitRange)>,
}

fn parse_range(token: &str, file: &str, line: usize) -> Result<BitRange> {
    let mut parts = token.split(':');
    let msb = parts.next();
    let lsb = parts.next();
    match (msb, lsb, parts.next()) {
        (Some(msb), Some(lsb), None) => {
            let msb: u32 = msb.parse().map_err(|_| AsapError::PragmaSyntax {
                file: PathBuf::from(file),
                line,
                reason: format!("bit range `{token}` is not numeric"),
            })?;
            let lsb: u32 = lsb.parse().map_err(|_| AsapError::PragmaSyntax {
                file: PathBuf::from(file),
                line,
                reason: format!("bit range `{token}` is not numeric"),
            })?;
            Ok([msb, lsb])
        }
        _ => Err(AsapError::PragmaSyntax {
            file: PathBuf::from(file),
            line,
            reason: format!("expected `<msb>:<lsb>`, found `{token}`"),
        }),
    }
}

/// Parses a single line's `#pragma ...` directive, if any. Returns `Ok(None)`
/// for lines with no `#pragma` text at all.
pub fn parse_line(line: &str, file: &str, line_number: usize) -> Result<Option<Pragma>> {
    let Some(rest) = line.split_once("#pragma") else {
        return Ok(None);
    };
    let tokens: Vec<&str> = rest.1.split_whitespace().collect();

    let observe_idx = tokens.iter().position(|t| *t == "observe");
    let control_idx = tokens.iter().position(|t| *t == "control");

    if observe_idx.is_none() && control_idx.is_none() {
        return Err(AsapError::PragmaSyntax {
            file: PathBuf::from(file),
            line: line_number,
            reason: "neither 'control' nor 'observe' found in pragma".to_string(),
        });
    }

    let observe = match observe_idx {
        Some(i) => {
            let token = tokens.get(i + 1).ok_or_else(|| AsapError::PragmaSyntax {
                file: PathBuf::from(file),
                line: line_number,
                reason: "missing bit range after 'observe'".to_string(),
            })?;
            Some(parse_range(token, file, line_number)?)
        }
        None => None,
    };

    let control = match control_idx {
        Some(i) => {
            let kind_token = tokens.get(i + 1).ok_or_else(|| AsapError::PragmaSyntax {
                file: PathBuf::from(file),
                line: line_number,
                reason: "missing control type after 'control'".to_string(),
            })?;
            let kind = PragmaControlType::parse(kind_token).ok_or_else(|| AsapError::PragmaSyntax {
                file: PathBuf::from(file),
                line: line_number,
                reason: format!("unknown control type `{kind_token}`, expected signal or clock"),
            })?;
            let range_token = tokens.get(i + 2).ok_or_else(|| AsapError::PragmaSyntax {
                file: PathBuf::from(file),
                line: line_number,
                reason: "missing bit range after control type".to_string(),
            })?;
            Some((kind, parse_range(range_token, file, line_number)?))
        }
        None => None,
    };

    Ok(Some(Pragma { observe, control }))
}

/// Line-number-keyed pragma directives found in one file.
pub type FilePragmas = HashMap<usize, Pragma>;

/// Scans a file's text for pragma directives, keyed by 1-based line number.
pub fn scan_file(path: &Path, text: &str) -> Result<FilePragmas> {
    let file = path.display().to_string();
    let mut found = FilePragmas::new();
    for (idx, line) in text.lines().enumerate() {
        let line_number = idx + 1;
        if let Some(pragma) = parse_line(line, &file, line_number)? {
            found.insert(line_number, pragma);
        }
    }
    info!(file = %file, count = found.len(), "scanned pragmas");
    Ok(found)
}

/// Scans every file named in a filelist. Fails fast on the first file whose
/// pragmas don't parse (`spec.md` §7: all errors are fatal, no partial
/// recovery), logging which file before propagating the error.
pub fn scan_filelist(files: &[(std::path::PathBuf, String)]) -> Result<HashMap<String, FilePragmas>> {
    let mut by_file = HashMap::new();
    for (path, text) in files {
        match scan_file(path, text) {
            Ok(pragmas) => {
                by_file.insert(path.display().to_string(), pragmas);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "pragma scan failed");
                return Err(e);
            }
        }
    }
    Ok(by_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_observe_only() {
        let p = parse_line("  // #pragma observe 3:0", "f.v", 1).unwrap().unwrap();
        assert_eq!(p.observe, Some([3, 0]));
        assert!(p.control.is_none());
    }

    #[test]
    fn parses_control_only() {
        let p = parse_line("#pragma control clock 0:0", "f.v", 1).unwrap().unwrap();
        assert_eq!(p.control, Some((PragmaControlType::Clock, [0, 0])));
    }

    #[test]
    fn parses_combined_pragma() {
        let p = parse_line("#pragma observe 7:4 control signal 1:0", "f.v", 1)
            .unwrap()
            .unwrap();
        assert_eq!(p.observe, Some([7, 4]));
        assert_eq!(p.control, Some((PragmaControlType::Signal, [1, 0])));
    }

    #[test]
    fn non_pragma_line_returns_none() {
        assert_eq!(parse_line("wire [3:0] a;", "f.v", 1).unwrap(), None);
    }

    #[test]
    fn missing_directive_name_is_an_error() {
        assert!(parse_line("#pragma foo", "f.v", 1).is_err());
    }

    #[test]
    fn malformed_range_is_an_error() {
        assert!(parse_line("#pragma observe x", "f.v", 1).is_err());
    }
}
