//! Error kinds for every stage of the compiler, per the error handling design:
//! all errors are fatal at the point of detection and carry the offending
//! construct (file, line, sequence name, or signal name).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AsapError {
    #[error("{path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("{file}:{line}: invalid pragma directive: {reason}")]
    PragmaSyntax {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("parse error in {context}: {reason}")]
    ParseSyntax { context: String, reason: String },

    #[error("hierarchy error: {reason}")]
    Hierarchy { reason: String },

    #[error("unknown signal `{signal}` referenced in {context}")]
    UnknownSignal { signal: String, context: String },

    #[error("pattern range error for signal `{signal}` in {context}: {reason}")]
    PatternRange {
        signal: String,
        context: String,
        reason: String,
    },

    #[error("signal `{signal}` in {context} crosses a segment boundary")]
    SegmentCrossing { signal: String, context: String },

    #[error("{count} sequences exceed the maximum of {max} triggers")]
    TooManySequences { count: usize, max: usize },

    #[error("{count} distinct trigger expressions exceed the maximum of {max} PLAs")]
    TooManyPLAs { count: usize, max: usize },

    #[error("sequence `{name}` has {count} patterns, overflowing the {max}-cycle MAX_SEQ_DEPTH budget")]
    TriggerOverflow { name: String, count: usize, max: usize },

    #[error("internal encoding invariant violated: {reason}")]
    InternalEncoding { reason: String },

    #[error("I/O error reading/writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AsapError>;
