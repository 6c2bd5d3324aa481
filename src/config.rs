//! Parsing of the `ASAP_SPEC` specification file and the RTL file list
//! (`spec.md` §6). Both are line-oriented text formats external tooling
//! hands to the core; this module is the thin typed boundary over them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AsapError, Result};

/// Typed view over the recognized `ASAP_SPEC` keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsapConfig {
    pub top_module: String,
    pub filelist: PathBuf,
    pub smu_segment_size: u32,
    pub max_seq_depth: u32,
    pub max_triggers: u32,
    pub sru_segment_size: u32,
    pub sru_num_pla: u32,
}

const RECOGNIZED_KEYS: &[&str] = &[
    "TOP_MODULE",
    "FILELIST",
    "SMU_SEGMENT_SIZE",
    "MAX_SEQ_DEPTH",
    "MAX_TRIGGERS",
    "SRU_SEGMENT_SIZE",
    "SRU_NUM_PLA",
];

impl AsapConfig {
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let map = parse_key_value(path, text)?;
        let get = |key: &str| -> Result<String> {
            map.get(key).cloned().ok_or_else(|| AsapError::Config {
                path: path.to_path_buf(),
                reason: format!("missing required key `{key}`"),
            })
        };
        let get_u32 = |key: &str| -> Result<u32> {
            let raw = get(key)?;
            raw.parse::<u32>().map_err(|_| AsapError::Config {
                path: path.to_path_buf(),
                reason: format!("key `{key}` is not an unsigned integer: `{raw}`"),
            })
        };
        Ok(AsapConfig {
            top_module: get("TOP_MODULE")?,
            filelist: PathBuf::from(get("FILELIST")?),
            smu_segment_size: get_u32("SMU_SEGMENT_SIZE")?,
            max_seq_depth: get_u32("MAX_SEQ_DEPTH")?,
            max_triggers: get_u32("MAX_TRIGGERS")?,
            sru_segment_size: get_u32("SRU_SEGMENT_SIZE")?,
            sru_num_pla: get_u32("SRU_NUM_PLA")?,
        })
    }
}

fn parse_key_value(path: &Path, text: &str) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(AsapError::Config {
                path: path.to_path_buf(),
                reason: format!("line {} is not `KEY=VALUE`: `{line}`", lineno + 1),
            });
        }
        let key = parts[0].trim();
        if !RECOGNIZED_KEYS.contains(&key) {
            tracing::warn!(path = %path.display(), line = lineno + 1, key, "unrecognized ASAP_SPEC key");
        }
        map.insert(key.to_string(), parts[1].trim().to_string());
    }
    Ok(map)
}

/// Parses a file-list: one RTL source path per line, blank lines ignored.
pub fn parse_filelist(path: &Path, text: &str) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect();
    if files.is_empty() {
        return Err(AsapError::Config {
            path: path.to_path_buf(),
            reason: "file list is empty".to_string(),
        });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_spec() {
        let text = "TOP_MODULE=TOP\nFILELIST=files.f\nSMU_SEGMENT_SIZE=4\nMAX_SEQ_DEPTH=4\nMAX_TRIGGERS=1\nSRU_SEGMENT_SIZE=4\nSRU_NUM_PLA=2\n";
        let cfg = AsapConfig::parse(Path::new("ASAP_SPEC"), text).unwrap();
        assert_eq!(cfg.top_module, "TOP");
        assert_eq!(cfg.smu_segment_size, 4);
        assert_eq!(cfg.sru_num_pla, 2);
    }

    #[test]
    fn rejects_line_without_single_equals() {
        let text = "TOP_MODULE TOP\n";
        let err = AsapConfig::parse(Path::new("ASAP_SPEC"), text).unwrap_err();
        assert!(matches!(err, AsapError::Config { .. }));
    }

    #[test]
    fn rejects_missing_key() {
        let text = "TOP_MODULE=TOP\n";
        let err = AsapConfig::parse(Path::new("ASAP_SPEC"), text).unwrap_err();
        assert!(matches!(err, AsapError::Config { .. }));
    }

    #[test]
    fn filelist_rejects_empty() {
        let err = parse_filelist(Path::new("files.f"), "\n\n").unwrap_err();
        assert!(matches!(err, AsapError::Config { .. }));
    }
}
