//! The interface JSON boundary between C3 and C4/C5 (`spec.md` §4.6, §6).
//!
//! Grounded in the teacher's schema module: a small typed struct mirrors an
//! external wire format and round-trips through `serde_json` rather than
//! hand-rolled parsing.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalogue::{SignalCatalogue, TypeCatalogue};
use crate::error::{AsapError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceFile {
    #[serde(rename = "OBSERVABILITY_MAP")]
    pub observability_map: SignalCatalogue,
    #[serde(rename = "CONTROLLABILITY_MAP")]
    pub controllability_map: SignalCatalogue,
    #[serde(rename = "CONTROL_TYPE_MAP")]
    pub control_type_map: TypeCatalogue,
}

/// Serializes the three catalogues to the interface JSON text.
pub fn write(observe: &SignalCatalogue, control: &SignalCatalogue, control_types: &TypeCatalogue) -> Result<String> {
    let file = InterfaceFile {
        observability_map: observe.clone(),
        controllability_map: control.clone(),
        control_type_map: control_types.clone(),
    };
    serde_json::to_string_pretty(&file).map_err(|e| AsapError::InternalEncoding {
        reason: format!("interface JSON serialization failed: {e}"),
    })
}

/// Parses interface JSON text back into the three catalogues.
pub fn read(path: &Path, text: &str) -> Result<(SignalCatalogue, SignalCatalogue, TypeCatalogue)> {
    let file: InterfaceFile = serde_json::from_str(text).map_err(|e| AsapError::Config {
        path: path.to_path_buf(),
        reason: format!("malformed interface JSON: {e}"),
    })?;
    Ok((file.observability_map, file.controllability_map, file.control_type_map))
}
