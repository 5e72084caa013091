//! Run configuration for the mining loop.

use crate::error::{MinerError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration for one mining run, assembled once at startup.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Wall-clock budget per worker. None waits indefinitely.
    pub timeout: Option<Duration>,
    /// Skip the non-static analysis pass inside the worker.
    pub static_only: bool,
    /// Quarantine mode: record terminal failures in the ledger and
    /// roll their output directories back.
    pub quarantine: bool,
    /// Key/value pairs merged verbatim into every feature document.
    pub hardcode: Map<String, Value>,
}

impl RunConfig {
    /// Load the hardcode dictionary from a JSON file. The top level
    /// must be an object; anything else is a setup error that aborts
    /// the run before any artifact is processed.
    pub fn load_hardcode(path: &Path) -> Result<Map<String, Value>> {
        let raw = fs::read_to_string(path).map_err(|e| MinerError::Hardcode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| MinerError::Hardcode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(MinerError::Hardcode {
                path: path.to_path_buf(),
                reason: format!("expected a JSON object, got {other}"),
            }),
        }
    }
}
