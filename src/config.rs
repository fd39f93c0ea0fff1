//! Run options and the branch list file.
//!
//! The branch file is a JSON array; each element describes one site:
//! ```json
//! [
//!   { "branch": "Berlin", "ip": "10.0.1.20", "port": 8080,
//!     "username": "admin", "password": "secret" }
//! ]
//! ```
//! `port` is optional and defaults to 80.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{InventoryError, Result};

// Defaults used when the CLI does not override them
const CONFIG_PATH:     &str = "branches_config.json";
const OUTPUT_PATH:     &str = "camera_metadata_all_branches.csv";
const TIMEOUT_SECS:    u64  = 10;
const HTTP_PORT:       u16  = 80;

/// Everything one inventory run needs besides the devices themselves.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Path to the JSON branch list.
    pub config_path: PathBuf,
    /// Path of the CSV file to (over)write.
    pub output_path: PathBuf,
    /// Per-request timeout for device calls.
    pub timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_PATH),
            output_path: PathBuf::from(OUTPUT_PATH),
            timeout:     Duration::from_secs(TIMEOUT_SECS),
        }
    }
}

/// Connection details for one branch's camera endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct BranchDescriptor {
    pub branch:   String,
    pub ip:       String,
    #[serde(default = "default_port")]
    pub port:     u16,
    pub username: String,
    pub password: String,
}

fn default_port() -> u16 { HTTP_PORT }

impl fmt::Debug for BranchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchDescriptor")
            .field("branch", &self.branch)
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// One element of the branch file, decoded independently of its siblings.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchEntry {
    Valid(BranchDescriptor),
    /// The element could not be used; `label` is its `branch` value when
    /// present, otherwise `#<index>`.
    Invalid { label: String, reason: String },
}

/// Read `path` and decode every element of its top-level array.
///
/// A missing or unparsable file is fatal. A malformed element only
/// invalidates that element.
pub fn load_branches(path: &Path) -> Result<Vec<BranchEntry>> {
    if !path.exists() {
        return Err(InventoryError::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let content = fs::read_to_string(path)
        .map_err(|e| InventoryError::Config(format!("cannot read {}: {e}", path.display())))?;
    parse_branches(&content)
}

/// Decode the branch list from JSON text.
pub fn parse_branches(content: &str) -> Result<Vec<BranchEntry>> {
    let root: Value = serde_json::from_str(content)?;
    let items = match root {
        Value::Array(items) => items,
        other => {
            return Err(InventoryError::Config(format!(
                "expected a JSON array of branches, found {}",
                json_kind(&other)
            )))
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| decode_entry(idx, item))
        .collect())
}

fn decode_entry(idx: usize, item: Value) -> BranchEntry {
    let label = item
        .get("branch")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{idx}"));

    match serde_json::from_value::<BranchDescriptor>(item) {
        Ok(desc) => match validate_branch(&desc) {
            Ok(()) => BranchEntry::Valid(desc),
            Err(e) => BranchEntry::Invalid { label, reason: e.to_string() },
        },
        Err(e) => BranchEntry::Invalid { label, reason: e.to_string() },
    }
}

/// Reject descriptors that decode but cannot address a device.
pub fn validate_branch(desc: &BranchDescriptor) -> Result<()> {
    if desc.ip.trim().is_empty() {
        return Err(InventoryError::Config("ip is required".into()));
    }
    if desc.port == 0 {
        return Err(InventoryError::Config("port must be non-zero".into()));
    }
    Ok(())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}
