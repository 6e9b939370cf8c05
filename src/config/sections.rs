//! Configuration sections.
//!
//! # Example
//!
//! ```toml
//! [schema]
//! path = "typing.otl"          # Entry schema, relative to the vault root
//! extensions = ["otl"]
//! imports_path = "/"           # Root for non-relative OTL imports
//!
//! [scripts]
//! enabled = false
//! extensions = ["tsx", "ts", "jsx", "js"]
//! imports_path = "/"
//!
//! [watch]
//! debounce_ms = 300
//! cooldown_ms = 800
//!
//! [log]
//! verbose = false
//! ```

use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `[schema]`: OTL schema files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Schema that defines the type graph.
    pub path: String,
    pub extensions: Vec<String>,
    pub imports_path: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: "typing.otl".into(),
            extensions: strings(&["otl"]),
            imports_path: "/".into(),
        }
    }
}

/// `[scripts]`: script modules referenced from actions and hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub enabled: bool,
    pub extensions: Vec<String>,
    pub imports_path: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            extensions: strings(&["tsx", "ts", "jsx", "js"]),
            imports_path: "/".into(),
        }
    }
}

/// `[watch]`: file watcher timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period before a batch of events is applied.
    pub debounce_ms: u64,
    /// Minimum gap between two reconciliation rounds.
    pub cooldown_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            cooldown_ms: 800,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub verbose: bool,
}
