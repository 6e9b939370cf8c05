//! Engine configuration management for `typing.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError
//! ├── sections   # [schema], [scripts], [watch], [log]
//! ├── util       # Config file discovery
//! └── mod.rs     # EngineConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[schema]`  | Schema entry path, extensions, imports root      |
//! | `[scripts]` | Script modules (enabled, extensions, imports)    |
//! | `[watch]`   | Debounce and cooldown of the file watcher        |
//! | `[log]`     | Verbose logging                                  |

mod error;
mod sections;
mod util;

pub use error::ConfigError;
pub use sections::{LogConfig, SchemaConfig, ScriptsConfig, WatchConfig};
pub use util::{find_config_file, find_config_file_from};

use crate::log;
use crate::utils::path::id::{has_extension, normalize};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing typing.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Vault root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl EngineConfig {
    /// Load and validate the config file at `path`.
    ///
    /// The vault root is the directory containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.config_path = path.to_path_buf();
        config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Default configuration for a vault without a config file.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Vault-relative identifier of the schema entry file.
    pub fn schema_path(&self) -> String {
        normalize(&self.schema.path)
    }

    /// Whether `path` (absolute) is this config file.
    pub fn is_config_file(&self, path: &Path) -> bool {
        !self.config_path.as_os_str().is_empty() && path == self.config_path
    }

    // ========================================================================
    // validation
    // ========================================================================

    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::validate_extensions("schema.extensions", &self.schema.extensions)?;
        Self::validate_extensions("scripts.extensions", &self.scripts.extensions)?;

        let schema = self.schema_path();
        if schema.is_empty() {
            return Err(ConfigError::Validation("schema.path is empty".into()));
        }
        if !has_extension(&schema, &self.schema.extensions) {
            return Err(ConfigError::Validation(format!(
                "schema.path `{}` must end with one of schema.extensions ({})",
                self.schema.path,
                self.schema.extensions.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_extensions(field: &str, extensions: &[String]) -> Result<(), ConfigError> {
        if extensions.is_empty() {
            return Err(ConfigError::Validation(format!("{field} is empty")));
        }
        for ext in extensions {
            if ext.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{field} contains an empty extension"
                )));
            }
            if ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "{field}: `{ext}` must not start with a dot"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> EngineConfig {
    let (parsed, ignored) = EngineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
