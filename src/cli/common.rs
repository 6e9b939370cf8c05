//! Common utilities shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};

use crate::config::{EngineConfig, find_config_file};
use crate::context::AppContext;
use crate::log;
use crate::utils::path::id::normalize;
use crate::utils::path::{normalize_path, vault_relative};
use crate::vault::DiskVault;

/// Open the vault whose config is found from `config_name`.
///
/// Without a config file the current directory is used with defaults.
pub fn open_context(config_name: &Path) -> Result<AppContext> {
    if let Some(path) = find_config_file(config_name) {
        let path = normalize_path(&path);
        return AppContext::open(&path)
            .with_context(|| format!("failed to load {}", path.display()));
    }

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let root = normalize_path(&cwd);
    log!("warning"; "{} not found, using defaults in {}", config_name.display(), root.display());

    let provider = Arc::new(DiskVault::new(&root));
    Ok(AppContext::new(EngineConfig::for_root(root), provider))
}

/// Vault identifier for a path given on the command line.
///
/// Existing files are taken relative to the current directory; anything
/// else is read as a vault-relative identifier.
pub fn vault_id(config: &EngineConfig, path: &Path) -> Result<String> {
    let disk = normalize_path(path);
    if disk.exists() {
        return vault_relative(&config.root, &disk)
            .ok_or_else(|| anyhow!("{} is outside the vault {}", path.display(), config.root.display()));
    }
    path.to_str()
        .map(normalize)
        .ok_or_else(|| anyhow!("invalid path: {}", path.display()))
}
