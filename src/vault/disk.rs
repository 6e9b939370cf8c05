//! Directory-backed file provider.

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use super::FileProvider;
use crate::utils::path::{normalize_path, vault_relative};

/// A vault rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DiskVault {
    root: PathBuf,
}

impl DiskVault {
    pub fn new(root: &Path) -> Self {
        Self {
            root: normalize_path(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Disk location of a vault path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }

    /// Vault path for a disk location, if it lies inside the vault.
    pub fn identify(&self, path: &Path) -> Option<String> {
        vault_relative(&self.root, path)
    }
}

impl FileProvider for DiskVault {
    fn read(&self, path: &str) -> Option<String> {
        match fs::read_to_string(self.resolve(path)) {
            Ok(source) => Some(source),
            Err(err) => {
                crate::debug!("vault"; "cannot read {}: {}", path, err);
                None
            }
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn list(&self) -> Vec<String> {
        let mut files: Vec<String> = WalkDir::new(&self.root)
            .skip_hidden(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| self.identify(&entry.path()))
            .collect();
        files.sort();
        files
    }
}
