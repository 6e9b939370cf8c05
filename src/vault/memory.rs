//! In-memory file provider.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{FileEvent, FileProvider};

/// A vault held entirely in memory.
///
/// Mutating helpers return the [`FileEvent`] a host would have emitted,
/// so callers can forward it to the managers.
#[derive(Debug, Default)]
pub struct MemoryVault {
    files: RwLock<BTreeMap<String, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let vault = Self::new();
        {
            let mut map = vault.files.write();
            for (path, source) in files {
                map.insert(path.to_string(), source.to_string());
            }
        }
        vault
    }

    pub fn write(&self, path: &str, source: &str) -> FileEvent {
        let previous = self
            .files
            .write()
            .insert(path.to_string(), source.to_string());
        match previous {
            Some(_) => FileEvent::Modified(path.to_string()),
            None => FileEvent::Created(path.to_string()),
        }
    }

    pub fn remove(&self, path: &str) -> FileEvent {
        self.files.write().remove(path);
        FileEvent::Deleted(path.to_string())
    }

    pub fn rename(&self, from: &str, to: &str) -> FileEvent {
        let mut files = self.files.write();
        if let Some(source) = files.remove(from) {
            files.insert(to.to_string(), source);
        }
        FileEvent::Renamed {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl FileProvider for MemoryVault {
    fn read(&self, path: &str) -> Option<String> {
        self.files.read().get(path).cloned()
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }

    fn list(&self) -> Vec<String> {
        self.files.read().keys().cloned().collect()
    }
}
