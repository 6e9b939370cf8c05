use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::vault::{DiskVault, FileEvent};

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Debounced disk changes, still keyed by absolute path.
#[derive(Debug, Default)]
pub(super) struct RawBatch {
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    /// New path → old path
    pub(super) renames: FxHashMap<PathBuf, PathBuf>,
}

impl RawBatch {
    pub(super) fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.renames.is_empty()
    }

    /// Whether any change in the batch concerns `path`.
    pub(super) fn touches(&self, path: &Path) -> bool {
        self.changes.contains_key(path)
            || self
                .renames
                .iter()
                .any(|(to, from)| to == path || from == path)
    }

    /// Vault events for every change inside `vault`.
    ///
    /// Renames come first, then deletions, creations and modifications,
    /// each sorted by path. A rename across the vault boundary becomes a
    /// creation or a deletion.
    pub(super) fn into_events(self, vault: &DiskVault) -> Vec<FileEvent> {
        let mut renamed = Vec::new();
        let mut deleted = Vec::new();
        let mut created = Vec::new();
        let mut modified = Vec::new();

        for (to, from) in &self.renames {
            match (vault.identify(from), vault.identify(to)) {
                (Some(from), Some(to)) => renamed.push(FileEvent::Renamed { from, to }),
                (None, Some(to)) => created.push(FileEvent::Created(to)),
                (Some(from), None) => deleted.push(FileEvent::Deleted(from)),
                (None, None) => {}
            }
        }

        for (path, kind) in &self.changes {
            let Some(id) = vault.identify(path) else {
                continue;
            };
            match kind {
                ChangeKind::Removed => deleted.push(FileEvent::Deleted(id)),
                ChangeKind::Created => created.push(FileEvent::Created(id)),
                ChangeKind::Modified => modified.push(FileEvent::Modified(id)),
            }
        }

        let mut events = Vec::new();
        for mut group in [renamed, deleted, created, modified] {
            group.sort_by(|a, b| a.path().cmp(b.path()));
            events.extend(group);
        }
        events
    }
}
