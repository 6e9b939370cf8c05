use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};
use rustc_hash::FxHashMap;

use super::batch::{ChangeKind, RawBatch};
use crate::config::WatchConfig;
use crate::utils::path::normalize_path;

/// Pure debouncer: only handles timing and event deduplication.
pub(super) struct Debouncer {
    debounce: Duration,
    cooldown: Duration,
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    /// New path → old path
    pub(super) renames: FxHashMap<PathBuf, PathBuf>,
    pub(super) last_event: Option<Instant>,
    pub(super) last_apply: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new(config: WatchConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            cooldown: Duration::from_millis(config.cooldown_ms),
            changes: FxHashMap::default(),
            renames: FxHashMap::default(),
            last_event: None,
            last_apply: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → nothing happened
    /// - Same type events: first event wins
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let [from, to] = event.paths.as_slice() {
                    self.add_rename(from, to);
                }
                return;
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Removed,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Created,
            EventKind::Modify(modify) => {
                // Metadata-only changes (mtime/atime/chmod) are noise
                if matches!(modify, ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.add_change(normalize_path(path), kind);
        }
    }

    fn add_change(&mut self, path: PathBuf, kind: ChangeKind) {
        if let Some(&existing) = self.changes.get(&path) {
            match (existing, kind) {
                (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                    crate::debug!("watch"; "restore {}->{}: {}", existing.label(), kind.label(), path.display());
                    self.changes.insert(path, kind);
                }
                (ChangeKind::Modified, ChangeKind::Removed) => {
                    crate::debug!("watch"; "upgrade modified->removed: {}", path.display());
                    self.changes.insert(path, ChangeKind::Removed);
                }
                (ChangeKind::Created, ChangeKind::Removed) => {
                    crate::debug!("watch"; "discard created+removed: {}", path.display());
                    self.changes.remove(&path);
                }
                // first wins
                _ => return,
            }
            self.last_event = Some(Instant::now());
            return;
        }

        crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
        self.changes.insert(path, kind);
        self.last_event = Some(Instant::now());
    }

    /// A completed rename supersedes the `From`/`To` halves some backends
    /// report before it.
    fn add_rename(&mut self, from: &Path, to: &Path) {
        if is_temp_file(to) {
            // Editors save by renaming a temp file over the target.
            if !is_temp_file(from) {
                self.add_change(normalize_path(from), ChangeKind::Removed);
            }
            return;
        }
        if is_temp_file(from) {
            self.add_change(normalize_path(to), ChangeKind::Modified);
            return;
        }

        let from = normalize_path(from);
        let to = normalize_path(to);
        if self.changes.get(&from) == Some(&ChangeKind::Removed) {
            self.changes.remove(&from);
        }
        if self.changes.get(&to) == Some(&ChangeKind::Created) {
            self.changes.remove(&to);
        }

        // a -> b -> c collapses to a -> c
        let origin = self.renames.remove(&from).unwrap_or(from);
        crate::debug!("watch"; "event renamed: {} -> {}", origin.display(), to.display());
        if origin != to {
            self.renames.insert(to, origin);
        }
        self.last_event = Some(Instant::now());
    }

    /// Take raw events if debounce + cooldown elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<RawBatch> {
        if !self.is_ready() {
            return None;
        }

        let batch = RawBatch {
            changes: std::mem::take(&mut self.changes),
            renames: std::mem::take(&mut self.renames),
        };
        self.last_event = None;

        if batch.is_empty() {
            return None;
        }

        self.last_apply = Some(Instant::now());
        Some(batch)
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < self.debounce {
            return false;
        }

        if let Some(last_apply) = self.last_apply
            && last_apply.elapsed() < self.cooldown
        {
            return false;
        }

        !self.changes.is_empty() || !self.renames.is_empty()
    }

    /// Precise sleep duration until next possible ready time.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce_remaining = self.debounce.saturating_sub(last_event.elapsed());
        let cooldown_remaining = self
            .last_apply
            .map(|t| self.cooldown.saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
