//! File change notifications.

/// A change reported by the host for one vault path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created(String),
    Modified(String),
    Renamed { from: String, to: String },
    Deleted(String),
}

impl FileEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Modified(_) => "modified",
            Self::Renamed { .. } => "renamed",
            Self::Deleted(_) => "deleted",
        }
    }

    /// Path the event leaves behind (the new name for renames).
    pub fn path(&self) -> &str {
        match self {
            Self::Created(path) | Self::Modified(path) | Self::Deleted(path) => path,
            Self::Renamed { to, .. } => to,
        }
    }
}
