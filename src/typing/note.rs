/// Handle to a note in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Note {
    path: String,
}

impl Note {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name without directory and extension.
    pub fn title(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// Directory containing the note (`""` at the vault root).
    pub fn folder(&self) -> &str {
        crate::utils::path::id::dirname(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_folder() {
        let note = Note::new("tasks/Fix login.md");
        assert_eq!(note.title(), "Fix login");
        assert_eq!(note.folder(), "tasks");

        let root = Note::new(".hidden");
        assert_eq!(root.title(), ".hidden");
        assert_eq!(root.folder(), "");
    }
}
