//! File providers.
//!
//! The module managers never touch the file system directly: they read
//! through a [`FileProvider`] and are told about changes through
//! [`FileEvent`]s.
//!
//! | Provider      | Backing store                        |
//! |---------------|--------------------------------------|
//! | `MemoryVault` | in-process map (tests, embedding)    |
//! | `DiskVault`   | directory tree rooted at a vault dir |

mod disk;
mod event;
mod memory;

pub use disk::DiskVault;
pub use event::FileEvent;
pub use memory::MemoryVault;

/// Read access to the host's files, keyed by vault-relative path.
pub trait FileProvider: Send + Sync {
    /// Current text of `path`, or `None` when it does not exist.
    fn read(&self, path: &str) -> Option<String>;

    /// Whether `path` currently exists.
    fn exists(&self, path: &str) -> bool;

    /// Every file currently known to the provider.
    fn list(&self) -> Vec<String>;
}
