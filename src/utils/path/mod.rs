//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `vault_relative`)
//! - [`id`]: Module identifier paths (`dirname`, `join`, `normalize`)

pub mod fs;
pub mod id;

pub use fs::{normalize_path, vault_relative};
