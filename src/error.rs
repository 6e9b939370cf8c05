//! Engine error taxonomy.
//!
//! | Variant           | Meaning                                              |
//! |-------------------|------------------------------------------------------|
//! | `NotFound`        | requested module or file does not exist              |
//! | `RecursiveImport` | path is already mid-evaluation on the call stack     |
//! | `Evaluation`      | unexpected fault raised while evaluating a module    |
//! | `Diagnostics`     | lint/compile diagnostics, one `path:range: msg` each |
//! | `Unsupported`     | the operation is not available in this setup         |
//! | `Validation`      | a value or declaration violates a schema rule        |
//! | `Io`              | reading from the file provider failed                |

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the module managers, interpreter and typing model.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Recursive import: {0}")]
    RecursiveImport(String),

    #[error("{message}")]
    Evaluation { path: String, message: String },

    #[error("{}", .0.join("\n"))]
    Diagnostics(Vec<String>),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

impl EngineError {
    pub fn evaluation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error means "absent" rather than a diagnosed failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
