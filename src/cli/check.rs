//! `typing check`: build the schema and report diagnostics.

use std::path::Path;

use anyhow::{Result, bail};

use super::common::vault_id;
use crate::context::AppContext;
use crate::log;

/// Preload the vault and check one schema file (the entry schema unless
/// `path` is given). Fails when the file is missing or has errors.
pub fn run_check(ctx: &AppContext, path: Option<&Path>) -> Result<()> {
    ctx.preload();

    let config = ctx.config();
    let target = match path {
        Some(path) => vault_id(&config, path)?,
        None => config.schema_path(),
    };

    let module = {
        let mut interpreter = ctx.interpreter();
        if !interpreter.should_read(&target) {
            bail!(
                "{} is not a schema file (extensions: {})",
                target,
                interpreter.extensions().join(", ")
            );
        }
        match path {
            Some(_) => interpreter.import_module(&target, None, true),
            None => interpreter.module(&target),
        }
    };

    let Some(module) = module else {
        bail!("schema file {} not found", target);
    };

    if let Some(error) = module.error() {
        for line in error.lines() {
            log!("error"; "{}", line);
        }
        bail!("{} has errors", target);
    }

    let count = module.env().map_or(0, |env| env.len());
    log!("schema"; "{}: ok ({} types)", target, count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::path::normalize_path;
    use std::fs;
    use tempfile::TempDir;

    fn vault(schema: &str) -> (TempDir, AppContext) {
        let dir = TempDir::new().unwrap();
        let root = normalize_path(dir.path());
        fs::write(root.join("typing.toml"), "").unwrap();
        fs::write(root.join("typing.otl"), schema).unwrap();
        fs::write(root.join("broken.otl"), "type A extends Nope {}").unwrap();
        let ctx = AppContext::open(&root.join("typing.toml")).unwrap();
        (dir, ctx)
    }

    #[test]
    fn test_check_entry_schema() {
        let (_dir, ctx) = vault("type Task {}\n");
        assert!(run_check(&ctx, None).is_ok());
    }

    #[test]
    fn test_check_reports_errors() {
        let (_dir, ctx) = vault("type Task extends Missing {}\n");
        let err = run_check(&ctx, None).unwrap_err();
        assert_eq!(err.to_string(), "typing.otl has errors");
    }

    #[test]
    fn test_check_other_file() {
        let (_dir, ctx) = vault("type Task {}\n");
        let err = run_check(&ctx, Some(Path::new("broken.otl"))).unwrap_err();
        assert_eq!(err.to_string(), "broken.otl has errors");

        let err = run_check(&ctx, Some(Path::new("missing.otl"))).unwrap_err();
        assert_eq!(err.to_string(), "schema file missing.otl not found");

        let err = run_check(&ctx, Some(Path::new("notes.md"))).unwrap_err();
        assert!(err.to_string().starts_with("notes.md is not a schema file"));
    }
}
