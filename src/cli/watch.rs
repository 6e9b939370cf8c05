//! `typing watch`: keep the schema in sync with the vault.

use anyhow::Result;
use crossbeam::channel::Receiver;

use crate::context::AppContext;
use crate::log;
use crate::watch::VaultWatcher;

/// Start the watcher, preload, then apply changes until `shutdown` fires.
pub fn run_watch(ctx: &AppContext, shutdown: &Receiver<()>) -> Result<()> {
    // Watcher first: edits made during preload are buffered, not lost.
    let watcher = VaultWatcher::new(&ctx.config())?;

    ctx.preload();
    let schema = ctx.config().schema_path();
    let error = ctx
        .interpreter()
        .module(&schema)
        .and_then(|module| module.error().map(str::to_string));
    match error {
        Some(error) => log!("error"; "schema {} failed:\n{}", schema, error),
        None => log!("schema"; "{} types ready", ctx.graph().len()),
    }

    watcher.run(ctx, shutdown);
    Ok(())
}
