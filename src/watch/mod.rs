//! Watch mode.
//!
//! Watches the vault directory and feeds debounced changes to the
//! application context.
//!
//! ```text
//! notify → Debouncer (pure timing) → RawBatch → FileEvent → AppContext
//! ```
//!
//! The watcher starts before the initial preload so that edits made while
//! the vault is loading are buffered instead of lost.

mod batch;
mod debouncer;


use std::path::PathBuf;

use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, bounded, select, unbounded};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::EngineConfig;
use crate::context::AppContext;
use crate::logger::{self, Status};
use crate::utils::path::normalize_path;
use crate::vault::{DiskVault, FileEvent};
use crate::{debug, log};

use batch::RawBatch;
use debouncer::Debouncer;

/// Install the Ctrl+C handler. Call once at program start.
///
/// The returned channel receives one message per interrupt.
pub fn setup_shutdown_handler() -> Result<Receiver<()>> {
    let (tx, rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;
    Ok(rx)
}

pub struct VaultWatcher {
    notify_rx: Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
    debouncer: Debouncer,
    vault: DiskVault,
}

impl VaultWatcher {
    /// Start watching the vault root of `config`. Events buffer until
    /// [`VaultWatcher::run`] is called.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let (notify_tx, notify_rx) = unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })
        .context("failed to create file watcher")?;

        let vault = DiskVault::new(&config.root);
        watcher
            .watch(vault.root(), RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", vault.root().display()))?;
        debug!("watch"; "watching {}", vault.root().display());

        Ok(Self {
            notify_rx,
            _watcher: watcher,
            debouncer: Debouncer::new(config.watch),
            vault,
        })
    }

    /// Apply changes until `shutdown` fires.
    pub fn run(mut self, ctx: &AppContext, shutdown: &Receiver<()>) {
        log!("watch"; "watching for changes in {}", self.vault.root().display());

        loop {
            select! {
                recv(self.notify_rx) -> msg => match msg {
                    Ok(Ok(event)) => self.debouncer.add_event(&event),
                    Ok(Err(e)) => log!("watch"; "notify error: {}", e),
                    Err(_) => break,
                },
                recv(shutdown) -> _ => {
                    log!("watch"; "stopping...");
                    break;
                }
                default(self.debouncer.sleep_duration()) => {
                    if let Some(batch) = self.debouncer.take_if_ready() {
                        report(ctx, apply_batch(ctx, &self.vault, batch));
                    }
                }
            }
        }
    }
}

/// What one reconciliation round did.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Nothing the managers handle changed.
    Unchanged(Vec<String>),
    /// Events were applied; holds the changed vault paths.
    Applied(Vec<String>),
    ConfigReloaded,
    ConfigFailed(String),
}

fn apply_batch(ctx: &AppContext, vault: &DiskVault, batch: RawBatch) -> Outcome {
    let config = ctx.config();
    let config_path: PathBuf = normalize_path(&config.config_path);

    if !config.config_path.as_os_str().is_empty() && batch.touches(&config_path) {
        return match EngineConfig::load(&config.config_path) {
            Ok(new) => {
                if ctx.reload_config(new) {
                    Outcome::ConfigReloaded
                } else {
                    Outcome::Unchanged(vec![config_path.display().to_string()])
                }
            }
            Err(e) => Outcome::ConfigFailed(format!("{e:#}")),
        };
    }

    let events = batch.into_events(vault);
    let paths: Vec<String> = events.iter().map(|e| e.path().to_string()).collect();
    if !events.iter().any(|event| is_handled(ctx, event)) {
        return Outcome::Unchanged(paths);
    }

    for event in &events {
        ctx.apply_event(event);
    }
    Outcome::Applied(paths)
}

fn is_handled(ctx: &AppContext, event: &FileEvent) -> bool {
    let handled = |path: &str| ctx.interpreter().should_read(path) || ctx.scripts().should_read(path);
    match event {
        FileEvent::Renamed { from, to } => handled(from) || handled(to),
        other => handled(other.path()),
    }
}

fn report(ctx: &AppContext, outcome: Outcome) {
    match outcome {
        Outcome::Unchanged(paths) => logger::status(Status::Unchanged(&paths)),
        Outcome::ConfigReloaded => logger::status(Status::Reloaded {
            types: ctx.graph().len(),
        }),
        Outcome::ConfigFailed(error) => logger::status(Status::Failed {
            summary: "config reload failed",
            detail: &error,
        }),
        Outcome::Applied(paths) => {
            let schema = ctx.config().schema_path();
            let error = ctx
                .interpreter()
                .module(&schema)
                .and_then(|module| module.error().map(str::to_string));
            match error {
                Some(error) => logger::status(Status::Failed {
                    summary: &format!("schema {schema} failed"),
                    detail: &error,
                }),
                None => logger::status(Status::Updated {
                    types: ctx.graph().len(),
                    paths: &paths,
                }),
            }
        }
    }
}
