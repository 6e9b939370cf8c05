//! Application context.
//!
//! Owns everything one vault needs: the active config, the file provider,
//! the type graph and both module managers. Built explicitly and passed
//! around; nothing here is process-global.
//!
//! ```text
//! EngineConfig ─┐
//!               ├─► TypeGraph ─► Interpreter ─► ScriptManager
//! FileProvider ─┘
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};

use crate::config::EngineConfig;
use crate::interpreter::Interpreter;
use crate::module::LogReporter;
use crate::scripting::ScriptManager;
use crate::typing::TypeGraph;
use crate::vault::{DiskVault, FileEvent, FileProvider};
use crate::{debug, log};

pub struct AppContext {
    config: ArcSwap<EngineConfig>,
    provider: Arc<dyn FileProvider>,
    graph: Arc<TypeGraph>,
    interpreter: Mutex<Interpreter>,
    scripts: Mutex<ScriptManager>,
}

impl AppContext {
    pub fn new(config: EngineConfig, provider: Arc<dyn FileProvider>) -> Self {
        let graph = Arc::new(TypeGraph::new());
        let (interpreter, scripts) = Self::managers(&config, &provider, &graph);
        Self {
            config: ArcSwap::from_pointee(config),
            provider,
            graph,
            interpreter: Mutex::new(interpreter),
            scripts: Mutex::new(scripts),
        }
    }

    /// Context over the directory containing `config_path`.
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = EngineConfig::load(config_path)?;
        let provider: Arc<dyn FileProvider> = Arc::new(DiskVault::new(&config.root));
        Ok(Self::new(config, provider))
    }

    fn managers(
        config: &EngineConfig,
        provider: &Arc<dyn FileProvider>,
        graph: &Arc<TypeGraph>,
    ) -> (Interpreter, ScriptManager) {
        let mut interpreter =
            Interpreter::from_config(Arc::clone(provider), &config.schema, Arc::clone(graph));
        interpreter.set_reporter(Box::new(LogReporter));

        let mut scripts =
            ScriptManager::from_config(Arc::clone(provider), &config.scripts, Arc::clone(graph));
        scripts.set_reporter(Box::new(LogReporter));

        (interpreter, scripts)
    }

    #[inline]
    pub fn config(&self) -> Arc<EngineConfig> {
        self.config.load_full()
    }

    pub fn provider(&self) -> &Arc<dyn FileProvider> {
        &self.provider
    }

    pub fn graph(&self) -> &Arc<TypeGraph> {
        &self.graph
    }

    pub fn interpreter(&self) -> MutexGuard<'_, Interpreter> {
        self.interpreter.lock()
    }

    pub fn scripts(&self) -> MutexGuard<'_, ScriptManager> {
        self.scripts.lock()
    }

    /// Load every schema and script file, then build the type graph.
    pub fn preload(&self) {
        self.interpreter.lock().preload_files();
        self.scripts.lock().preload_files();
    }

    /// Forward a file change to both managers.
    pub fn apply_event(&self, event: &FileEvent) {
        debug!("watch"; "{} {}", event.label(), event.path());
        self.interpreter.lock().handle_event(event);
        self.scripts.lock().handle_event(event);
    }

    /// Swap in a new config and rebuild from scratch.
    ///
    /// Returns `false` when `config` equals the active one.
    pub fn reload_config(&self, config: EngineConfig) -> bool {
        if *self.config.load_full() == config {
            return false;
        }

        log!("config"; "reloading");
        let (interpreter, scripts) = Self::managers(&config, &self.provider, &self.graph);
        self.config.store(Arc::new(config));
        *self.interpreter.lock() = interpreter;
        *self.scripts.lock() = scripts;

        self.graph.clear();
        self.graph.unmark_ready();
        self.preload();
        true
    }

    /// Drop all cached state. The next `preload` starts cold.
    pub fn reset(&self) {
        self.interpreter.lock().reset();
        self.scripts.lock().reset();
        self.graph.clear();
        self.graph.unmark_ready();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::typing::SchemaEvent;
    use crate::vault::MemoryVault;
    use serde_json::json;
    use std::fs;

    const SCHEMA: &str = "type Task {\n  field status: Text\n}\n";

    fn context(config: &str) -> (Arc<MemoryVault>, AppContext) {
        let vault = Arc::new(MemoryVault::with_files([
            ("typing.otl", SCHEMA),
            ("meta/types.otl", "type Note {}\n"),
            ("lib.js", "export const a = 1"),
        ]));
        let ctx = AppContext::new(test_parse_config(config), vault.clone());
        (vault, ctx)
    }

    #[test]
    fn test_preload_builds_graph() {
        let (_, ctx) = context("");
        ctx.preload();

        assert!(ctx.graph().is_ready());
        assert_eq!(ctx.graph().names(), vec!["Task"]);
    }

    #[test]
    fn test_apply_event_reaches_both_managers() {
        let (vault, ctx) = context("[scripts]\nenabled = true");
        ctx.preload();
        ctx.scripts().import_module("lib.js", None, false);

        ctx.apply_event(&vault.write("typing.otl", "type Task {}\ntype Bug extends Task {}"));
        ctx.apply_event(&vault.write("lib.js", "export const a = 2"));

        assert_eq!(ctx.graph().names(), vec!["Task", "Bug"]);
        assert_eq!(ctx.scripts().exports("lib.js").unwrap()["a"], json!(2));
    }

    #[test]
    fn test_reload_config_switches_schema() {
        let (_, ctx) = context("");
        ctx.preload();
        let events = ctx.graph().subscribe();

        assert!(!ctx.reload_config(test_parse_config("")));

        let changed = test_parse_config("[schema]\npath = \"meta/types.otl\"");
        assert!(ctx.reload_config(changed));
        assert_eq!(ctx.config().schema_path(), "meta/types.otl");
        assert_eq!(ctx.graph().names(), vec!["Note"]);
        assert!(ctx.graph().is_ready());

        let received: Vec<SchemaEvent> = events.try_iter().collect();
        assert!(received.starts_with(&[SchemaEvent::Changed, SchemaEvent::Ready]));
    }

    #[test]
    fn test_reset() {
        let (_, ctx) = context("");
        ctx.preload();
        ctx.reset();

        assert!(ctx.graph().is_empty());
        assert!(!ctx.graph().is_ready());
        assert!(ctx.interpreter().cached_paths().is_empty());

        ctx.preload();
        assert_eq!(ctx.graph().names(), vec!["Task"]);
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("typing.toml"), "[schema]\npath = \"schema.otl\"\n").unwrap();
        fs::write(dir.path().join("schema.otl"), SCHEMA).unwrap();

        let ctx = AppContext::open(&dir.path().join("typing.toml")).unwrap();
        ctx.preload();
        assert_eq!(ctx.graph().names(), vec!["Task"]);
    }
}
