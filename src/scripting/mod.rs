//! Script modules.
//!
//! A [`ScriptManager`] loads script files (`.ts`, `.js`, ...) through the
//! same incremental loader as schemas. Imports inside a script are resolved
//! by the manager, so the dependency graph and reload cascades work the same
//! way; the rest of the source goes to a pluggable [`ScriptCompiler`].

mod compiler;

use std::sync::Arc;

use serde_json::Value;

pub use compiler::{
    Bindings, ConstExportCompiler, Exports, ImportClause, ScriptCompiler, ScriptError,
    ScriptImport, extract_imports,
};

use crate::config::ScriptsConfig;
use crate::error::EngineError;
use crate::module::{Evaluator, FileSpec, ModuleManager, ModuleSlot};
use crate::typing::{SchemaEvent, TypeGraph};
use crate::vault::FileProvider;

pub type ScriptManager = ModuleManager<ScriptEvaluator>;

/// Prefix of the file name handed to the compiler, used in its diagnostics.
pub const SCRIPT_URL_PREFIX: &str = "@typing-script///";

pub struct ScriptEvaluator {
    graph: Arc<TypeGraph>,
    enabled: bool,
    compiler: Arc<dyn ScriptCompiler>,
}

impl ScriptEvaluator {
    pub fn new(graph: Arc<TypeGraph>, enabled: bool) -> Self {
        Self {
            graph,
            enabled,
            compiler: Arc::new(ConstExportCompiler),
        }
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn ScriptCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Bindings every script sees: `api.types` lists the registered types.
    fn bindings(&self) -> Bindings {
        let types = self.graph.names().into_iter().map(Value::String).collect();
        let mut api = serde_json::Map::new();
        api.insert("types".to_string(), Value::Array(types));

        let mut bindings = Bindings::new();
        bindings.insert("api".to_string(), Value::Object(api));
        bindings
    }
}

impl Evaluator for ScriptEvaluator {
    type Env = Exports;

    fn evaluate(
        manager: &mut ModuleManager<Self>,
        file: &FileSpec,
        slot: &mut ModuleSlot<Exports>,
    ) -> Result<bool, EngineError> {
        if !manager.ext().enabled {
            let error = EngineError::Unsupported(format!(
                "scripting is disabled, cannot load {}",
                file.path
            ));
            slot.error = Some(error.to_string());
            return Ok(false);
        }

        let filename = format!("{SCRIPT_URL_PREFIX}{}", file.path);
        let (imports, body) = extract_imports(&file.source);

        let mut bindings = manager.ext().bindings();
        for import in imports {
            match resolve_import(manager, &import) {
                Ok(values) => bindings.extend(values),
                Err(message) => {
                    slot.error = Some(format!("{filename}:{}: {message}", import.line));
                    return Ok(false);
                }
            }
        }

        let compiler = Arc::clone(&manager.ext().compiler);
        match compiler.compile(&body, &bindings, &filename) {
            Ok(exports) => {
                slot.env = Some(exports);
                Ok(true)
            }
            Err(err) => {
                slot.error = Some(err.to_string());
                Ok(false)
            }
        }
    }

    fn on_after_reload(manager: &mut ModuleManager<Self>, _path: &str) {
        manager.ext().graph.notify(SchemaEvent::Changed);
    }
}

/// Bindings contributed by one import statement.
fn resolve_import(
    manager: &mut ScriptManager,
    import: &ScriptImport,
) -> Result<Vec<(String, Value)>, String> {
    let module = manager
        .import_smart(&import.path, None)
        .ok_or_else(|| format!("Cannot find module {}", import.path))?;
    if let Some(error) = module.error() {
        return Err(error.to_string());
    }
    let exports = module.env().cloned().unwrap_or_default();

    match &import.clause {
        ImportClause::Namespace(local) => Ok(vec![(local.clone(), Value::Object(exports))]),
        ImportClause::Named(names) => names
            .iter()
            .map(|(name, local)| {
                exports
                    .get(name)
                    .map(|value| (local.clone(), value.clone()))
                    .ok_or_else(|| format!("Module {} has no export {name}", import.path))
            })
            .collect(),
    }
}

impl ModuleManager<ScriptEvaluator> {
    /// Script manager for the `[scripts]` section of a config.
    pub fn from_config(
        provider: Arc<dyn FileProvider>,
        config: &ScriptsConfig,
        graph: Arc<TypeGraph>,
    ) -> Self {
        ModuleManager::new(
            provider,
            config.extensions.clone(),
            ScriptEvaluator::new(graph, config.enabled),
        )
        .with_imports_root(&config.imports_path)
    }

    pub fn set_compiler(&mut self, compiler: Arc<dyn ScriptCompiler>) {
        self.ext_mut().compiler = compiler;
    }

    /// Exports of a loaded script.
    pub fn exports(&self, path: &str) -> Option<Exports> {
        self.module(path)
            .filter(|module| module.is_loaded())
            .and_then(|module| module.env().cloned())
    }
}
