//! Incremental module loading.
//!
//! # Architecture
//!
//! ```text
//! FileEvent ──► handle_event ──► reload_module / unload_module
//!                                     │
//!                                     ▼
//!              import_module ──► Evaluator::evaluate ──► Module<Env>
//!                    │                    │
//!                    │                    └─ nested import_smart (records edges)
//!                    ▼
//!              DependencyGraph ──► reload dependents (transitively)
//! ```
//!
//! A [`ModuleManager`] is generic over an [`Evaluator`], which decides what
//! evaluating one file means (OTL schema, compiled script, ...) and which
//! lifecycle hooks run around imports and reloads.

pub mod dependency;
mod status;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use rustc_hash::FxHashMap;

pub use dependency::DependencyGraph;
pub use status::{LogReporter, RecordingReporter, StatusEvent, StatusReporter};

use crate::error::EngineError;
use crate::utils::path::id::{dirname, has_extension, is_relative, join, normalize};
use crate::vault::{FileEvent, FileProvider};

/// Snapshot of a file's text at the time it was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: String,
    pub source: String,
}

impl FileSpec {
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Cached result of evaluating one file.
#[derive(Debug)]
pub enum Module<T> {
    Loaded {
        env: T,
        file: FileSpec,
    },
    Failed {
        error: String,
        env: Option<T>,
        file: Option<FileSpec>,
    },
}

impl<T> Module<T> {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
            env: None,
            file: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    pub fn env(&self) -> Option<&T> {
        match self {
            Self::Loaded { env, .. } => Some(env),
            Self::Failed { env, .. } => env.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Loaded { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    pub fn file(&self) -> Option<&FileSpec> {
        match self {
            Self::Loaded { file, .. } => Some(file),
            Self::Failed { file, .. } => file.as_ref(),
        }
    }
}

/// What an evaluator fills in while a module is being evaluated.
#[derive(Debug)]
pub struct ModuleSlot<T> {
    pub env: Option<T>,
    pub error: Option<String>,
}

impl<T> Default for ModuleSlot<T> {
    fn default() -> Self {
        Self {
            env: None,
            error: None,
        }
    }
}

/// Extension point of a [`ModuleManager`].
///
/// Hooks are associated functions receiving the whole manager so that an
/// evaluator can import further modules and reach its own state through
/// [`ModuleManager::ext`].
pub trait Evaluator: Sized {
    /// Result of a successful evaluation.
    type Env: Default;

    /// Parse/execute `file`, filling `slot.env` or `slot.error`.
    ///
    /// `Ok(false)` is a logical failure; `Err` is an unexpected fault.
    fn evaluate(
        manager: &mut ModuleManager<Self>,
        file: &FileSpec,
        slot: &mut ModuleSlot<Self::Env>,
    ) -> Result<bool, EngineError>;

    fn on_before_import(_manager: &mut ModuleManager<Self>, _path: &str) {}
    fn on_after_import(_manager: &mut ModuleManager<Self>, _path: &str) {}
    fn on_before_reload(_manager: &mut ModuleManager<Self>, _path: &str) {}
    fn on_after_reload(_manager: &mut ModuleManager<Self>, _path: &str) {}
    fn on_module_update(_manager: &mut ModuleManager<Self>, _path: &str) {}
    fn on_after_preload(_manager: &mut ModuleManager<Self>) {}
}

/// An in-flight evaluation.
#[derive(Debug)]
struct StackFrame {
    file: FileSpec,
}

/// Generic incremental loader.
///
/// Single-threaded: the module cache, file store, dependency graph and call
/// stack are mutated across several steps of one import.
pub struct ModuleManager<E: Evaluator> {
    modules: FxHashMap<String, Arc<Module<E::Env>>>,
    files: FxHashMap<String, FileSpec>,
    graph: DependencyGraph,
    stack: Vec<StackFrame>,
    /// Modules whose dependents are currently being reloaded.
    reload_path: Vec<String>,
    provider: Arc<dyn FileProvider>,
    extensions: Vec<String>,
    imports_root: String,
    reporter: Option<Box<dyn StatusReporter>>,
    ext: E,
}

impl<E: Evaluator> ModuleManager<E> {
    pub fn new(provider: Arc<dyn FileProvider>, extensions: Vec<String>, ext: E) -> Self {
        Self {
            modules: FxHashMap::default(),
            files: FxHashMap::default(),
            graph: DependencyGraph::new(),
            stack: Vec::new(),
            reload_path: Vec::new(),
            provider,
            extensions,
            imports_root: String::new(),
            reporter: None,
            ext,
        }
    }

    /// Root that non-relative imports are resolved against (`"/"` = vault root).
    pub fn with_imports_root(mut self, root: &str) -> Self {
        self.imports_root = normalize(root);
        self
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn StatusReporter>) {
        self.reporter = Some(reporter);
    }

    pub fn ext(&self) -> &E {
        &self.ext
    }

    pub fn ext_mut(&mut self) -> &mut E {
        &mut self.ext
    }

    pub fn provider(&self) -> &Arc<dyn FileProvider> {
        &self.provider
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn module(&self, path: &str) -> Option<Arc<Module<E::Env>>> {
        self.modules.get(path).cloned()
    }

    pub fn file(&self, path: &str) -> Option<&FileSpec> {
        self.files.get(path)
    }

    /// Paths of every cached module, sorted.
    pub fn cached_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.modules.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// File of the innermost module being evaluated.
    pub fn current_file(&self) -> Option<&FileSpec> {
        self.stack.last().map(|frame| &frame.file)
    }

    /// Whether the manager handles files like `path`.
    pub fn should_read(&self, path: &str) -> bool {
        has_extension(path, &self.extensions)
    }

    // =========================================================================
    // Importing
    // =========================================================================

    /// Import `path`, evaluating it unless a cached module can be reused.
    ///
    /// Returns `None` when the file does not exist. Failures come back as
    /// `Module::Failed`, with a generic error if the evaluator gave none.
    pub fn import_module(
        &mut self,
        path: &str,
        source: Option<&str>,
        force_reload: bool,
    ) -> Option<Arc<Module<E::Env>>> {
        if self.stack.iter().any(|frame| frame.file.path == path) {
            crate::debug!("import"; "recursive import of {}", path);
            let error = EngineError::RecursiveImport(path.to_string());
            return Some(Arc::new(Module::failed(error.to_string())));
        }

        E::on_before_import(self, path);

        if let Some(importer) = self.current_file().map(|file| file.path.clone()) {
            self.graph.add_dependency(&importer, path);
        }

        if !force_reload
            && source.is_none()
            && let Some(cached) = self.modules.get(path)
        {
            return Some(Arc::clone(cached));
        }

        let file = match source {
            Some(source) => FileSpec::new(path, source),
            None => self.files.get(path)?.clone(),
        };

        self.stack.push(StackFrame { file: file.clone() });
        self.modules.insert(
            path.to_string(),
            Arc::new(Module::Failed {
                error: format!("Module is still being evaluated: {path}"),
                env: None,
                file: Some(file.clone()),
            }),
        );
        self.report(|reporter| reporter.on_import_started(path));

        let mut slot = ModuleSlot::default();
        let outcome = E::evaluate(self, &file, &mut slot);
        self.stack.pop();

        match outcome {
            Err(err) => {
                let module = Arc::new(Module::Failed {
                    error: format!("Unexpected error: {err}"),
                    env: slot.env,
                    file: Some(file),
                });
                self.modules.insert(path.to_string(), Arc::clone(&module));
                self.report(|reporter| reporter.on_import_failed(path));
                Some(module)
            }
            Ok(false) => {
                self.report(|reporter| reporter.on_import_failed(path));
                // Stays cached so that `reload_module` re-evaluates it on edit.
                let module = Arc::new(Module::Failed {
                    error: slot
                        .error
                        .unwrap_or_else(|| format!("Module {path} produced no result")),
                    env: slot.env,
                    file: Some(file),
                });
                self.modules.insert(path.to_string(), Arc::clone(&module));
                Some(module)
            }
            Ok(true) => {
                if source.is_some() {
                    self.files.insert(path.to_string(), file.clone());
                }
                let module = Arc::new(Module::Loaded {
                    env: slot.env.unwrap_or_default(),
                    file,
                });
                self.modules.insert(path.to_string(), Arc::clone(&module));
                self.report(|reporter| reporter.on_import_completed(path));
                E::on_after_import(self, path);
                Some(module)
            }
        }
    }

    /// Import with module-resolution search.
    ///
    /// Relative paths resolve against `base` (or the importing module's
    /// directory), others against the imports root. Without a recognized
    /// extension the candidates are tried in order: `path.<ext>` for each
    /// extension, then `path/index.<ext>`, then `path` itself.
    pub fn import_smart(&mut self, path: &str, base: Option<&str>) -> Option<Arc<Module<E::Env>>> {
        let base = base
            .map(str::to_string)
            .or_else(|| self.current_file().map(|file| file.path.clone()))
            .unwrap_or_default();

        let path = if is_relative(path) {
            normalize(&join(dirname(&base), path))
        } else {
            normalize(&join(&self.imports_root, path))
        };

        if !self.should_read(&path) {
            for candidate in self.candidates(&path) {
                if let Some(module) = self.import_module(&candidate, None, false) {
                    return Some(module);
                }
            }
        }
        self.import_module(&path, None, false)
    }

    fn candidates(&self, path: &str) -> Vec<String> {
        let direct = self.extensions.iter().map(|ext| format!("{path}.{ext}"));
        let index = self
            .extensions
            .iter()
            .map(|ext| format!("{path}/index.{ext}"));
        direct.chain(index).collect()
    }

    // =========================================================================
    // Reloading
    // =========================================================================

    /// Re-read `path` and re-evaluate it (if it was loaded) and its dependents.
    pub fn reload_module(&mut self, path: &str) {
        if self.reload_path.iter().any(|p| p == path) {
            crate::debug!("import"; "skip cyclic reload of {}", path);
            return;
        }

        let source = self.provider.read(path).unwrap_or_default();
        self.files
            .insert(path.to_string(), FileSpec::new(path, source));

        if self.modules.contains_key(path) {
            E::on_before_reload(self, path);
            self.import_module(path, None, true);
            E::on_module_update(self, path);
        }

        self.reload_dependents(path);
        E::on_after_reload(self, path);
    }

    /// Forget `path` and reload whatever depended on it.
    pub fn unload_module(&mut self, path: &str) {
        self.files.remove(path);
        self.modules.remove(path);
        E::on_module_update(self, path);
        self.reload_dependents(path);
        E::on_after_reload(self, path);
    }

    /// Reload every module that declared a dependency on `path`.
    pub fn reload_dependents(&mut self, path: &str) {
        let dependents = self.graph.sorted_dependents(path);
        if dependents.is_empty() {
            return;
        }
        crate::debug!("import"; "{} dependents of {}", dependents.len(), path);

        self.reload_path.push(path.to_string());
        for dependent in dependents {
            self.reload_module(&dependent);
        }
        self.reload_path.pop();
    }

    /// Load every known file this manager handles (warm start).
    pub fn preload_files(&mut self) {
        let paths: Vec<String> = self
            .provider
            .list()
            .into_iter()
            .filter(|path| self.should_read(path))
            .collect();
        crate::debug!("import"; "preloading {} files", paths.len());

        for path in paths {
            self.reload_module(&path);
        }
        E::on_after_preload(self);
    }

    /// Reconcile one host change notification.
    pub fn handle_event(&mut self, event: &FileEvent) {
        match event {
            FileEvent::Created(path) | FileEvent::Modified(path) => {
                if self.should_read(path) {
                    self.reload_module(path);
                }
            }
            FileEvent::Renamed { from, to } => {
                if self.should_read(from) {
                    self.unload_module(from);
                }
                if self.should_read(to) {
                    self.reload_module(to);
                }
            }
            FileEvent::Deleted(path) => {
                if self.should_read(path) {
                    self.unload_module(path);
                }
            }
        }
    }

    /// Drop every cached module, file and edge.
    pub fn reset(&mut self) {
        self.modules.clear();
        self.files.clear();
        self.graph.clear();
        self.stack.clear();
        self.reload_path.clear();
    }

    fn report(&mut self, notify: impl FnOnce(&mut dyn StatusReporter)) {
        if let Some(reporter) = self.reporter.as_deref_mut() {
            notify(reporter);
        }
    }
}
