//! OTL schema interpreter.
//!
//! An [`Interpreter`] is a [`ModuleManager`] whose modules are schema files.
//! Evaluating one parses it, lints it and, when lint finds no errors, runs the file
//! visitor to build its types. Whenever the configured entry schema finishes
//! loading, its types replace the contents of the shared [`TypeGraph`].

use std::sync::Arc;

use crate::config::SchemaConfig;
use crate::error::EngineError;
use crate::module::{Evaluator, FileSpec, Module, ModuleManager, ModuleSlot};
use crate::syntax::{Grammar, OtlGrammar, SyntaxNode};
use crate::typing::{SchemaEnv, SchemaEvent, TypeGraph};
use crate::vault::FileProvider;
use crate::visitor::{
    self, Completion, FileVisitor, ImportResolver, LintContext, LintResult, RunContext, Visitor,
    format_diagnostics,
};
use crate::{debug, log};

pub type Interpreter = ModuleManager<SchemaEvaluator>;

/// Schema evaluation state shared by every module of one interpreter.
pub struct SchemaEvaluator {
    graph: Arc<TypeGraph>,
    schema_path: String,
    grammar: Arc<dyn Grammar>,
}

impl SchemaEvaluator {
    pub fn new(graph: Arc<TypeGraph>, schema_path: impl Into<String>) -> Self {
        Self {
            graph,
            schema_path: schema_path.into(),
            grammar: Arc::new(OtlGrammar),
        }
    }

    pub fn with_grammar(mut self, grammar: Arc<dyn Grammar>) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn graph(&self) -> &Arc<TypeGraph> {
        &self.graph
    }

    pub fn schema_path(&self) -> &str {
        &self.schema_path
    }
}

impl Evaluator for SchemaEvaluator {
    type Env = SchemaEnv;

    fn evaluate(
        manager: &mut ModuleManager<Self>,
        file: &FileSpec,
        slot: &mut ModuleSlot<SchemaEnv>,
    ) -> Result<bool, EngineError> {
        let tree = manager.ext().grammar.parse(&file.source);
        let root = tree.top_node();
        let visitor = FileVisitor::default();

        let lint = visitor::lint(&visitor, root, LintContext::new());
        if lint.has_errors() {
            slot.error = Some(lint.report(&file.path).join("\n"));
            return Ok(false);
        }
        for line in format_diagnostics(&file.path, lint.warnings()) {
            log!("warning"; "{}", line);
        }

        let mut ctx = RunContext::with_resolver(manager);
        match visitor.run(root, &mut ctx) {
            Some(env) => {
                slot.env = Some(env);
                Ok(true)
            }
            None => {
                let lines = format_diagnostics(&file.path, ctx.diagnostics());
                slot.error = Some(if lines.is_empty() {
                    format!("{}: evaluation failed", file.path)
                } else {
                    lines.join("\n")
                });
                Ok(false)
            }
        }
    }

    fn on_after_import(manager: &mut ModuleManager<Self>, path: &str) {
        if path != manager.ext().schema_path {
            return;
        }
        let Some(env) = manager.module(path).and_then(|module| module.env().cloned()) else {
            return;
        };

        log!("schema"; "loaded {} types from {}", env.len(), path);
        let graph = &manager.ext().graph;
        graph.replace(env);
        graph.notify(SchemaEvent::Changed);
    }

    fn on_module_update(manager: &mut ModuleManager<Self>, path: &str) {
        // The entry schema went away: nothing defines types any more.
        if path == manager.ext().schema_path && manager.module(path).is_none() {
            log!("schema"; "{} removed, clearing types", path);
            let graph = &manager.ext().graph;
            graph.clear();
            graph.notify(SchemaEvent::Changed);
        }
    }

    fn on_after_preload(manager: &mut ModuleManager<Self>) {
        let schema = manager.ext().schema_path.clone();
        match manager.import_module(&schema, None, true) {
            None => log!("schema"; "schema file {} not found", schema),
            Some(module) => {
                if let Some(error) = module.error() {
                    log!("error"; "schema {} failed:\n{}", schema, error);
                }
            }
        }

        let graph = &manager.ext().graph;
        graph.mark_ready();
        graph.notify(SchemaEvent::Ready);
    }
}

impl ImportResolver for Interpreter {
    fn resolve(&mut self, path: &str) -> Result<SchemaEnv, String> {
        let module = self
            .import_smart(path, None)
            .ok_or_else(|| format!("Cannot find module {path}"))?;
        match module.as_ref() {
            Module::Loaded { env, .. } => Ok(env.clone()),
            Module::Failed { error, .. } => Err(error.clone()),
        }
    }
}

impl ModuleManager<SchemaEvaluator> {
    /// Interpreter for the `[schema]` section of a config.
    pub fn from_config(
        provider: Arc<dyn FileProvider>,
        config: &SchemaConfig,
        graph: Arc<TypeGraph>,
    ) -> Self {
        let schema_path = crate::utils::path::id::normalize(&config.path);
        debug!("schema"; "entry schema: {}", schema_path);
        ModuleManager::new(
            provider,
            config.extensions.clone(),
            SchemaEvaluator::new(graph, schema_path),
        )
        .with_imports_root(&config.imports_path)
    }

    /// Lint and run `visitor` over a source snippet.
    ///
    /// Types already in the graph are visible to the snippet, and imports
    /// resolve through this interpreter. `visitor` is applied to the parsed
    /// file, or to its only statement when it does not handle whole files.
    pub fn run_code<V: Visitor>(&mut self, code: &str, visitor: &V) -> Result<V::Output, EngineError> {
        const SNIPPET: &str = "<snippet>";

        let tree = self.ext().grammar.parse(code);
        let node = snippet_target(visitor, tree.top_node()).ok_or_else(|| {
            EngineError::Diagnostics(vec![format!("{SNIPPET}:0-{}: Unexpected statement.", code.len())])
        })?;

        let graph = Arc::clone(&self.ext().graph);
        let lint = visitor::lint(visitor, node, LintContext::with_known(graph.names()));
        if lint.has_errors() {
            return Err(EngineError::Diagnostics(lint.report(SNIPPET)));
        }

        let env = SchemaEnv::clone(&graph.snapshot());
        let mut ctx = RunContext::with_resolver(self).with_env(env);
        visitor
            .run(node, &mut ctx)
            .ok_or_else(|| EngineError::Diagnostics(format_diagnostics(SNIPPET, ctx.diagnostics())))
    }

    /// Lint a schema source without evaluating it.
    pub fn lint_source(&self, source: &str) -> LintResult {
        let tree = self.ext().grammar.parse(source);
        visitor::lint(&FileVisitor::default(), tree.top_node(), LintContext::new())
    }

    /// Completions at byte `offset` of a schema source.
    pub fn complete(&self, source: &str, offset: usize) -> Vec<Completion> {
        let tree = self.ext().grammar.parse(source);
        visitor::complete_at(&FileVisitor::default(), tree.top_node(), offset)
    }

    /// Types currently in the graph.
    pub fn types(&self) -> Arc<SchemaEnv> {
        self.ext().graph.snapshot()
    }
}

fn snippet_target<'t, V: Visitor>(visitor: &V, root: &'t SyntaxNode) -> Option<&'t SyntaxNode> {
    if visitor.accepts(root) {
        return Some(root);
    }
    let mut statements = root
        .children
        .iter()
        .filter(|node| node.rule != crate::syntax::Rule::LineComment);
    match (statements.next(), statements.next()) {
        (Some(node), None) if visitor.accepts(node) => Some(node),
        _ => None,
    }
}
