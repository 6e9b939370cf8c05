//! Scope combinator.

use rustc_hash::FxHashSet;

use super::{Completion, LintContext, RunContext, Symbol, Visitor, VisitorBase, traverse};
use crate::syntax::{Rule, SyntaxNode};

/// Checks the children of the wrapped visitor's node as one namespace.
///
/// - every child must be claimed by a child slot (comments excepted)
/// - each symbol name may be declared once; every later duplicate gets a
///   warning and the first declaration stays bound
/// - completions already declared in the scope are hidden, earlier
///   snippets rank higher
#[derive(Debug, Default, Clone)]
pub struct Scope<V> {
    inner: V,
}

impl<V: VisitorBase> Scope<V> {
    pub fn new(inner: V) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &V {
        &self.inner
    }

    /// Symbols declared by the claimed children, in source order,
    /// repeats included.
    pub fn declared(&self, node: &SyntaxNode) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        traverse(
            &self.inner,
            node,
            |child, slot| symbols.extend(slot.symbols(child)),
            |_| {},
        );
        symbols
    }
}

impl<V: VisitorBase> VisitorBase for Scope<V> {
    fn rules(&self) -> &'static [Rule] {
        self.inner.rules()
    }

    fn children(&self) -> Vec<&dyn VisitorBase> {
        self.inner.children()
    }

    /// Every name the scope binds, once, at its first declaration.
    fn symbols(&self, node: &SyntaxNode) -> Vec<Symbol> {
        let mut seen = FxHashSet::default();
        self.declared(node)
            .into_iter()
            .filter(|symbol| seen.insert(symbol.name.clone()))
            .collect()
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext) {
        traverse(
            &self.inner,
            node,
            |_, _| {},
            |child| match child.rule {
                Rule::LineComment => {}
                Rule::Error => ctx.error(child.span, "Syntax error."),
                _ => ctx.error(child.span, "Unexpected statement."),
            },
        );

        self.inner.lint(node, ctx);

        let mut seen = FxHashSet::default();
        for symbol in self.declared(node) {
            if !seen.insert(symbol.name.clone()) {
                ctx.warning(symbol.span, format!("Duplicate symbol: {}", symbol.name));
            }
        }
    }

    fn complete(&self, node: &SyntaxNode) -> Vec<Completion> {
        let bound: FxHashSet<String> = self
            .declared(node)
            .into_iter()
            .map(|symbol| symbol.name)
            .collect();

        self.inner
            .children()
            .iter()
            .flat_map(|slot| slot.snippets())
            .filter(|snippet| {
                snippet
                    .symbol
                    .as_ref()
                    .is_none_or(|symbol| !bound.contains(symbol))
            })
            .enumerate()
            .map(|(i, snippet)| Completion {
                boost: -(i as i32),
                ..snippet
            })
            .collect()
    }

    fn snippets(&self) -> Vec<Completion> {
        self.inner.snippets()
    }
}

impl<V: Visitor> Visitor for Scope<V> {
    type Output = V::Output;

    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<Self::Output> {
        self.inner.run(node, ctx)
    }
}
